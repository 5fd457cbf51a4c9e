//! Content interpretation: positioned text runs and vector paths.

mod common;

use common::{one_page_doc, PdfBuilder};
use sucre::{PathKind, PdfError, Reader};

#[test]
fn hello_text_run() {
    let pdf = one_page_doc("BT /F1 12 Tf 72 720 Td (Hello) Tj ET");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();

    assert_eq!(content.texts.len(), 1);
    let run = &content.texts[0];
    assert_eq!(run.font, "Helvetica");
    assert!((run.font_size - 12.0).abs() < 1e-9);
    assert!((run.x - 72.0).abs() < 1e-9);
    assert!((run.y - 720.0).abs() < 1e-9);
    assert_eq!(run.rotation, 0.0);
    assert_eq!(run.text(), "Hello");
    let glyphs: Vec<&str> = run.chars.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(glyphs, vec!["H", "e", "l", "l", "o"]);

    // Helvetica advance: (722 + 556 + 222 + 222 + 556) / 1000 * 12.
    let expected = 2278.0 / 1000.0 * 12.0;
    assert!((run.advance - expected).abs() < 1e-9);
}

#[test]
fn subset_prefix_is_stripped() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(
        2,
        "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
    );
    b.obj(
        3,
        "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>",
    );
    b.stream(4, "", b"BT /F1 9 Tf (x) Tj ET");
    b.obj(
        5,
        "<< /Type /Font /Subtype /TrueType /BaseFont /ABCDEF+Arial-Bold \
         /Encoding /WinAnsiEncoding /FirstChar 120 /LastChar 121 /Widths [500] >>",
    );
    let pdf = b.build(1);

    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();
    assert_eq!(content.texts[0].font, "Arial-Bold");
}

#[test]
fn two_pages_inherit_the_media_box() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(
        2,
        "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 612 792] >>",
    );
    b.obj(3, "<< /Type /Page /Parent 2 0 R >>");
    b.obj(4, "<< /Type /Page /Parent 2 0 R >>");
    let pdf = b.build(1);

    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    assert_eq!(r.num_pages(), 2);
    let page2 = r.page(2);
    assert!(!page2.is_null());
    let mb = page2.media_box().unwrap();
    assert_eq!(mb.len(), 4);
    assert_eq!(mb.index(2).unwrap().as_f64().unwrap(), 612.0);
    assert_eq!(mb.index(3).unwrap().as_f64().unwrap(), 792.0);
    assert!(r.page(3).is_null());
}

#[test]
fn nested_page_tree_counts() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(
        2,
        "<< /Type /Pages /Kids [3 0 R 6 0 R] /Count 3 /MediaBox [0 0 100 100] >>",
    );
    b.obj(3, "<< /Type /Pages /Parent 2 0 R /Kids [4 0 R 5 0 R] /Count 2 >>");
    b.obj(4, "<< /Type /Page /Parent 3 0 R /Marker (first) >>");
    b.obj(5, "<< /Type /Page /Parent 3 0 R /Marker (second) >>");
    b.obj(6, "<< /Type /Page /Parent 2 0 R /Marker (third) >>");
    let pdf = b.build(1);

    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    for (num, marker) in [(1, "first"), (2, "second"), (3, "third")] {
        let page = r.page(num);
        assert_eq!(
            page.value()
                .key("Marker")
                .unwrap()
                .raw_bytes()
                .unwrap(),
            marker.as_bytes(),
            "page {}",
            num
        );
    }
}

#[test]
fn tj_array_applies_offsets_between_glyphs() {
    let pdf = one_page_doc("BT /F1 10 Tf 0 0 Td [(A) -500 (B)] TJ ET");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();

    assert_eq!(content.texts.len(), 2);
    let a = &content.texts[0];
    let bb = &content.texts[1];
    assert_eq!(a.text(), "A");
    assert_eq!(bb.text(), "B");
    // B starts after A's width (667/1000 * 10) plus the -(-500)/1000*10
    // offset shift.
    let expected = 667.0 / 1000.0 * 10.0 + 500.0 / 1000.0 * 10.0;
    assert!((bb.x - a.x - expected).abs() < 1e-9, "bb.x = {}", bb.x);
}

#[test]
fn rotated_text_reports_angle_and_size() {
    // Tm with a 90-degree rotation scaled by 2. The angle comes from
    // atan2 over the first column of the rendering matrix.
    let pdf = one_page_doc("BT /F1 10 Tf 0 2 -2 0 50 60 Tm (A) Tj ET");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();

    let run = &content.texts[0];
    assert!((run.rotation - -90.0).abs() < 1e-9);
    assert!((run.font_size - 20.0).abs() < 1e-9);
    assert!((run.x - 50.0).abs() < 1e-9);
    assert!((run.y - 60.0).abs() < 1e-9);
}

#[test]
fn word_and_char_spacing_advance_tm() {
    // Two spaces and two chars: advance picks up Tc per glyph and Tw
    // per space.
    let pdf = one_page_doc("BT /F1 10 Tf 2 Tc 5 Tw 0 0 Td (a a) Tj (b) Tj ET");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();
    let first = &content.texts[0];
    let second = &content.texts[1];
    // a=556, space=278, a=556; Tc 2 per char; Tw 5 for the space.
    let expected = (556.0 + 278.0 + 556.0) / 100.0 + 3.0 * 2.0 + 5.0;
    assert!((second.x - first.x - expected).abs() < 1e-9);
}

#[test]
fn paths_are_ctm_transformed() {
    let pdf = one_page_doc("2 0 0 2 10 10 cm 1 w 0 0 m 5 7 l 1 1 4 4 re");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();

    assert_eq!(content.paths.len(), 2);
    let line = &content.paths[0];
    assert_eq!(line.kind, PathKind::Line);
    assert_eq!(line.points[0], (10.0, 10.0));
    assert_eq!(line.points[1], (20.0, 24.0));
    assert_eq!(line.end, (20.0, 24.0));
    assert!((line.line_width - 2.0).abs() < 1e-9);

    let rect = &content.paths[1];
    assert_eq!(rect.kind, PathKind::Rect);
    assert_eq!(rect.points[0], (12.0, 12.0));
    assert_eq!(rect.points[1], (20.0, 20.0));
    // The rectangle closes back onto its start corner.
    assert_eq!(rect.end, (12.0, 12.0));
}

#[test]
fn bezier_variants_reuse_the_current_point() {
    let pdf = one_page_doc("0 0 m 1 1 2 2 3 3 c 4 4 5 5 v 6 6 7 7 y");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();

    assert_eq!(content.paths.len(), 3);
    for p in &content.paths {
        assert_eq!(p.kind, PathKind::Bezier);
        assert_eq!(p.points.len(), 4);
    }
    // v: first control point equals the starting point.
    assert_eq!(content.paths[1].points[0], content.paths[1].points[1]);
    assert_eq!(content.paths[1].points[0], (3.0, 3.0));
    // y: second control point equals the end point.
    assert_eq!(content.paths[2].points[2], content.paths[2].points[3]);
    assert_eq!(content.paths[2].end, (7.0, 7.0));
}

#[test]
fn graphics_state_saves_restore() {
    let pdf = one_page_doc("q 2 0 0 2 0 0 cm Q 0 0 m 1 1 l");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();
    // After Q the CTM is identity again.
    assert_eq!(content.paths[0].points[1], (1.0, 1.0));
}

#[test]
fn quote_operators_move_to_the_next_line() {
    let pdf = one_page_doc("BT /F1 10 Tf 14 TL 0 100 Td (one) Tj (two) ' ET");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();
    assert_eq!(content.texts.len(), 2);
    assert!((content.texts[1].y - (100.0 - 14.0)).abs() < 1e-9);
    assert!((content.texts[1].x - 0.0).abs() < 1e-9);
}

#[test]
fn ignored_operator_families_are_accepted() {
    let pdf = one_page_doc(
        "q 0.5 g 0.1 0.2 0.3 rg /DeviceRGB CS BMC 0 0 m 3 3 l S W n EMC BX EX Q",
    );
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();
    assert_eq!(content.paths.len(), 1);
}

#[test]
fn unknown_operator_is_an_error() {
    let pdf = one_page_doc("1 2 frobnicate");
    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    match r.page(1).content() {
        Err(PdfError::UnknownOperator(op)) => assert_eq!(op, "frobnicate"),
        other => panic!("expected UnknownOperator, got {other:?}"),
    }
}

#[test]
fn contents_array_concatenates_streams() {
    let mut b = PdfBuilder::new();
    b.obj(1, "<< /Type /Catalog /Pages 2 0 R >>");
    b.obj(
        2,
        "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
    );
    b.obj(
        3,
        "<< /Type /Page /Parent 2 0 R /Contents [4 0 R 6 0 R] /Resources << /Font << /F1 5 0 R >> >> >>",
    );
    b.stream(4, "", b"BT /F1 12 Tf 10 10 Td");
    b.obj(
        5,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding \
         /FirstChar 32 /LastChar 126 /Widths [278] >>",
    );
    b.stream(6, "", b"(split) Tj ET");
    let pdf = b.build(1);

    let r = Reader::new(&pdf, pdf.len() as u64).unwrap();
    let content = r.page(1).content().unwrap();
    // Graphics state set in the first stream carries into the second.
    assert_eq!(content.texts.len(), 1);
    assert_eq!(content.texts[0].text(), "split");
    assert!((content.texts[0].x - 10.0).abs() < 1e-9);
    assert!((content.texts[0].font_size - 12.0).abs() < 1e-9);
}
