//! Content-stream interpretation: text runs and vector paths.
//!
//! The interpreter is an operator handler over the PostScript machine.
//! It keeps one graphics state (text parameters included) with a save
//! stack for `q`/`Q`, emits a path record per construction operator in
//! CTM-transformed coordinates, and emits a text run per shown string.

use std::f64::consts::PI;
use std::rc::Rc;

use crate::document::page::Page;
use crate::document::value::Kind;
use crate::error::{PdfError, Result};
use crate::font::font::Font;
use crate::interp::postscript::{self, OpHandler, Stack};
use crate::model::objects::PdfObject;
use crate::model::state::{Content, GraphicsState, PathKind, PathRecord, TextRun};
use crate::utils::{apply_matrix_pt, matrix_scale, mult_matrix, translation, Matrix, MATRIX_IDENTITY};

/// Executes every content stream of a page in order, sharing one
/// graphics state across them.
pub(crate) fn page_content(page: &Page<'_>) -> Result<Content> {
    let mut interp = ContentInterpreter::new(page);

    let contents = page.value().key("Contents")?;
    match contents.kind() {
        Kind::Stream => {
            let data = contents.stream_data()?;
            postscript::interpret(&data, &mut interp)?;
        }
        Kind::Array => {
            for i in 0..contents.len() {
                let part = contents.index(i)?;
                if part.kind() != Kind::Stream {
                    continue;
                }
                let data = part.stream_data()?;
                postscript::interpret(&data, &mut interp)?;
            }
        }
        _ => {}
    }

    Ok(Content {
        texts: interp.texts,
        paths: interp.paths,
    })
}

struct ContentInterpreter<'p, 'r> {
    page: &'p Page<'r>,
    g: GraphicsState,
    font: Option<Rc<Font<'r>>>,
    saves: Vec<(GraphicsState, Option<Rc<Font<'r>>>)>,
    texts: Vec<TextRun>,
    paths: Vec<PathRecord>,
}

impl<'p, 'r> ContentInterpreter<'p, 'r> {
    fn new(page: &'p Page<'r>) -> Self {
        Self {
            page,
            g: GraphicsState::new(),
            font: None,
            saves: Vec::new(),
            texts: Vec::new(),
            paths: Vec::new(),
        }
    }

    fn push_path(&mut self, kind: PathKind, points: Vec<(f64, f64)>, end: (f64, f64)) {
        self.paths.push(PathRecord {
            kind,
            points,
            end,
            join_style: self.g.join_style,
            cap_style: self.g.cap_style,
            line_width: matrix_scale(self.g.ctm) * self.g.line_width,
        });
    }

    fn next_line(&mut self) {
        self.g.tlm = mult_matrix(translation(0.0, -self.g.leading), self.g.tlm);
        self.g.tm = self.g.tlm;
    }

    /// The text rendering matrix for the current state.
    fn trm(&self) -> Matrix {
        let scale = (
            self.g.font_size * self.g.horiz_scale,
            0.0,
            0.0,
            self.g.font_size,
            0.0,
            self.g.rise,
        );
        mult_matrix(mult_matrix(scale, self.g.tm), self.g.ctm)
    }

    /// Decodes and emits one shown string, then advances the text
    /// matrix by each character's displacement.
    fn show_text(&mut self, raw: &[u8]) {
        let font = match &self.font {
            Some(f) => Rc::clone(f),
            None => {
                log::warn!("text shown before Tf; skipping");
                return;
            }
        };
        let decoded = font.decode(raw);

        let trm = self.trm();
        let origin = (trm.4, trm.5);
        let font_size = matrix_scale(trm);
        let rotation = trm.2.atan2(trm.0) * 180.0 / PI;

        let mut name = font.base_font();
        if let Some(plus) = name.find('+') {
            name = name[plus + 1..].to_string();
        }
        let font_weight = font.font_weight();

        for ch in &decoded {
            let mut tx = ch.width / 1000.0 * self.g.font_size + self.g.char_spacing;
            let spaces = ch.text.chars().filter(|&c| c == ' ').count();
            tx += self.g.word_spacing * spaces as f64;
            tx *= self.g.horiz_scale;
            self.g.tm = mult_matrix(translation(tx, 0.0), self.g.tm);
        }

        let after = self.trm();
        let advance = ((after.4 - origin.0).powi(2) + (after.5 - origin.1).powi(2)).sqrt();

        self.texts.push(TextRun {
            font: name,
            font_size,
            rotation,
            font_weight,
            x: origin.0,
            y: origin.1,
            advance,
            chars: decoded,
        });
    }

    fn apply_ext_gstate(&mut self, name: &str) -> Result<()> {
        // Only the /Font entry is inspected; text metrics stay untouched.
        let gs = self
            .page
            .resources()?
            .key("ExtGState")?
            .key(name)?;
        let font = gs.key("Font")?;
        if font.kind() == Kind::Array && font.len() == 2 {
            log::debug!("ExtGState font override ignored");
        }
        Ok(())
    }
}

fn num(args: &[PdfObject], i: usize) -> f64 {
    args.get(i).and_then(|o| o.as_f64().ok()).unwrap_or(0.0)
}

fn int(args: &[PdfObject], i: usize) -> i64 {
    args.get(i).and_then(|o| o.as_int().ok()).unwrap_or(0)
}

fn matrix_from(args: &[PdfObject]) -> Matrix {
    (
        num(args, 0),
        num(args, 1),
        num(args, 2),
        num(args, 3),
        num(args, 4),
        num(args, 5),
    )
}

impl OpHandler for ContentInterpreter<'_, '_> {
    fn on_op(&mut self, stack: &mut Stack, op: &str) -> Result<()> {
        let mut args = stack.take_all();

        match op {
            // Graphics state.
            "q" => self.saves.push((self.g.clone(), self.font.clone())),
            "Q" => {
                if let Some((g, font)) = self.saves.pop() {
                    self.g = g;
                    self.font = font;
                }
            }
            "cm" => {
                if args.len() != 6 {
                    return Err(PdfError::MalformedObject("bad cm operands".into()));
                }
                self.g.ctm = mult_matrix(matrix_from(&args), self.g.ctm);
            }
            "w" => self.g.line_width = num(&args, 0),
            "j" => self.g.join_style = int(&args, 0),
            "J" => self.g.cap_style = int(&args, 0),
            "M" | "d" | "ri" | "i" => {}
            "gs" => {
                if let Some(PdfObject::Name(name)) = args.first() {
                    let name = name.clone();
                    self.apply_ext_gstate(&name)?;
                }
            }

            // Path construction; records emit immediately.
            "m" => self.g.point = (num(&args, 0), num(&args, 1)),
            "l" => {
                let from = self.g.point;
                let to = (num(&args, 0), num(&args, 1));
                self.g.point = to;
                let pts = vec![
                    apply_matrix_pt(self.g.ctm, from),
                    apply_matrix_pt(self.g.ctm, to),
                ];
                let end = pts[1];
                self.push_path(PathKind::Line, pts, end);
            }
            "re" => {
                if args.len() != 4 {
                    return Err(PdfError::MalformedObject("bad re operands".into()));
                }
                let (x, y) = (num(&args, 0), num(&args, 1));
                let (w, h) = (num(&args, 2), num(&args, 3));
                // A rectangle subpath closes back onto its start corner,
                // so that corner is also the final current point.
                let start = apply_matrix_pt(self.g.ctm, (x, y));
                let pts = vec![start, apply_matrix_pt(self.g.ctm, (x + w, y + h))];
                self.push_path(PathKind::Rect, pts, start);
            }
            "c" => {
                let p0 = self.g.point;
                let c1 = (num(&args, 0), num(&args, 1));
                let c2 = (num(&args, 2), num(&args, 3));
                let to = (num(&args, 4), num(&args, 5));
                self.g.point = to;
                let pts: Vec<_> = [p0, c1, c2, to]
                    .iter()
                    .map(|&p| apply_matrix_pt(self.g.ctm, p))
                    .collect();
                let end = pts[3];
                self.push_path(PathKind::Bezier, pts, end);
            }
            "v" => {
                let p0 = self.g.point;
                let c2 = (num(&args, 0), num(&args, 1));
                let to = (num(&args, 2), num(&args, 3));
                self.g.point = to;
                let pts: Vec<_> = [p0, p0, c2, to]
                    .iter()
                    .map(|&p| apply_matrix_pt(self.g.ctm, p))
                    .collect();
                let end = pts[3];
                self.push_path(PathKind::Bezier, pts, end);
            }
            "y" => {
                let p0 = self.g.point;
                let c1 = (num(&args, 0), num(&args, 1));
                let to = (num(&args, 2), num(&args, 3));
                self.g.point = to;
                let pts: Vec<_> = [p0, c1, to, to]
                    .iter()
                    .map(|&p| apply_matrix_pt(self.g.ctm, p))
                    .collect();
                let end = pts[3];
                self.push_path(PathKind::Bezier, pts, end);
            }

            // Text objects.
            "BT" => {
                self.g.tm = MATRIX_IDENTITY;
                self.g.tlm = MATRIX_IDENTITY;
            }
            "ET" => {}
            "Tc" => self.g.char_spacing = num(&args, 0),
            "Tw" => self.g.word_spacing = num(&args, 0),
            "Tz" => self.g.horiz_scale = num(&args, 0) / 100.0,
            "TL" => self.g.leading = num(&args, 0),
            "Tr" => self.g.render_mode = int(&args, 0),
            "Ts" => self.g.rise = num(&args, 0),
            "Tf" => {
                if args.len() != 2 {
                    return Err(PdfError::MalformedObject("bad Tf operands".into()));
                }
                if let PdfObject::Name(name) = &args[0] {
                    self.font = Some(self.page.font(name));
                }
                self.g.font_size = num(&args, 1);
            }
            "Td" | "TD" => {
                if args.len() != 2 {
                    return Err(PdfError::MalformedObject("bad Td operands".into()));
                }
                let (tx, ty) = (num(&args, 0), num(&args, 1));
                if op == "TD" {
                    self.g.leading = -ty;
                }
                self.g.tlm = mult_matrix(translation(tx, ty), self.g.tlm);
                self.g.tm = self.g.tlm;
            }
            "T*" => self.next_line(),
            "Tm" => {
                if args.len() != 6 {
                    return Err(PdfError::MalformedObject("bad Tm operands".into()));
                }
                let m = matrix_from(&args);
                self.g.tm = m;
                self.g.tlm = m;
            }
            "Tj" | "'" | "\"" => {
                if op == "\"" {
                    if args.len() != 3 {
                        return Err(PdfError::MalformedObject("bad \" operands".into()));
                    }
                    self.g.word_spacing = num(&args, 0);
                    self.g.char_spacing = num(&args, 1);
                    args.drain(..2);
                }
                if op != "Tj" {
                    self.next_line();
                }
                match args.first() {
                    Some(PdfObject::String(s)) => {
                        let s = s.clone();
                        self.show_text(&s);
                    }
                    _ => {
                        return Err(PdfError::MalformedObject(format!(
                            "bad {} operand",
                            op
                        )));
                    }
                }
            }
            "TJ" => {
                let items = match args.first() {
                    Some(PdfObject::Array(items)) => items.clone(),
                    _ => return Err(PdfError::MalformedObject("bad TJ operand".into())),
                };
                for item in items {
                    match item {
                        PdfObject::String(s) => self.show_text(&s),
                        PdfObject::Int(_) | PdfObject::Real(_) => {
                            let x = item.as_f64().unwrap_or(0.0);
                            let tx = (-x / 1000.0 + self.g.char_spacing)
                                * self.g.font_size
                                * self.g.horiz_scale;
                            self.g.tm = mult_matrix(translation(tx, 0.0), self.g.tm);
                        }
                        _ => {}
                    }
                }
            }

            // Color, clipping, path painting, marked content, images:
            // accepted and ignored, since they cannot move text.
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" | "h" | "W" | "W*"
            | "CS" | "cs" | "SC" | "SCN" | "sc" | "scn" | "G" | "g" | "RG" | "rg" | "K" | "k"
            | "sh" | "BMC" | "BDC" | "EMC" | "MP" | "DP" | "BX" | "EX" | "Do" | "BI" | "ID"
            | "EI" | "d0" | "d1" | "" => {}

            other => return Err(PdfError::UnknownOperator(other.to_string())),
        }
        Ok(())
    }
}
