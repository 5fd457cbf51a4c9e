#![allow(dead_code)]

//! Programmatic fixture PDFs for the integration tests.
//!
//! `PdfBuilder` lays out indirect objects, writes a classic xref table,
//! and appends the trailer; `build_update` appends an incremental
//! section chained through Prev. Encryption helpers run the standard
//! key derivation forward so tests can produce files the library must
//! decrypt.

use std::collections::BTreeMap;
use std::io::Write;

use sucre::codec::crypt::rc4;

pub struct PdfBuilder {
    objects: BTreeMap<u32, Vec<u8>>,
    trailer_extra: String,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            trailer_extra: String::new(),
        }
    }

    /// Adds an indirect object with the given body text.
    pub fn obj(&mut self, id: u32, body: &str) -> &mut Self {
        self.objects.insert(id, body.as_bytes().to_vec());
        self
    }

    /// Adds a stream object; /Length is filled in from the payload.
    pub fn stream(&mut self, id: u32, dict: &str, payload: &[u8]) -> &mut Self {
        let mut body = format!("<< {} /Length {} >>\nstream\n", dict, payload.len()).into_bytes();
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\nendstream");
        self.objects.insert(id, body);
        self
    }

    /// Appends raw text to the trailer dictionary.
    pub fn trailer_entry(&mut self, text: &str) -> &mut Self {
        self.trailer_extra.push(' ');
        self.trailer_extra.push_str(text);
        self
    }

    /// Serializes with a classic xref table.
    pub fn build(&self, root: u32) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = BTreeMap::new();
        for (&id, body) in &self.objects {
            offsets.insert(id, out.len());
            out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let size = self.objects.keys().max().copied().unwrap_or(0) + 1;
        let xref_pos = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        for id in 0..size {
            match offsets.get(&id) {
                Some(off) => {
                    out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes())
                }
                None => out.extend_from_slice(b"0000000000 65535 f \n"),
            }
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R{} >>\nstartxref\n{}\n%%EOF\n",
                size, root, self.trailer_extra, xref_pos
            )
            .as_bytes(),
        );
        out
    }

    /// Appends this builder's objects to `base` as an incremental
    /// update whose trailer points at `prev_xref`.
    pub fn build_update(&self, base: &[u8], prev_xref: usize, root: u32, size: u32) -> Vec<u8> {
        let mut out = base.to_vec();
        let mut offsets = BTreeMap::new();
        for (&id, body) in &self.objects {
            offsets.insert(id, out.len());
            out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_pos = out.len();
        out.extend_from_slice(b"xref\n");
        for (&id, &off) in &offsets {
            out.extend_from_slice(format!("{} 1\n{:010} 00000 n \n", id, off).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R /Prev {}{} >>\nstartxref\n{}\n%%EOF\n",
                size, root, prev_xref, self.trailer_extra, xref_pos
            )
            .as_bytes(),
        );
        out
    }

    /// Byte offset where `id 0 obj` will land in `build` output; only
    /// meaningful after all objects are added.
    pub fn offset_of(&self, id: u32) -> usize {
        let mut pos = b"%PDF-1.4\n".len();
        for (&oid, body) in &self.objects {
            if oid == id {
                return pos;
            }
            pos += format!("{} 0 obj\n", oid).len() + body.len() + b"\nendobj\n".len();
        }
        panic!("object {} not in builder", id);
    }
}

/// zlib-compresses a payload, as FlateDecode expects.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// A one-page document: Catalog (1), Pages (2), Page (3), contents (4),
/// font Helvetica/WinAnsi (5).
pub fn one_page_doc(content: &str) -> Vec<u8> {
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
    b.stream(4, "", content.as_bytes());
    b.obj(
        5,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding \
         /FirstChar 32 /LastChar 126 /Widths [278 278 355 556 556 889 667 191 333 333 389 584 278 333 278 278 \
          556 556 556 556 556 556 556 556 556 556 278 278 584 584 584 556 \
          1015 667 667 722 722 667 611 778 722 278 500 667 556 833 722 778 \
          667 778 722 667 611 722 667 944 667 667 611 278 278 278 469 556 \
          333 556 556 500 556 556 278 556 556 222 222 500 222 833 556 556 \
          556 556 333 500 278 556 500 722 500 500 500 334 260 334 584] >>",
    );
    b.build(1)
}

// Standard security handler forward computations (R2-R4), used to build
// encrypted fixtures.

pub const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Algorithm 2 file key.
pub fn derive_file_key(
    password: &[u8],
    o: &[u8],
    p: u32,
    doc_id: &[u8],
    r: i64,
    length_bits: i64,
) -> Vec<u8> {
    let mut ctx = md5::Context::new();
    if password.len() >= 32 {
        ctx.consume(&password[..32]);
    } else {
        ctx.consume(password);
        ctx.consume(&PASSWORD_PAD[..32 - password.len()]);
    }
    ctx.consume(o);
    ctx.consume(p.to_le_bytes());
    ctx.consume(doc_id);
    let mut key = ctx.compute().0.to_vec();

    let n = if r >= 3 { (length_bits / 8) as usize } else { 5 };
    if r >= 3 {
        for _ in 0..50 {
            key = md5::compute(&key[..n]).0.to_vec();
        }
    }
    key.truncate(n);
    key
}

/// Algorithm 4/5 user check value.
pub fn user_check(key: &[u8], doc_id: &[u8], r: i64) -> Vec<u8> {
    if r == 2 {
        return rc4(key, &PASSWORD_PAD);
    }
    let mut ctx = md5::Context::new();
    ctx.consume(PASSWORD_PAD);
    ctx.consume(doc_id);
    let mut u = rc4(key, &ctx.compute().0);
    for i in 1..=19u8 {
        let xored: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        u = rc4(&xored, &u);
    }
    // Stored U is 32 bytes; only the first 16 are significant for R>=3.
    u.extend_from_slice(&[0u8; 16]);
    u
}

/// Per-object key for RC4 or AES.
pub fn object_key(file_key: &[u8], id: u32, gen: u16, aes: bool) -> Vec<u8> {
    let mut ctx = md5::Context::new();
    ctx.consume(file_key);
    ctx.consume([
        id as u8,
        (id >> 8) as u8,
        (id >> 16) as u8,
        gen as u8,
        (gen >> 8) as u8,
    ]);
    if aes {
        ctx.consume(b"sAlT");
    }
    let digest = ctx.compute();
    let len = (file_key.len() + 5).min(16);
    digest.0[..len].to_vec()
}

/// Encodes bytes as a PDF hex string literal.
pub fn hex_string(data: &[u8]) -> String {
    let mut s = String::from("<");
    for b in data {
        s.push_str(&format!("{:02x}", b));
    }
    s.push('>');
    s
}

/// AES-128-CBC encryption of a stream payload: random-ish IV prefix plus
/// PKCS#7-padded ciphertext, the shape the decoder expects.
pub fn aes_encrypt_payload(key: &[u8], iv: &[u8; 16], plain: &[u8]) -> Vec<u8> {
    let pad = 16 - plain.len() % 16;
    let mut padded = plain.to_vec();
    padded.extend(std::iter::repeat(pad as u8).take(pad));
    let mut out = iv.to_vec();
    out.extend(sucre::codec::crypt::aes_cbc_encrypt(key, iv, &padded).unwrap());
    out
}

/// Applies the PNG Up filter forward: rows of `columns` bytes, each
/// emitted as filter byte 2 plus deltas against the previous row.
pub fn png_up_encode(data: &[u8], columns: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev = vec![0u8; columns];
    for row in data.chunks(columns) {
        out.push(2);
        for (i, &b) in row.iter().enumerate() {
            out.push(b.wrapping_sub(prev[i]));
        }
        prev[..row.len()].copy_from_slice(row);
    }
    out
}

/// Builds a document indexed by a cross-reference stream with
/// `W = [1 2 1]` records.
///
/// `objects` are written in order; `compressed` lists (id, owner stream,
/// index) entries for objects packed inside an object stream that must
/// itself appear among `objects`. When `predictor_columns` is set the
/// records are PNG-Up filtered and deflated.
pub fn build_xref_stream_doc(
    objects: &[(u32, Vec<u8>)],
    compressed: &[(u32, u32, u32)],
    xref_id: u32,
    root: u32,
    predictor_columns: Option<usize>,
) -> Vec<u8> {
    let mut out = b"%PDF-1.5\n".to_vec();
    let mut offsets = BTreeMap::new();
    for (id, body) in objects {
        offsets.insert(*id, out.len());
        out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_pos = out.len();
    offsets.insert(xref_id, xref_pos);

    let size = offsets
        .keys()
        .copied()
        .chain(compressed.iter().map(|&(id, _, _)| id))
        .max()
        .unwrap_or(0)
        + 1;

    let mut records = Vec::new();
    for id in 0..size {
        if let Some(&(_, owner, index)) = compressed.iter().find(|&&(cid, _, _)| cid == id) {
            records.push(2u8);
            records.extend_from_slice(&(owner as u16).to_be_bytes());
            records.push(index as u8);
        } else if let Some(&off) = offsets.get(&id) {
            records.push(1u8);
            records.extend_from_slice(&(off as u16).to_be_bytes());
            records.push(0u8);
        } else {
            records.extend_from_slice(&[0u8, 0, 0, 0]);
        }
    }

    let (payload, filter) = match predictor_columns {
        Some(columns) => (
            deflate(&png_up_encode(&records, columns)),
            format!(
                " /Filter /FlateDecode /DecodeParms << /Predictor 12 /Columns {} >>",
                columns
            ),
        ),
        None => (records, String::new()),
    };

    out.extend_from_slice(format!("{} 0 obj\n", xref_id).as_bytes());
    out.extend_from_slice(
        format!(
            "<< /Type /XRef /Size {} /W [1 2 1] /Root {} 0 R{} /Length {} >>\nstream\n",
            size,
            root,
            filter,
            payload.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&payload);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_pos).as_bytes());
    out
}
