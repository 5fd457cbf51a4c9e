//! Shared geometry and text helpers.
//!
//! Provides the affine matrix/point types used by the content interpreter
//! and the text-string decoders used by the value facade.

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A 6-element affine transformation matrix (a, b, c, d, e, f).
/// Transforms point (x, y) to (ax + cy + e, bx + dy + f).
pub type Matrix = (f64, f64, f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

/// Composes two transformations: the result applies m1 first, then m0.
pub fn mult_matrix(m1: Matrix, m0: Matrix) -> Matrix {
    let (a1, b1, c1, d1, e1, f1) = m1;
    let (a0, b0, c0, d0, e0, f0) = m0;
    (
        a0 * a1 + c0 * b1,
        b0 * a1 + d0 * b1,
        a0 * c1 + c0 * d1,
        b0 * c1 + d0 * d1,
        a0 * e1 + c0 * f1 + e0,
        b0 * e1 + d0 * f1 + f0,
    )
}

/// Builds a pure translation matrix.
pub fn translation(tx: f64, ty: f64) -> Matrix {
    (1.0, 0.0, 0.0, 1.0, tx, ty)
}

/// Applies a matrix to a point.
pub fn apply_matrix_pt(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Scale magnitude of a matrix's first column, `sqrt(a^2 + c^2)`.
///
/// Used both for effective font sizes and for stroked line widths.
pub fn matrix_scale(m: Matrix) -> f64 {
    (m.0 * m.0 + m.2 * m.2).sqrt()
}

/// Reads a big-endian unsigned integer from up to 8 bytes.
pub fn unpack_be(bytes: &[u8]) -> u64 {
    let mut val: u64 = 0;
    for &b in bytes {
        val = (val << 8) | b as u64;
    }
    val
}

/// Checks whether a text string carries the big-endian UTF-16 BOM.
pub fn is_utf16(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFE && data[1] == 0xFF
}

/// Decodes big-endian UTF-16 bytes (without BOM) to a String.
///
/// Surrogate pairs are combined; unpaired surrogates and odd trailing
/// bytes decode to U+FFFD.
pub fn utf16_decode(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    let mut out: String = char::decode_utf16(units.iter().copied())
        .map(|r| r.unwrap_or('\u{FFFD}'))
        .collect();
    if data.len() % 2 == 1 {
        out.push('\u{FFFD}');
    }
    out
}
