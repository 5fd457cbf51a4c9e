//! FlateDecode and the PNG Up predictor.

use std::io::Read;

use crate::error::{PdfError, Result};

/// Inflates a zlib-wrapped stream.
pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PdfError::MalformedStream(format!("flate: {}", e)))?;
    Ok(out)
}

/// Reverses the PNG Up predictor (predictor 12).
///
/// Each encoded row is `1 + columns` bytes. The leading filter byte must
/// be 2 (Up); every data byte is the delta against the byte directly
/// above it, with the history initialized to zero.
pub fn png_up_decode(data: &[u8], columns: usize) -> Result<Vec<u8>> {
    let row_size = columns + 1;
    let mut hist = vec![0u8; columns];
    let mut out = Vec::with_capacity(data.len() - data.len() / row_size.max(1));

    for row in data.chunks(row_size) {
        if row.len() < row_size {
            return Err(PdfError::MalformedStream(
                "truncated predictor row".into(),
            ));
        }
        if row[0] != 2 {
            return Err(PdfError::MalformedStream(format!(
                "PNG predictor row filter {} (expected 2)",
                row[0]
            )));
        }
        for (h, &b) in hist.iter_mut().zip(&row[1..]) {
            *h = h.wrapping_add(b);
        }
        out.extend_from_slice(&hist);
    }
    Ok(out)
}

/// Applies one named filter with its predictor parameters.
pub fn apply_filter(
    name: &str,
    predictor: i64,
    columns: usize,
    data: &[u8],
) -> Result<Vec<u8>> {
    match name {
        "FlateDecode" => {
            let inflated = flate_decode(data)?;
            match predictor {
                1 => Ok(inflated),
                12 => png_up_decode(&inflated, columns),
                other => Err(PdfError::UnsupportedFilter(format!(
                    "FlateDecode predictor {}",
                    other
                ))),
            }
        }
        other => Err(PdfError::UnsupportedFilter(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn flate_round_trip() {
        let plain = b"stream payload stream payload stream payload";
        assert_eq!(flate_decode(&deflate(plain)).unwrap(), plain.to_vec());
    }

    #[test]
    fn png_up_rows_are_cumulative_sums() {
        // Output row i must equal the byte-wise cumulative sum of the
        // payload rows 0..=i, mod 256.
        let encoded = [
            2, 1, 2, 3, //
            2, 10, 20, 30, //
            2, 255, 0, 1,
        ];
        let decoded = png_up_decode(&encoded, 3).unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 11, 22, 33, 10, 22, 34]);
    }

    #[test]
    fn png_up_rejects_other_filters() {
        let encoded = [0u8, 1, 2, 3];
        assert!(matches!(
            png_up_decode(&encoded, 3),
            Err(PdfError::MalformedStream(_))
        ));
    }

    #[test]
    fn png_up_rejects_short_row() {
        let encoded = [2u8, 1, 2];
        assert!(png_up_decode(&encoded, 3).is_err());
    }

    #[test]
    fn unknown_filter_is_unsupported() {
        assert!(matches!(
            apply_filter("LZWDecode", 1, 1, b""),
            Err(PdfError::UnsupportedFilter(_))
        ));
    }

    #[test]
    fn flate_with_up_predictor() {
        let rows = [
            2u8, 5, 5, //
            2, 1, 1,
        ];
        let compressed = deflate(&rows);
        let out = apply_filter("FlateDecode", 12, 2, &compressed).unwrap();
        assert_eq!(out, vec![5, 5, 6, 6]);
    }
}
