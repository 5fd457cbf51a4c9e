//! Cross-reference table and stream decoding.
//!
//! The table maps object ids to entry variants. It is built once at open
//! by walking the `Prev` chain newest-first; an entry already present is
//! never overwritten, and ids beyond the table length read as Free.

use crate::error::{PdfError, Result};
use crate::model::objects::{Dict, PdfObject};
use crate::parser::lexer::{Lexer, Token};
use crate::utils::unpack_be;

/// Location of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Unused slot.
    Free,
    /// Object stored directly at a byte offset.
    Inline { gen: u16, offset: u64 },
    /// Object packed in an object stream: owning stream id plus the
    /// object's sequence index within that stream.
    Compressed { stream: u32, index: u32 },
}

/// Sparse id-indexed table. Slots are write-once.
#[derive(Debug, Default)]
pub struct XrefTable {
    slots: Vec<Option<XrefEntry>>,
}

impl XrefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entry for an id; ids at or past the table length are Free.
    pub fn get(&self, id: u32) -> XrefEntry {
        self.slots
            .get(id as usize)
            .copied()
            .flatten()
            .unwrap_or(XrefEntry::Free)
    }

    /// Whether the id is within the table bounds.
    pub fn in_bounds(&self, id: u32) -> bool {
        (id as usize) < self.slots.len()
    }

    /// Records an entry unless the slot was already populated by a newer
    /// xref section.
    pub fn set_if_absent(&mut self, id: u32, entry: XrefEntry) {
        let idx = id as usize;
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, None);
        }
        if self.slots[idx].is_none() {
            self.slots[idx] = Some(entry);
        }
    }

    /// Drops entries at or past `size` (the trailer Size bounds the id
    /// range).
    pub fn truncate(&mut self, size: usize) {
        if size < self.slots.len() {
            self.slots.truncate(size);
        }
    }
}

/// Reads classic xref table subsections from the lexer, which must be
/// positioned just after the `xref` keyword. Consumes the terminating
/// `trailer` keyword.
pub fn read_table_sections(lex: &mut Lexer<'_>, table: &mut XrefTable) -> Result<()> {
    loop {
        let tok = lex.next_token()?;
        if tok.is_keyword("trailer") {
            return Ok(());
        }
        let start = match tok {
            Token::Int(n) if n >= 0 => n as u64,
            _ => {
                return Err(PdfError::MalformedXref(
                    "expected subsection start".into(),
                ));
            }
        };
        let count = match lex.next_token()? {
            Token::Int(n) if n >= 0 => n as u64,
            _ => {
                return Err(PdfError::MalformedXref(
                    "expected subsection count".into(),
                ));
            }
        };

        for i in 0..count {
            let offset = match lex.next_token()? {
                Token::Int(n) if n >= 0 => n as u64,
                _ => return Err(PdfError::MalformedXref("bad entry offset".into())),
            };
            let gen = match lex.next_token()? {
                Token::Int(n) if (0..=u16::MAX as i64).contains(&n) => n as u16,
                _ => return Err(PdfError::MalformedXref("bad entry generation".into())),
            };
            let id = (start + i) as u32;
            match lex.next_token()? {
                Token::Keyword(kw) if kw == "n" => {
                    table.set_if_absent(id, XrefEntry::Inline { gen, offset });
                }
                Token::Keyword(kw) if kw == "f" => {
                    table.set_if_absent(id, XrefEntry::Free);
                }
                _ => return Err(PdfError::MalformedXref("bad entry marker".into())),
            }
        }
    }
}

/// Decodes one xref stream's records into the table.
///
/// `size` caps the id range this stream may populate; the decoded payload
/// holds fixed-width records described by the stream's `W` array, grouped
/// by the `Index` ranges.
pub fn apply_stream_records(
    table: &mut XrefTable,
    dict: &Dict,
    data: &[u8],
    size: u64,
) -> Result<()> {
    let w = match dict.get("W") {
        Some(PdfObject::Array(a)) => a,
        _ => return Err(PdfError::MalformedXref("xref stream missing W array".into())),
    };
    if w.len() < 3 {
        return Err(PdfError::MalformedXref(format!(
            "invalid W array of {} fields",
            w.len()
        )));
    }
    let mut widths = [0usize; 3];
    for (slot, field) in widths.iter_mut().zip(w) {
        let n = field
            .as_int()
            .map_err(|_| PdfError::MalformedXref("invalid W array".into()))?;
        if !(0..=8).contains(&n) {
            return Err(PdfError::MalformedXref(format!("invalid W width {}", n)));
        }
        *slot = n as usize;
    }
    let record_len = widths.iter().sum::<usize>();
    if record_len == 0 {
        return Err(PdfError::MalformedXref("zero-width xref records".into()));
    }

    let ranges: Vec<(u64, u64)> = match dict.get("Index") {
        None => vec![(0, size)],
        Some(PdfObject::Array(a)) => {
            if a.len() % 2 != 0 {
                return Err(PdfError::MalformedXref("odd Index array".into()));
            }
            let mut out = Vec::with_capacity(a.len() / 2);
            for pair in a.chunks(2) {
                let start = pair[0]
                    .as_int()
                    .map_err(|_| PdfError::MalformedXref("bad Index start".into()))?;
                let count = pair[1]
                    .as_int()
                    .map_err(|_| PdfError::MalformedXref("bad Index count".into()))?;
                if start < 0 || count < 0 {
                    return Err(PdfError::MalformedXref("negative Index range".into()));
                }
                out.push((start as u64, count as u64));
            }
            out
        }
        Some(_) => return Err(PdfError::MalformedXref("Index is not an array".into())),
    };

    let mut cursor = 0usize;
    for (start, count) in ranges {
        for i in 0..count {
            if cursor + record_len > data.len() {
                return Err(PdfError::MalformedXref("truncated xref stream".into()));
            }
            let record = &data[cursor..cursor + record_len];
            cursor += record_len;

            let kind = if widths[0] == 0 {
                1
            } else {
                unpack_be(&record[..widths[0]])
            };
            let f2 = unpack_be(&record[widths[0]..widths[0] + widths[1]]);
            let f3 = unpack_be(&record[widths[0] + widths[1]..]);

            let id = start + i;
            if id >= size {
                continue;
            }
            let id = id as u32;
            match kind {
                0 => table.set_if_absent(id, XrefEntry::Free),
                1 => table.set_if_absent(
                    id,
                    XrefEntry::Inline {
                        gen: f3 as u16,
                        offset: f2,
                    },
                ),
                2 => table.set_if_absent(
                    id,
                    XrefEntry::Compressed {
                        stream: f2 as u32,
                        index: f3 as u32,
                    },
                ),
                other => {
                    log::warn!("ignoring xref stream record of type {}", other);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_write_once() {
        let mut t = XrefTable::new();
        t.set_if_absent(3, XrefEntry::Inline { gen: 0, offset: 100 });
        t.set_if_absent(3, XrefEntry::Inline { gen: 0, offset: 999 });
        assert_eq!(t.get(3), XrefEntry::Inline { gen: 0, offset: 100 });
    }

    #[test]
    fn free_entries_mask_older_sections() {
        let mut t = XrefTable::new();
        t.set_if_absent(5, XrefEntry::Free);
        t.set_if_absent(5, XrefEntry::Inline { gen: 0, offset: 42 });
        assert_eq!(t.get(5), XrefEntry::Free);
    }

    #[test]
    fn out_of_range_reads_free() {
        let t = XrefTable::new();
        assert_eq!(t.get(17), XrefEntry::Free);
        assert!(!t.in_bounds(17));
    }

    #[test]
    fn table_sections_parse() {
        let input: &[u8] = b"0 2\n0000000000 65535 f \n0000000042 00000 n \n4 1\n0000000099 00001 n \ntrailer\n";
        let mut lex = Lexer::new(&input, 0, input.len() as u64);
        lex.allow_eof = true;
        let mut table = XrefTable::new();
        read_table_sections(&mut lex, &mut table).unwrap();
        assert_eq!(table.get(0), XrefEntry::Free);
        assert_eq!(table.get(1), XrefEntry::Inline { gen: 0, offset: 42 });
        assert_eq!(table.get(4), XrefEntry::Inline { gen: 1, offset: 99 });
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn stream_records_decode_all_variants() {
        let mut dict = Dict::new();
        dict.insert(
            "W".into(),
            PdfObject::Array(vec![
                PdfObject::Int(1),
                PdfObject::Int(2),
                PdfObject::Int(1),
            ]),
        );
        // id 0 free, id 1 inline at 0x0102 gen 0, id 2 in stream 3 index 1.
        let data = [
            0u8, 0, 0, 0, //
            1, 0x01, 0x02, 0, //
            2, 0, 3, 1,
        ];
        let mut table = XrefTable::new();
        apply_stream_records(&mut table, &dict, &data, 3).unwrap();
        assert_eq!(table.get(0), XrefEntry::Free);
        assert_eq!(table.get(1), XrefEntry::Inline { gen: 0, offset: 0x0102 });
        assert_eq!(table.get(2), XrefEntry::Compressed { stream: 3, index: 1 });
    }

    #[test]
    fn stream_records_honor_index_ranges() {
        let mut dict = Dict::new();
        dict.insert(
            "W".into(),
            PdfObject::Array(vec![
                PdfObject::Int(1),
                PdfObject::Int(1),
                PdfObject::Int(1),
            ]),
        );
        dict.insert(
            "Index".into(),
            PdfObject::Array(vec![PdfObject::Int(10), PdfObject::Int(2)]),
        );
        let data = [1u8, 5, 0, 1, 6, 0];
        let mut table = XrefTable::new();
        apply_stream_records(&mut table, &dict, &data, 12).unwrap();
        assert_eq!(table.get(10), XrefEntry::Inline { gen: 0, offset: 5 });
        assert_eq!(table.get(11), XrefEntry::Inline { gen: 0, offset: 6 });
        assert_eq!(table.get(9), XrefEntry::Free);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let mut dict = Dict::new();
        dict.insert(
            "W".into(),
            PdfObject::Array(vec![
                PdfObject::Int(1),
                PdfObject::Int(2),
                PdfObject::Int(1),
            ]),
        );
        let data = [1u8, 0, 0];
        let mut table = XrefTable::new();
        assert!(apply_stream_records(&mut table, &dict, &data, 1).is_err());
    }
}
