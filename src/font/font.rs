//! Font dictionaries: width tables and text decoding.
//!
//! A font pairs a width grabber (simple `Widths` array or CID `W`
//! ranges) with a text encoding (byte table, identity 16-bit, Differences
//! overrides, or a ToUnicode CMap). Construction never fails; anything
//! unrecognized degrades to the pass-through encoder with zero-width
//! defaults, matching the zero-value discipline of the value facade.

use crate::document::value::{Kind, Value};
use crate::error::Result;
use crate::model::state::PositionedChar;

use super::cmap::ToUnicodeCMap;
use super::encoding::{
    self, encoding_with_differences, DiffEntry, MAC_ROMAN, PDF_DOC, WIN_ANSI,
};

/// Per-code glyph widths, thousandths of an em.
enum WidthGrabber {
    /// Simple fonts: `Widths[code - FirstChar]` for codes in
    /// `[FirstChar, LastChar)`, 0 elsewhere.
    Simple {
        first: u32,
        last: u32,
        widths: Vec<f64>,
    },
    /// CID fonts: ranges parsed from `DescendantFonts[0].W`, falling
    /// back to `DW`.
    Cid {
        ranges: Vec<CidRange>,
        default: f64,
    },
}

struct CidRange {
    /// Inclusive start CID.
    start: u32,
    /// Exclusive end CID.
    end: u32,
    widths: CidWidths,
}

enum CidWidths {
    PerGlyph(Vec<f64>),
    Uniform(f64),
}

impl WidthGrabber {
    fn width(&self, code: u32) -> f64 {
        match self {
            Self::Simple {
                first,
                last,
                widths,
            } => {
                if code < *first || code >= *last {
                    return 0.0;
                }
                widths.get((code - first) as usize).copied().unwrap_or(0.0)
            }
            Self::Cid { ranges, default } => {
                for r in ranges {
                    if code >= r.start && code < r.end {
                        return match &r.widths {
                            CidWidths::PerGlyph(ws) => {
                                ws.get((code - r.start) as usize).copied().unwrap_or(0.0)
                            }
                            CidWidths::Uniform(w) => *w,
                        };
                    }
                }
                *default
            }
        }
    }
}

enum TextEncoding {
    /// Built-in 256-entry byte table.
    Byte(&'static [char; 256]),
    /// Table rebuilt from a base encoding plus Differences.
    Table(Box<[char; 256]>),
    /// Big-endian 16-bit pass-through (Identity-H/V).
    Identity,
    /// ToUnicode CMap.
    CMap(Box<ToUnicodeCMap>),
    /// Bytes pass through unchanged.
    Nop,
}

/// A font resource attached to a page.
pub struct Font<'r> {
    v: Value<'r>,
    widths: WidthGrabber,
    enc: TextEncoding,
}

impl<'r> Font<'r> {
    /// Interprets a font dictionary value.
    pub fn from_value(v: Value<'r>) -> Self {
        let widths = cid_width_grabber(&v)
            .ok()
            .flatten()
            .unwrap_or_else(|| simple_width_grabber(&v));
        let enc = choose_encoding(&v).unwrap_or(TextEncoding::Nop);
        Self { v, widths, enc }
    }

    /// The font dictionary this font was built from.
    pub fn value(&self) -> &Value<'r> {
        &self.v
    }

    /// The BaseFont name.
    pub fn base_font(&self) -> String {
        self.v
            .key("BaseFont")
            .and_then(|v| v.as_name().map(|s| s.to_string()))
            .unwrap_or_default()
    }

    /// FontWeight from the descriptor, falling back through the
    /// descendant font; 0 when absent.
    pub fn font_weight(&self) -> f64 {
        let direct = self.v.key("FontDescriptor").unwrap_or_else(|_| Value::null());
        let fd = if direct.is_null() {
            self.v
                .key("DescendantFonts")
                .and_then(|d| d.index(0))
                .and_then(|d| d.key("FontDescriptor"))
                .unwrap_or_else(|_| Value::null())
        } else {
            direct
        };
        fd.key("FontWeight")
            .and_then(|w| w.as_f64())
            .unwrap_or(0.0)
    }

    /// The first code covered by a simple font's Widths array.
    pub fn first_char(&self) -> i64 {
        self.v
            .key("FirstChar")
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    /// One past the last code covered by a simple font's Widths array.
    pub fn last_char(&self) -> i64 {
        self.v
            .key("LastChar")
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    /// Glyph advance width for a code, thousandths of an em.
    pub fn width(&self, code: u32) -> f64 {
        self.widths.width(code)
    }

    /// Decodes raw show-string bytes into positioned characters.
    pub fn decode(&self, raw: &[u8]) -> Vec<PositionedChar> {
        match &self.enc {
            TextEncoding::Byte(table) => self.decode_bytes(table, raw),
            TextEncoding::Table(table) => self.decode_bytes(table, raw),
            TextEncoding::Identity => raw
                .chunks_exact(2)
                .map(|pair| {
                    let cid = u16::from_be_bytes([pair[0], pair[1]]) as u32;
                    PositionedChar {
                        text: char::from_u32(cid).unwrap_or(encoding::NO_RUNE).to_string(),
                        width: self.widths.width(cid),
                    }
                })
                .collect(),
            TextEncoding::CMap(cmap) => cmap
                .decode(raw, &|code| self.widths.width(code))
                .into_iter()
                .map(|(text, width)| PositionedChar { text, width })
                .collect(),
            TextEncoding::Nop => raw
                .iter()
                .map(|&b| PositionedChar {
                    text: (b as char).to_string(),
                    width: self.widths.width(b as u32),
                })
                .collect(),
        }
    }

    fn decode_bytes(&self, table: &[char; 256], raw: &[u8]) -> Vec<PositionedChar> {
        raw.iter()
            .map(|&b| PositionedChar {
                text: table[b as usize].to_string(),
                width: self.widths.width(b as u32),
            })
            .collect()
    }
}

/// Builds the CID width grabber when `DescendantFonts[0].W` is an array.
///
/// W alternates two entry shapes: `first [w1 w2 ...]` assigns per-glyph
/// widths to consecutive CIDs, and `first last w` spreads one width over
/// a range.
fn cid_width_grabber(v: &Value<'_>) -> Result<Option<WidthGrabber>> {
    let descendant = v.key("DescendantFonts")?.index(0)?;
    let w = descendant.key("W")?;
    if w.kind() != Kind::Array {
        return Ok(None);
    }
    let default = descendant.key("DW")?.as_f64().unwrap_or(0.0);

    let mut ranges = Vec::new();
    let mut i = 0;
    while i + 1 < w.len() {
        let start = w.index(i)?.as_i64().unwrap_or(0) as u32;
        let second = w.index(i + 1)?;
        if second.kind() == Kind::Array {
            let mut widths = Vec::with_capacity(second.len());
            for j in 0..second.len() {
                widths.push(second.index(j)?.as_f64().unwrap_or(0.0));
            }
            let end = start + widths.len() as u32;
            ranges.push(CidRange {
                start,
                end,
                widths: CidWidths::PerGlyph(widths),
            });
            i += 2;
        } else {
            let end = second.as_i64().unwrap_or(0) as u32;
            let width = if i + 2 < w.len() {
                w.index(i + 2)?.as_f64().unwrap_or(0.0)
            } else {
                0.0
            };
            ranges.push(CidRange {
                start,
                end,
                widths: CidWidths::Uniform(width),
            });
            i += 3;
        }
    }
    Ok(Some(WidthGrabber::Cid { ranges, default }))
}

fn simple_width_grabber(v: &Value<'_>) -> WidthGrabber {
    let first = v
        .key("FirstChar")
        .and_then(|x| x.as_i64())
        .unwrap_or(0)
        .max(0) as u32;
    let last = v
        .key("LastChar")
        .and_then(|x| x.as_i64())
        .unwrap_or(0)
        .max(0) as u32;
    let w = v.key("Widths").unwrap_or_else(|_| Value::null());
    let mut widths = Vec::with_capacity(w.len());
    for i in 0..w.len() {
        widths.push(
            w.index(i)
                .and_then(|x| x.as_f64())
                .unwrap_or(0.0),
        );
    }
    WidthGrabber::Simple {
        first,
        last,
        widths,
    }
}

/// Picks the text encoding: named byte encodings first, then dictionary
/// Differences, then a ToUnicode CMap, and finally PDFDocEncoding.
fn choose_encoding(v: &Value<'_>) -> Result<TextEncoding> {
    let enc = v.key("Encoding")?;
    match enc.kind() {
        Kind::Name => match enc.as_name()? {
            "WinAnsiEncoding" => return Ok(TextEncoding::Byte(&WIN_ANSI)),
            "MacRomanEncoding" => return Ok(TextEncoding::Byte(&MAC_ROMAN)),
            "Identity-H" | "Identity-V" => {
                // A ToUnicode stream, when present, refines the raw
                // 16-bit codes into text.
                if let Some(cmap) = tounicode_cmap(v)? {
                    return Ok(TextEncoding::CMap(Box::new(cmap)));
                }
                return Ok(TextEncoding::Identity);
            }
            other => {
                log::warn!("unknown encoding {:?}", other);
                return Ok(TextEncoding::Nop);
            }
        },
        Kind::Dict => {
            let base = enc.key("BaseEncoding")?;
            let base_name = base.as_name().unwrap_or("").to_string();
            let diffs_val = enc.key("Differences")?;
            let mut diffs = Vec::with_capacity(diffs_val.len());
            for i in 0..diffs_val.len() {
                let entry = diffs_val.index(i)?;
                match entry.kind() {
                    Kind::Integer => {
                        let code = entry.as_i64()?;
                        if (0..=255).contains(&code) {
                            diffs.push(DiffEntry::Code(code as u8));
                        }
                    }
                    Kind::Name => diffs.push(DiffEntry::Name(entry.as_name()?.to_string())),
                    _ => {}
                }
            }
            return Ok(TextEncoding::Table(Box::new(encoding_with_differences(
                &base_name, &diffs,
            ))));
        }
        Kind::Null => {}
        other => {
            log::warn!("unexpected encoding of kind {:?}", other);
            return Ok(TextEncoding::Nop);
        }
    }

    if let Some(cmap) = tounicode_cmap(v)? {
        return Ok(TextEncoding::CMap(Box::new(cmap)));
    }
    Ok(TextEncoding::Byte(&PDF_DOC))
}

fn tounicode_cmap(v: &Value<'_>) -> Result<Option<ToUnicodeCMap>> {
    let tu = v.key("ToUnicode")?;
    if tu.kind() != Kind::Stream {
        return Ok(None);
    }
    let data = tu.stream_data()?;
    Ok(ToUnicodeCMap::parse(&data))
}
