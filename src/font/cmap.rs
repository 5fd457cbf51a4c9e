//! ToUnicode character maps.
//!
//! A CMap is a PostScript program declaring codespace ranges (valid
//! byte-prefix lengths) and bfrange/bfchar mappings from source codes to
//! UTF-16BE destinations. The builder runs on the PostScript machine;
//! decoding walks raw byte runs prefix-by-prefix.

use crate::error::Result;
use crate::interp::postscript::{self, OpHandler, Stack};
use crate::model::objects::PdfObject;
use crate::utils::{unpack_be, utf16_decode};

use super::encoding::NO_RUNE;

/// Destination of one bfrange entry.
#[derive(Debug, Clone)]
enum BfDest {
    /// Single UTF-16BE string; its low byte increments across the range.
    Single(Vec<u8>),
    /// One UTF-16BE string per code in the range.
    PerCode(Vec<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct BfRange {
    lo: Vec<u8>,
    hi: Vec<u8>,
    dst: BfDest,
}

/// A parsed ToUnicode CMap.
#[derive(Debug, Default)]
pub struct ToUnicodeCMap {
    /// Codespace ranges indexed by byte length minus one.
    space: [Vec<(Vec<u8>, Vec<u8>)>; 4],
    ranges: Vec<BfRange>,
}

impl ToUnicodeCMap {
    /// Parses CMap source; None when the program is malformed.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut builder = CMapBuilder::default();
        if postscript::interpret(data, &mut builder).is_err() {
            return None;
        }
        if builder.failed {
            return None;
        }
        Some(builder.map)
    }

    /// Decodes a raw byte run into positioned characters.
    ///
    /// For each remaining suffix, byte-prefix lengths 1 through 4 are
    /// tried against the codespace ranges; a matching prefix is then
    /// looked up among the bfranges of the same length. Unmatched bytes
    /// decode to the no-rune sentinel.
    pub fn decode(
        &self,
        raw: &[u8],
        width: &dyn Fn(u32) -> f64,
    ) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        let mut pos = 0;
        'parse: while pos < raw.len() {
            for n in 1..=4.min(raw.len() - pos) {
                let prefix = &raw[pos..pos + n];
                for (lo, hi) in &self.space[n - 1] {
                    if lo.as_slice() <= prefix && prefix <= hi.as_slice() {
                        pos += n;
                        for bf in &self.ranges {
                            if bf.lo.len() == n
                                && bf.lo.as_slice() <= prefix
                                && prefix <= bf.hi.as_slice()
                            {
                                out.push(self.decode_match(bf, prefix, width));
                                continue 'parse;
                            }
                        }
                        out.push((NO_RUNE.to_string(), 0.0));
                        continue 'parse;
                    }
                }
            }
            log::debug!("no codespace range for byte {:#04x}", raw[pos]);
            out.push((NO_RUNE.to_string(), 0.0));
            pos += 1;
        }
        out
    }

    fn decode_match(
        &self,
        bf: &BfRange,
        prefix: &[u8],
        width: &dyn Fn(u32) -> f64,
    ) -> (String, f64) {
        match &bf.dst {
            BfDest::Single(dst) => {
                let mut s = dst.clone();
                if bf.lo.as_slice() != prefix {
                    if let Some(last) = s.last_mut() {
                        let delta =
                            prefix[prefix.len() - 1].wrapping_sub(bf.lo[bf.lo.len() - 1]);
                        *last = last.wrapping_add(delta);
                    }
                }
                let code = unpack_be(&s) as u32;
                (utf16_decode(&s), width(code))
            }
            BfDest::PerCode(items) => {
                let q = prefix[prefix.len() - 1].wrapping_sub(bf.lo[bf.lo.len() - 1]) as usize;
                match items.get(q) {
                    Some(dst) => (
                        utf16_decode(dst),
                        width(prefix[prefix.len() - 1] as u32),
                    ),
                    None => (NO_RUNE.to_string(), 0.0),
                }
            }
        }
    }
}

/// OpHandler accumulating CMap declarations.
#[derive(Default)]
struct CMapBuilder {
    map: ToUnicodeCMap,
    /// Pending entry count between a begin/end pair, or None.
    count: Option<i64>,
    failed: bool,
}

impl OpHandler for CMapBuilder {
    fn on_op(&mut self, stack: &mut Stack, op: &str) -> Result<()> {
        if self.failed {
            return Ok(());
        }
        match op {
            "findresource" => {
                let _key = stack.pop();
                let _category = stack.pop();
                stack.push(PdfObject::Dict(Default::default()));
            }
            "begincmap" => stack.push(PdfObject::Dict(Default::default())),
            "endcmap" => {
                stack.pop();
            }
            "begincodespacerange" | "beginbfrange" | "beginbfchar" => {
                self.count = Some(stack.pop().as_int().unwrap_or(0));
            }
            "endcodespacerange" => {
                let Some(n) = self.count.take() else {
                    log::warn!("missing begincodespacerange");
                    self.failed = true;
                    return Ok(());
                };
                for _ in 0..n {
                    let hi = stack.pop();
                    let lo = stack.pop();
                    let (hi, lo) = match (hi.as_string(), lo.as_string()) {
                        (Ok(h), Ok(l)) => (h.to_vec(), l.to_vec()),
                        _ => {
                            self.failed = true;
                            return Ok(());
                        }
                    };
                    if lo.is_empty() || lo.len() != hi.len() || lo.len() > 4 {
                        log::warn!("bad codespace range");
                        self.failed = true;
                        return Ok(());
                    }
                    self.map.space[lo.len() - 1].push((lo, hi));
                }
            }
            "endbfrange" => {
                let Some(n) = self.count.take() else {
                    self.failed = true;
                    return Ok(());
                };
                for _ in 0..n {
                    let dst = stack.pop();
                    let hi = stack.pop();
                    let lo = stack.pop();
                    self.push_range(lo, hi, dst);
                }
            }
            "endbfchar" => {
                let Some(n) = self.count.take() else {
                    self.failed = true;
                    return Ok(());
                };
                for _ in 0..n {
                    let dst = stack.pop();
                    let lo = stack.pop();
                    let hi = lo.clone();
                    self.push_range(lo, hi, dst);
                }
            }
            "defineresource" => {
                let _name = stack.pop();
                let value = stack.pop();
                let _category = stack.pop();
                stack.push(value);
            }
            "CMapName" => {
                let _ = stack.pop();
            }
            other => {
                log::debug!("ignoring cmap operator {:?}", other);
            }
        }
        Ok(())
    }
}

impl CMapBuilder {
    fn push_range(&mut self, lo: PdfObject, hi: PdfObject, dst: PdfObject) {
        let (lo, hi) = match (lo.as_string(), hi.as_string()) {
            (Ok(l), Ok(h)) if !l.is_empty() && l.len() == h.len() => (l.to_vec(), h.to_vec()),
            _ => {
                self.failed = true;
                return;
            }
        };
        let dst = match dst {
            PdfObject::String(s) => BfDest::Single(s),
            PdfObject::Array(items) => {
                let mut strings = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        PdfObject::String(s) => strings.push(s),
                        _ => {
                            self.failed = true;
                            return;
                        }
                    }
                }
                BfDest::PerCode(strings)
            }
            _ => {
                self.failed = true;
                return;
            }
        };
        self.map.ranges.push(BfRange { lo, hi, dst });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<00> <ff>
endcodespacerange
2 beginbfrange
<41> <5a> <0041>
<61> <63> [<2460> <2461> <2462>]
endbfrange
1 beginbfchar
<20> <0020>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

    fn no_widths(_: u32) -> f64 {
        0.0
    }

    #[test]
    fn parses_and_decodes_ranges() {
        let cmap = ToUnicodeCMap::parse(SAMPLE).expect("cmap");
        let out = cmap.decode(b"AB Z", &no_widths);
        let text: String = out.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(text, "AB Z");
    }

    #[test]
    fn per_code_array_destinations() {
        let cmap = ToUnicodeCMap::parse(SAMPLE).expect("cmap");
        let out = cmap.decode(b"abc", &no_widths);
        let text: String = out.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(text, "\u{2460}\u{2461}\u{2462}");
    }

    #[test]
    fn unmatched_codes_become_sentinels() {
        let cmap = ToUnicodeCMap::parse(SAMPLE).expect("cmap");
        let out = cmap.decode(&[0x7F], &no_widths);
        assert_eq!(out, vec![(NO_RUNE.to_string(), 0.0)]);
    }

    #[test]
    fn two_byte_codespace() {
        let src = b"begincmap
1 begincodespacerange
<0000> <ffff>
endcodespacerange
1 beginbfrange
<0048> <004c> <0048>
endbfrange
endcmap
";
        let cmap = ToUnicodeCMap::parse(src).expect("cmap");
        let out = cmap.decode(&[0x00, 0x48, 0x00, 0x4A], &no_widths);
        let text: String = out.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(text, "HJ");
    }

    #[test]
    fn widths_come_from_destination_codes() {
        let cmap = ToUnicodeCMap::parse(SAMPLE).expect("cmap");
        let out = cmap.decode(b"A", &|code| code as f64);
        assert_eq!(out[0].1, 0x41 as f64);
    }

    #[test]
    fn malformed_codespace_fails_parse() {
        let src = b"begincmap
1 begincodespacerange
<00> <ffff>
endcodespacerange
endcmap
";
        assert!(ToUnicodeCMap::parse(src).is_none());
    }
}
