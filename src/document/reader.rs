//! The document reader: open handshake, cross-reference bootstrap,
//! object resolution, and the stream decoding pipeline.

use std::collections::HashSet;

use crate::document::security::StandardSecurityHandler;
use crate::document::value::Value;
use crate::document::xref::{self, XrefEntry, XrefTable};
use crate::error::{PdfError, Result};
use crate::model::objects::{Dict, ObjRef, PdfObject, PdfStream};
use crate::parser::lexer::{Lexer, Token};
use crate::parser::objects::ObjectParser;
use crate::source::ReadAt;

/// How many tail bytes are scanned for `startxref` and `%%EOF`.
const TAIL_CHUNK: usize = 100;

/// A single PDF open for reading.
///
/// The reader borrows its byte source and never mutates it. The xref
/// table and the file key are fixed at open; everything else is computed
/// per call, so a `Reader` is freely shareable for reads from one thread.
pub struct Reader<'a> {
    src: &'a dyn ReadAt,
    end: u64,
    xref: XrefTable,
    trailer: Dict,
    trailer_ptr: ObjRef,
    crypt: Option<StandardSecurityHandler>,
}

impl<'a> std::fmt::Debug for Reader<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("end", &self.end)
            .field("trailer_ptr", &self.trailer_ptr)
            .finish_non_exhaustive()
    }
}

impl<'a> Reader<'a> {
    /// Opens a document over `src` with the given total length.
    pub fn new(src: &'a dyn ReadAt, len: u64) -> Result<Self> {
        Self::new_encrypted(src, len, None)
    }

    /// Opens a document, obtaining passwords from `passwords` if the
    /// empty password does not unlock it. The callback is invoked until
    /// it returns an empty string, which aborts with `InvalidPassword`.
    pub fn new_encrypted(
        src: &'a dyn ReadAt,
        len: u64,
        mut passwords: Option<&mut dyn FnMut() -> String>,
    ) -> Result<Self> {
        check_header(src)?;
        let startxref = find_startxref(src, len)?;

        let mut reader = Self {
            src,
            end: len,
            xref: XrefTable::new(),
            trailer: Dict::new(),
            trailer_ptr: ObjRef::default(),
            crypt: None,
        };
        reader.load_xref(startxref)?;

        if !reader.trailer.contains_key("Encrypt") {
            return Ok(reader);
        }
        match reader.init_encrypt("") {
            Ok(()) => return Ok(reader),
            Err(PdfError::InvalidPassword) => {}
            Err(e) => return Err(e),
        }
        if let Some(pw) = passwords.as_mut() {
            loop {
                let next = pw();
                if next.is_empty() {
                    break;
                }
                if reader.init_encrypt(&next).is_ok() {
                    return Ok(reader);
                }
            }
        }
        Err(PdfError::InvalidPassword)
    }

    /// The top-level trailer dictionary.
    pub fn trailer(&self) -> Value<'_> {
        Value::new(
            self,
            self.trailer_ptr,
            PdfObject::Dict(self.trailer.clone()),
        )
    }

    pub(crate) fn crypt(&self) -> Option<&StandardSecurityHandler> {
        self.crypt.as_ref()
    }

    fn init_encrypt(&mut self, password: &str) -> Result<()> {
        let encrypt = match self.trailer.get("Encrypt") {
            Some(obj) => self.resolve(ObjRef::default(), obj.clone())?,
            None => return Ok(()),
        };
        let encrypt = match encrypt.raw() {
            PdfObject::Dict(d) => d.clone(),
            other => {
                return Err(PdfError::UnsupportedEncryption(format!(
                    "Encrypt is a {}",
                    other.type_name()
                )));
            }
        };

        let ids = match self.trailer.get("ID") {
            Some(obj) => self.resolve(ObjRef::default(), obj.clone())?,
            None => {
                return Err(PdfError::MalformedObject(
                    "encrypted file missing ID".into(),
                ));
            }
        };
        let first_id = ids.index(0)?;
        let doc_id = first_id.raw_bytes()?.to_vec();
        if doc_id.is_empty() && first_id.is_null() {
            return Err(PdfError::MalformedObject(
                "encrypted file missing ID".into(),
            ));
        }

        self.crypt = Some(StandardSecurityHandler::new(
            &encrypt,
            &doc_id,
            password.as_bytes(),
        )?);
        Ok(())
    }

    /// Parses the cross-reference data starting at `pos`, following the
    /// `Prev` chain for either encoding.
    fn load_xref(&mut self, pos: u64) -> Result<()> {
        let mut lex = Lexer::new(self.src, pos, self.end);
        let tok = lex.next_token()?;
        if tok.is_keyword("xref") {
            return self.load_xref_tables(lex);
        }
        if matches!(tok, Token::Int(_)) {
            lex.unread_token(tok);
            return self.load_xref_streams(lex);
        }
        Err(PdfError::MalformedXref(format!(
            "cross-reference table not found: {:?}",
            tok
        )))
    }

    /// Classic tables: subsections, then a trailer dict, chained by Prev.
    fn load_xref_tables(&mut self, mut lex: Lexer<'a>) -> Result<()> {
        let mut table = XrefTable::new();
        xref::read_table_sections(&mut lex, &mut table)?;
        let newest = self.read_trailer_dict(&mut lex)?;

        let mut prev = newest.get("Prev").cloned();
        let mut seen = HashSet::new();
        while let Some(off_obj) = prev {
            let off = off_obj
                .as_int()
                .map_err(|_| PdfError::MalformedXref("Prev is not an integer".into()))?;
            if off < 0 || !seen.insert(off) {
                break;
            }
            lex.seek(off as u64);
            if !lex.next_token()?.is_keyword("xref") {
                return Err(PdfError::MalformedXref(
                    "Prev does not point at an xref table".into(),
                ));
            }
            xref::read_table_sections(&mut lex, &mut table)?;
            let trailer = self.read_trailer_dict(&mut lex)?;
            prev = trailer.get("Prev").cloned();
        }

        let size = newest
            .get("Size")
            .and_then(|s| s.as_int().ok())
            .ok_or_else(|| PdfError::MalformedXref("trailer missing Size".into()))?;
        if size >= 0 {
            table.truncate(size as usize);
        }

        self.xref = table;
        self.trailer = newest;
        self.trailer_ptr = ObjRef::default();
        Ok(())
    }

    fn read_trailer_dict(&self, lex: &mut Lexer<'a>) -> Result<Dict> {
        // Reuse the lexer position for the object parse; strings in the
        // trailer are never encrypted.
        let mut parser = ObjectParser::new(Lexer::new(self.src, lex.read_offset(), self.end));
        let obj = parser.read_object()?;
        let dict = match obj {
            PdfObject::Dict(d) => d,
            other => {
                return Err(PdfError::MalformedXref(format!(
                    "xref table not followed by trailer dictionary (found {})",
                    other.type_name()
                )));
            }
        };
        lex.seek(parser.lexer().read_offset());
        Ok(dict)
    }

    /// Xref streams: an indirect stream object with /Type /XRef.
    fn load_xref_streams(&mut self, lex: Lexer<'a>) -> Result<()> {
        let mut table = XrefTable::new();
        let (ptr, dict, size) = self.load_one_xref_stream(lex, &mut table, None)?;

        let mut prev = dict.get("Prev").cloned();
        let mut seen = HashSet::new();
        while let Some(off_obj) = prev {
            let off = off_obj
                .as_int()
                .map_err(|_| PdfError::MalformedXref("Prev is not an integer".into()))?;
            if off < 0 || !seen.insert(off) {
                break;
            }
            let lex = Lexer::new(self.src, off as u64, self.end);
            let (_, prev_dict, _) = self.load_one_xref_stream(lex, &mut table, Some(size))?;
            prev = prev_dict.get("Prev").cloned();
        }

        table.truncate(size as usize);
        self.xref = table;
        self.trailer = dict;
        self.trailer_ptr = ptr;
        Ok(())
    }

    /// Parses and applies one xref stream; returns its pointer, header
    /// dict, and Size. When `max_size` is set (Prev predecessors), the
    /// stream's Size must not exceed it.
    fn load_one_xref_stream(
        &self,
        lex: Lexer<'a>,
        table: &mut XrefTable,
        max_size: Option<i64>,
    ) -> Result<(ObjRef, Dict, i64)> {
        let mut parser = ObjectParser::new(lex);
        let obj = parser.read_object()?;
        let def = match obj {
            PdfObject::Def(d) => d,
            other => {
                return Err(PdfError::MalformedXref(format!(
                    "xref stream not found (got {})",
                    other.type_name()
                )));
            }
        };
        let strm = match def.obj {
            PdfObject::Stream(s) => s,
            other => {
                return Err(PdfError::MalformedXref(format!(
                    "xref stream not found (got {})",
                    other.type_name()
                )));
            }
        };
        match strm.dict.get("Type") {
            Some(PdfObject::Name(t)) if t == "XRef" => {}
            _ => {
                return Err(PdfError::MalformedXref(
                    "xref stream does not have type XRef".into(),
                ));
            }
        }
        let size = strm
            .dict
            .get("Size")
            .and_then(|s| s.as_int().ok())
            .ok_or_else(|| PdfError::MalformedXref("xref stream missing Size".into()))?;
        if size < 0 {
            return Err(PdfError::MalformedXref("negative Size".into()));
        }
        if let Some(max) = max_size {
            if size > max {
                return Err(PdfError::MalformedXref(
                    "xref Prev stream larger than the newest stream".into(),
                ));
            }
        }

        let data = self.decode_stream_payload(&strm)?;
        xref::apply_stream_records(table, &strm.dict, &data, size as u64)?;
        Ok((def.ptr, strm.dict, size))
    }

    /// Resolves a raw object to a value, following a single indirect
    /// reference. Anything other than a reference wraps directly.
    pub(crate) fn resolve(&self, parent: ObjRef, obj: PdfObject) -> Result<Value<'_>> {
        let ptr = match obj {
            PdfObject::Ref(ptr) => ptr,
            PdfObject::Def(_) => {
                return Err(PdfError::MalformedObject(
                    "object definition in value position".into(),
                ));
            }
            other => return Ok(Value::new(self, parent, other)),
        };

        if !self.xref.in_bounds(ptr.id) {
            return Err(PdfError::ObjectOutOfBounds(ptr.id));
        }
        match self.xref.get(ptr.id) {
            XrefEntry::Free => Ok(Value::new(self, ptr, PdfObject::Null)),
            XrefEntry::Inline { gen, offset } => {
                if gen != ptr.gen || offset == 0 {
                    return Ok(Value::new(self, ptr, PdfObject::Null));
                }
                let obj = self.parse_object_at(offset, ptr)?;
                Ok(Value::new(self, ptr, obj))
            }
            XrefEntry::Compressed { stream, .. } => {
                let obj = self.parse_object_in_stream(stream, ptr)?;
                Ok(Value::new(self, ptr, obj))
            }
        }
    }

    /// Parses the indirect object definition stored at `offset`; its
    /// pointer must match `ptr`.
    fn parse_object_at(&self, offset: u64, ptr: ObjRef) -> Result<PdfObject> {
        let lex = Lexer::new(self.src, offset, self.end);
        let crypt = self
            .crypt
            .as_ref()
            .map(|c| c as &dyn crate::parser::objects::Decryptor);
        let mut parser = ObjectParser::with_crypt(lex, crypt);
        let obj = parser.read_object()?;
        match obj {
            PdfObject::Def(def) => {
                if def.ptr != ptr {
                    return Err(PdfError::MalformedObject(format!(
                        "loading {} found {}",
                        ptr, def.ptr
                    )));
                }
                Ok(def.obj)
            }
            other => Err(PdfError::MalformedObject(format!(
                "loading {} found {} instead of an object definition",
                ptr,
                other.type_name()
            ))),
        }
    }

    /// Locates `ptr` inside the object stream `stream_id`, following the
    /// Extends chain; a missing id resolves to Null.
    fn parse_object_in_stream(&self, stream_id: u32, ptr: ObjRef) -> Result<PdfObject> {
        // Object streams are never themselves stored compressed.
        if matches!(self.xref.get(stream_id), XrefEntry::Compressed { .. }) {
            return Err(PdfError::MalformedXref(format!(
                "object stream {} is stored compressed",
                stream_id
            )));
        }

        let mut seen: HashSet<u32> = HashSet::new();
        let mut current = stream_id;
        loop {
            if !seen.insert(current) {
                return Ok(PdfObject::Null);
            }
            let holder = self.resolve(ObjRef::default(), PdfObject::Ref(ObjRef::new(current, 0)))?;
            let strm = match holder.raw() {
                PdfObject::Stream(s) => s.as_ref().clone(),
                other => {
                    return Err(PdfError::MalformedObject(format!(
                        "object stream {} is a {}",
                        current,
                        other.type_name()
                    )));
                }
            };
            match strm.dict.get("Type") {
                Some(PdfObject::Name(t)) if t == "ObjStm" => {}
                _ => {
                    return Err(PdfError::MalformedObject(format!(
                        "object stream {} does not have type ObjStm",
                        current
                    )));
                }
            }
            let n = strm
                .dict
                .get("N")
                .and_then(|v| v.as_int().ok())
                .unwrap_or(0);
            let first = strm
                .dict
                .get("First")
                .and_then(|v| v.as_int().ok())
                .ok_or_else(|| {
                    PdfError::MalformedObject("object stream missing First".into())
                })?;

            let data = self.decode_stream_payload(&strm)?;
            let mut lex = Lexer::new(&data, 0, data.len() as u64);
            lex.allow_eof = true;
            let mut found = None;
            for _ in 0..n {
                let id = match lex.next_token()? {
                    Token::Int(v) => v,
                    _ => break,
                };
                let off = match lex.next_token()? {
                    Token::Int(v) => v,
                    _ => break,
                };
                if id >= 0 && id as u32 == ptr.id {
                    found = Some(off);
                    break;
                }
            }

            if let Some(off) = found {
                lex.seek_forward((first + off) as u64)?;
                let mut parser = ObjectParser::new(lex);
                return parser.read_object();
            }

            // Not here; continue through Extends.
            match strm.dict.get("Extends") {
                Some(ext) => {
                    let ext_ptr = match ext {
                        PdfObject::Ref(r) => *r,
                        _ => return Ok(PdfObject::Null),
                    };
                    current = ext_ptr.id;
                }
                None => return Ok(PdfObject::Null),
            }
        }
    }

    /// Decodes a stream's payload: raw window, per-object decryption,
    /// then the filter chain.
    pub(crate) fn decode_stream_payload(&self, strm: &PdfStream) -> Result<Vec<u8>> {
        let length = match strm.dict.get("Length") {
            Some(obj) => self
                .resolve(strm.ptr, obj.clone())?
                .as_i64()
                .map_err(|_| PdfError::MalformedStream("non-integer Length".into()))?,
            None => 0,
        };
        if length < 0 {
            return Err(PdfError::MalformedStream("negative Length".into()));
        }

        let mut data = self.read_exact_at(strm.offset, length as usize)?;

        if let Some(crypt) = &self.crypt {
            if strm.ptr.id != 0 {
                data = crypt.decrypt_stream(strm.ptr, &data);
            }
        }

        let filter = match strm.dict.get("Filter") {
            Some(obj) => self.resolve(strm.ptr, obj.clone())?.into_raw(),
            None => PdfObject::Null,
        };
        let parms = match strm.dict.get("DecodeParms") {
            Some(obj) => self.resolve(strm.ptr, obj.clone())?.into_raw(),
            None => PdfObject::Null,
        };

        match &filter {
            PdfObject::Null => Ok(data),
            PdfObject::Name(name) => self.run_filter(name, &parms, data, strm.ptr),
            PdfObject::Array(filters) => {
                for (i, f) in filters.iter().enumerate() {
                    let name = match self.resolve(strm.ptr, f.clone())?.into_raw() {
                        PdfObject::Name(n) => n,
                        other => {
                            return Err(PdfError::MalformedStream(format!(
                                "filter entry is a {}",
                                other.type_name()
                            )));
                        }
                    };
                    let entry = match &parms {
                        PdfObject::Array(entries) => {
                            entries.get(i).cloned().unwrap_or(PdfObject::Null)
                        }
                        single => single.clone(),
                    };
                    data = self.run_filter(&name, &entry, data, strm.ptr)?;
                }
                Ok(data)
            }
            other => Err(PdfError::MalformedStream(format!(
                "Filter is a {}",
                other.type_name()
            ))),
        }
    }

    fn run_filter(
        &self,
        name: &str,
        parms: &PdfObject,
        data: Vec<u8>,
        ptr: ObjRef,
    ) -> Result<Vec<u8>> {
        let (predictor, columns) = match parms {
            PdfObject::Dict(d) => {
                let pred = match d.get("Predictor") {
                    Some(p) => self.resolve(ptr, p.clone())?.as_i64().unwrap_or(1),
                    None => 1,
                };
                let cols = match d.get("Columns") {
                    Some(c) => self.resolve(ptr, c.clone())?.as_i64().unwrap_or(1),
                    None => 1,
                };
                (pred, cols.max(1) as usize)
            }
            _ => (1, 1),
        };
        crate::codec::flate::apply_filter(name, predictor, columns, &data)
    }

    /// Reads exactly `len` bytes at `pos`.
    fn read_exact_at(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        let mut done = 0;
        while done < len {
            let n = self
                .src
                .read_at(pos + done as u64, &mut out[done..])
                .map_err(PdfError::Io)?;
            if n == 0 {
                return Err(PdfError::MalformedStream(format!(
                    "stream extends past end of file (wanted {} bytes at {})",
                    len, pos
                )));
            }
            done += n;
        }
        Ok(out)
    }
}

/// Verifies the `%PDF-1.n` header.
fn check_header(src: &dyn ReadAt) -> Result<()> {
    let mut buf = [0u8; 10];
    let mut n = 0;
    while n < buf.len() {
        let got = src.read_at(n as u64, &mut buf[n..]).map_err(PdfError::Io)?;
        if got == 0 {
            break;
        }
        n += got;
    }
    if n < 10
        || !buf.starts_with(b"%PDF-1.")
        || !(b'0'..=b'7').contains(&buf[7])
        || (buf[8] != b'\r' && buf[8] != b'\n')
    {
        return Err(PdfError::MalformedHeader("invalid %PDF-1.x header".into()));
    }
    Ok(())
}

/// Verifies the `%%EOF` marker and returns the startxref offset.
fn find_startxref(src: &dyn ReadAt, end: u64) -> Result<u64> {
    let chunk = (TAIL_CHUNK as u64).min(end) as usize;
    let mut buf = vec![0u8; chunk];
    let base = end - chunk as u64;
    let mut n = 0;
    while n < chunk {
        let got = src
            .read_at(base + n as u64, &mut buf[n..])
            .map_err(PdfError::Io)?;
        if got == 0 {
            break;
        }
        n += got;
    }
    buf.truncate(n);

    let mut tail: &[u8] = &buf;
    while let Some((&last, rest)) = tail.split_last() {
        if matches!(last, b'\r' | b'\n' | b'\t' | b' ' | b'\0') {
            tail = rest;
        } else {
            break;
        }
    }
    if !tail.ends_with(b"%%EOF") {
        return Err(PdfError::MalformedHeader("missing %%EOF".into()));
    }

    let i = find_last_line(&buf, b"startxref").ok_or_else(|| {
        PdfError::MalformedXref("missing final startxref".into())
    })?;

    let pos = base + i as u64;
    let mut lex = Lexer::new(src, pos, end);
    if !lex.next_token()?.is_keyword("startxref") {
        return Err(PdfError::MalformedXref("missing startxref".into()));
    }
    match lex.next_token()? {
        Token::Int(v) if v >= 0 => Ok(v as u64),
        _ => Err(PdfError::MalformedXref(
            "startxref not followed by integer offset".into(),
        )),
    }
}

/// Finds the last occurrence of `needle` that sits on its own line.
fn find_last_line(buf: &[u8], needle: &[u8]) -> Option<usize> {
    let mut max = buf.len();
    loop {
        let window = &buf[..max];
        let i = window
            .windows(needle.len())
            .rposition(|w| w == needle)?;
        if i == 0 || i + needle.len() >= buf.len() {
            return None;
        }
        let before = buf[i - 1];
        let after = buf[i + needle.len()];
        if (before == b'\n' || before == b'\r') && (after == b'\n' || after == b'\r') {
            return Some(i);
        }
        max = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_last_line_requires_line_boundaries() {
        let buf = b"xstartxrefy\nstartxref\n123\n%%EOF";
        let i = find_last_line(buf, b"startxref").unwrap();
        assert_eq!(&buf[i..i + 9], b"startxref");
        assert_eq!(buf[i - 1], b'\n');
    }

    #[test]
    fn header_check_rejects_bad_versions() {
        let good: &[u8] = b"%PDF-1.4\n%rest";
        assert!(check_header(&good).is_ok());
        let bad_version: &[u8] = b"%PDF-1.9\n%rest";
        assert!(check_header(&bad_version).is_err());
        let bad_magic: &[u8] = b"%FDP-1.4\n%rest";
        assert!(check_header(&bad_magic).is_err());
        let short: &[u8] = b"%PDF-1.4";
        assert!(check_header(&short).is_err());
    }

    #[test]
    fn startxref_is_located_in_tail() {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend_from_slice(b"1 0 obj null endobj\n");
        pdf.extend_from_slice(b"startxref\n9\n%%EOF\n");
        let off = find_startxref(&pdf.as_slice(), pdf.len() as u64).unwrap();
        assert_eq!(off, 9);
    }

    #[test]
    fn missing_eof_is_rejected() {
        let pdf = b"%PDF-1.4\nstartxref\n9\n".to_vec();
        assert!(matches!(
            find_startxref(&pdf.as_slice(), pdf.len() as u64),
            Err(PdfError::MalformedHeader(_))
        ));
    }
}
