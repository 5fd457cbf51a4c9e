//! The value facade: a typed, navigable view over raw objects.
//!
//! Every navigation step (`key`, `index`) resolves at most one indirect
//! reference through the reader. Operations on Null return Null or the
//! zero value of the requested kind, so deep optional paths traverse
//! without per-step error handling.

use std::fmt;

use crate::document::reader::Reader;
use crate::error::Result;
use crate::model::objects::{ObjRef, PdfObject};
use crate::utils::{is_utf16, utf16_decode};

/// The kind of data underlying a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Integer,
    Real,
    String,
    Name,
    Dict,
    Array,
    Stream,
}

/// A single PDF value. The default value is the PDF null.
#[derive(Clone)]
pub struct Value<'r> {
    reader: Option<&'r Reader<'r>>,
    /// The indirect object this value was found in; scopes decryption.
    parent: ObjRef,
    obj: PdfObject,
}

impl<'r> Value<'r> {
    pub(crate) fn new(reader: &'r Reader<'r>, parent: ObjRef, obj: PdfObject) -> Self {
        Self {
            reader: Some(reader),
            parent,
            obj,
        }
    }

    /// A standalone null value.
    pub fn null() -> Self {
        Self {
            reader: None,
            parent: ObjRef::default(),
            obj: PdfObject::Null,
        }
    }

    pub fn kind(&self) -> Kind {
        match self.obj {
            PdfObject::Null | PdfObject::Ref(_) | PdfObject::Def(_) => Kind::Null,
            PdfObject::Bool(_) => Kind::Bool,
            PdfObject::Int(_) => Kind::Integer,
            PdfObject::Real(_) => Kind::Real,
            PdfObject::String(_) => Kind::String,
            PdfObject::Name(_) => Kind::Name,
            PdfObject::Dict(_) => Kind::Dict,
            PdfObject::Array(_) => Kind::Array,
            PdfObject::Stream(_) => Kind::Stream,
        }
    }

    pub fn is_null(&self) -> bool {
        self.obj.is_null()
    }

    /// The underlying raw object.
    pub fn raw(&self) -> &PdfObject {
        &self.obj
    }

    pub(crate) fn into_raw(self) -> PdfObject {
        self.obj
    }

    /// Boolean view; false unless the kind is Bool.
    pub fn as_bool(&self) -> Result<bool> {
        Ok(self.obj.as_bool()?)
    }

    /// Integer view; 0 for Null, error for other kinds.
    pub fn as_i64(&self) -> Result<i64> {
        Ok(self.obj.as_int()?)
    }

    /// Float view, coercing from Integer; 0.0 for Null.
    pub fn as_f64(&self) -> Result<f64> {
        Ok(self.obj.as_f64()?)
    }

    /// Name view, without the leading slash; empty for Null.
    pub fn as_name(&self) -> Result<&str> {
        Ok(self.obj.as_name()?)
    }

    /// Raw string bytes; empty for Null.
    pub fn raw_bytes(&self) -> Result<&[u8]> {
        Ok(self.obj.as_string()?)
    }

    /// The string interpreted as a PDF text string, converted to UTF-8.
    ///
    /// Strings starting with the FE FF BOM decode as big-endian UTF-16;
    /// strings wholly within PDFDocEncoding decode through its table;
    /// anything else passes through byte-for-byte.
    pub fn text(&self) -> String {
        let bytes = match &self.obj {
            PdfObject::String(s) => s.as_slice(),
            _ => return String::new(),
        };
        if is_utf16(bytes) {
            return utf16_decode(&bytes[2..]);
        }
        if let Some(decoded) = crate::font::encoding::pdf_doc_decode(bytes) {
            return decoded;
        }
        bytes.iter().map(|&b| b as char).collect()
    }

    /// Dictionary (or stream header) lookup. Absent keys and non-dict
    /// receivers yield Null; indirect references resolve one step.
    pub fn key(&self, name: &str) -> Result<Value<'r>> {
        let dict = match &self.obj {
            PdfObject::Dict(d) => d,
            PdfObject::Stream(s) => &s.dict,
            _ => return Ok(self.null_child()),
        };
        match dict.get(name) {
            Some(obj) => self.resolve_child(obj.clone()),
            None => Ok(self.null_child()),
        }
    }

    /// Sorted list of dictionary (or stream header) keys.
    pub fn keys(&self) -> Vec<String> {
        let dict = match &self.obj {
            PdfObject::Dict(d) => d,
            PdfObject::Stream(s) => &s.dict,
            _ => return Vec::new(),
        };
        let mut keys: Vec<String> = dict.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Array element access; out-of-bounds and non-array receivers yield
    /// Null.
    pub fn index(&self, i: usize) -> Result<Value<'r>> {
        let arr = match &self.obj {
            PdfObject::Array(a) => a,
            _ => return Ok(self.null_child()),
        };
        match arr.get(i) {
            Some(obj) => self.resolve_child(obj.clone()),
            None => Ok(self.null_child()),
        }
    }

    /// Array length; 0 for non-arrays.
    pub fn len(&self) -> usize {
        match &self.obj {
            PdfObject::Array(a) => a.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes the stream payload: raw window, decryption, filters.
    pub fn stream_data(&self) -> Result<Vec<u8>> {
        let strm = self.obj.as_stream()?;
        match self.reader {
            Some(r) => r.decode_stream_payload(strm),
            None => Ok(Vec::new()),
        }
    }

    fn resolve_child(&self, obj: PdfObject) -> Result<Value<'r>> {
        match self.reader {
            Some(r) => r.resolve(self.parent, obj),
            None => Ok(Value::null()),
        }
    }

    fn null_child(&self) -> Value<'r> {
        Value {
            reader: self.reader,
            parent: self.parent,
            obj: PdfObject::Null,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.obj)
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.obj)
    }
}
