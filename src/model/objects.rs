//! Raw PDF object types.
//!
//! `PdfObject` is the fundamental value type produced by the object parser.
//! Streams carry their header dictionary plus the absolute byte offset of
//! their payload; the payload itself is only read on demand through the
//! reader's decoding pipeline.

use std::collections::HashMap;
use std::fmt;

use crate::error::{PdfError, Result};

/// Dictionary type: name (without the leading slash) to object.
pub type Dict = HashMap<String, PdfObject>;

/// An indirect object reference, `id gen R`.
///
/// The pair (0, 65535) denotes a freed slot and never resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjRef {
    pub id: u32,
    pub gen: u16,
}

impl ObjRef {
    pub const fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// A stream object: header dictionary, owning object pointer, and the
/// absolute file offset of the first payload byte.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: Dict,
    pub ptr: ObjRef,
    pub offset: u64,
}

/// An indirect object definition, `id gen obj ... endobj`.
///
/// Only produced while parsing; resolution unwraps it so callers never
/// observe this variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjDef {
    pub ptr: ObjRef,
    pub obj: PdfObject,
}

/// A raw PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    /// The null object, also used for absent values.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Real (floating point) value.
    Real(f64),
    /// String: arbitrary bytes.
    String(Vec<u8>),
    /// Name without the leading slash (e.g. `Helvetica` for `/Helvetica`).
    Name(String),
    /// Array of objects.
    Array(Vec<PdfObject>),
    /// Dictionary.
    Dict(Dict),
    /// Stream: header dictionary plus payload location.
    Stream(Box<PdfStream>),
    /// Indirect reference.
    Ref(ObjRef),
    /// Indirect object definition (parsing only).
    Def(Box<ObjDef>),
}

impl PdfObject {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get as boolean; Null yields the zero value.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Null => Ok(false),
            _ => Err(self.wrong_kind("bool")),
        }
    }

    /// Get as integer; Null yields the zero value.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Null => Ok(0),
            _ => Err(self.wrong_kind("integer")),
        }
    }

    /// Get as float, coercing from integer; Null yields the zero value.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Self::Real(n) => Ok(*n),
            Self::Int(n) => Ok(*n as f64),
            Self::Null => Ok(0.0),
            _ => Err(self.wrong_kind("real")),
        }
    }

    /// Get as name; Null yields the empty string.
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            Self::Null => Ok(""),
            _ => Err(self.wrong_kind("name")),
        }
    }

    /// Get as byte string; Null yields the empty slice.
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            Self::Null => Ok(&[]),
            _ => Err(self.wrong_kind("string")),
        }
    }

    pub fn as_array(&self) -> Result<&[PdfObject]> {
        match self {
            Self::Array(a) => Ok(a),
            _ => Err(self.wrong_kind("array")),
        }
    }

    pub fn as_dict(&self) -> Result<&Dict> {
        match self {
            Self::Dict(d) => Ok(d),
            _ => Err(self.wrong_kind("dict")),
        }
    }

    pub fn as_stream(&self) -> Result<&PdfStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(self.wrong_kind("stream")),
        }
    }

    pub fn as_ref_ptr(&self) -> Result<ObjRef> {
        match self {
            Self::Ref(r) => Ok(*r),
            _ => Err(self.wrong_kind("ref")),
        }
    }

    /// Type name for error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::Name(_) => "name",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
            Self::Def(_) => "objdef",
        }
    }

    fn wrong_kind(&self, expected: &'static str) -> PdfError {
        PdfError::WrongKind {
            expected,
            got: self.type_name(),
        }
    }
}

impl fmt::Display for PdfObject {
    /// Textual representation mirroring PDF syntax; dictionary keys print
    /// in sorted order so the output is deterministic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Real(n) => write!(f, "{}", n),
            Self::String(s) => {
                write!(f, "({})", String::from_utf8_lossy(s).escape_debug())
            }
            Self::Name(n) => write!(f, "/{}", n),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Dict(d) => {
                let mut keys: Vec<&String> = d.keys().collect();
                keys.sort();
                write!(f, "<<")?;
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "/{} {}", k, d[*k])?;
                }
                write!(f, ">>")
            }
            Self::Stream(s) => {
                write!(f, "{}@{}", Self::Dict(s.dict.clone()), s.offset)
            }
            Self::Ref(r) => write!(f, "{}", r),
            Self::Def(d) => write!(f, "{{{} {} obj}}{}", d.ptr.id, d.ptr.gen, d.obj),
        }
    }
}
