//! sucre - read-only PDF parsing and text extraction.
//!
//! A PDF is a graph of values: null, booleans, numbers, strings, names,
//! arrays, dictionaries, and streams, tied together by indirect
//! references. [`Reader`] opens that graph over any random-access byte
//! source, resolving references through the document's cross-reference
//! data on demand; [`Value`] navigates it without per-step error
//! handling (operations on null return null or zero values). On top of
//! the raw graph, [`Page`] and [`Font`] interpret the page tree, content
//! streams, and font dictionaries to produce positioned text runs and
//! vector paths.
//!
//! Encrypted documents (standard security handler, revisions 2-4, RC4
//! and AES-128) are decrypted transparently after the password
//! handshake at open.

pub mod codec;
pub mod document;
pub mod error;
pub mod font;
pub mod interp;
pub mod model;
pub mod parser;
pub mod source;
pub mod utils;

pub use document::page::{Outline, Page};
pub use document::reader::Reader;
pub use document::value::{Kind, Value};
pub use error::{PdfError, Result};
pub use font::font::Font;
pub use model::objects::{Dict, ObjRef, PdfObject};
pub use model::state::{Content, PathKind, PathRecord, PositionedChar, TextRun};
pub use source::ReadAt;
