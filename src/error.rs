//! Error types for the sucre PDF library.

use thiserror::Error;

/// Primary error type for PDF parsing operations.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("malformed cross-reference data: {0}")]
    MalformedXref(String),

    #[error("lexical error at offset {offset}: {msg}")]
    Lexical { offset: u64, msg: String },

    #[error("malformed object: {0}")]
    MalformedObject(String),

    #[error("malformed stream: {0}")]
    MalformedStream(String),

    #[error("object {0} out of cross-reference bounds")]
    ObjectOutOfBounds(u32),

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("wrong kind: expected {expected}, got {got}")]
    WrongKind {
        expected: &'static str,
        got: &'static str,
    },

    #[error("unknown content operator: {0}")]
    UnknownOperator(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
