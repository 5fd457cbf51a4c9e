//! Stack-machine interpreters for content streams and CMaps.

pub mod content;
pub mod postscript;
