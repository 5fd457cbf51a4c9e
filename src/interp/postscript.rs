//! A small PostScript-style stack machine.
//!
//! Scalars push onto the operand stack, `[ ]` and `<< >>` assemble
//! arrays and dictionaries, and every other keyword is handed to an
//! operator handler. The ToUnicode CMap builder and the content-stream
//! interpreter implement the handler independently; nothing is shared
//! between them.

use crate::error::Result;
use crate::model::objects::{Dict, PdfObject};
use crate::parser::lexer::{Lexer, Token};

/// Operand stack. Popping an empty stack yields Null, matching the
/// zero-value discipline of the value facade.
#[derive(Debug, Default)]
pub struct Stack {
    items: Vec<PdfObject>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, obj: PdfObject) {
        self.items.push(obj);
    }

    pub fn pop(&mut self) -> PdfObject {
        self.items.pop().unwrap_or(PdfObject::Null)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes and returns all operands, oldest first.
    pub fn take_all(&mut self) -> Vec<PdfObject> {
        std::mem::take(&mut self.items)
    }
}

/// Receives each non-structural keyword with the current operand stack.
pub trait OpHandler {
    fn on_op(&mut self, stack: &mut Stack, op: &str) -> Result<()>;
}

enum Frame {
    Array(Vec<PdfObject>),
    Dict(Vec<PdfObject>),
}

/// Runs the machine over `data`, forwarding operators to `handler`.
pub fn interpret(data: &[u8], handler: &mut dyn OpHandler) -> Result<()> {
    let mut lex = Lexer::new(&data, 0, data.len() as u64);
    lex.allow_eof = true;

    let mut stack = Stack::new();
    let mut frames: Vec<Frame> = Vec::new();

    loop {
        let tok = lex.next_token()?;
        match tok {
            Token::Eof => break,
            Token::Bool(b) => stack.push(PdfObject::Bool(b)),
            Token::Int(n) => stack.push(PdfObject::Int(n)),
            Token::Real(n) => stack.push(PdfObject::Real(n)),
            Token::String(s) => stack.push(PdfObject::String(s)),
            Token::Name(n) => stack.push(PdfObject::Name(n)),
            Token::Keyword(kw) => match kw.as_str() {
                "[" | "{" => {
                    frames.push(Frame::Array(std::mem::take(&mut stack.items)));
                }
                "]" | "}" => match frames.pop() {
                    Some(Frame::Array(saved)) => {
                        let items = std::mem::replace(&mut stack.items, saved);
                        stack.push(PdfObject::Array(items));
                    }
                    Some(other) => {
                        frames.push(other);
                        log::warn!("mismatched array close");
                    }
                    None => log::warn!("unbalanced array close"),
                },
                "<<" => {
                    frames.push(Frame::Dict(std::mem::take(&mut stack.items)));
                }
                ">>" => match frames.pop() {
                    Some(Frame::Dict(saved)) => {
                        let items = std::mem::replace(&mut stack.items, saved);
                        stack.push(PdfObject::Dict(pairs_to_dict(items)));
                    }
                    Some(other) => {
                        frames.push(other);
                        log::warn!("mismatched dict close");
                    }
                    None => log::warn!("unbalanced dict close"),
                },
                "null" => stack.push(PdfObject::Null),
                op => {
                    if frames.is_empty() {
                        handler.on_op(&mut stack, op)?;
                    } else {
                        log::debug!("ignoring operator {:?} inside composite", op);
                    }
                }
            },
        }
    }
    Ok(())
}

fn pairs_to_dict(items: Vec<PdfObject>) -> Dict {
    let mut dict = Dict::new();
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        if let PdfObject::Name(name) = key {
            if let Some(value) = iter.next() {
                dict.insert(name, value);
            }
        }
    }
    dict
}
