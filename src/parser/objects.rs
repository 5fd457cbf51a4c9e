//! Object assembly on top of the lexer.
//!
//! Turns token streams into raw objects, recognizing indirect references
//! (`id gen R`), indirect definitions (`id gen obj ... endobj`), and
//! streams. Stream payloads are never read here; a stream object records
//! the absolute offset where its payload begins.

use crate::error::{PdfError, Result};
use crate::model::objects::{Dict, ObjDef, ObjRef, PdfObject, PdfStream};
use crate::parser::lexer::{Lexer, Token};

/// Decrypts string literals parsed inside an indirect object.
///
/// Implemented by the standard security handler; the parser itself knows
/// nothing about key derivation.
pub trait Decryptor {
    fn decrypt_string(&self, ptr: ObjRef, data: &[u8]) -> Vec<u8>;
}

/// Parser producing raw objects from a lexer.
pub struct ObjectParser<'a> {
    lex: Lexer<'a>,
    crypt: Option<&'a dyn Decryptor>,
    /// The enclosing indirect object, used to scope string decryption.
    obj_ptr: ObjRef,
}

impl<'a> ObjectParser<'a> {
    pub fn new(lex: Lexer<'a>) -> Self {
        Self {
            lex,
            crypt: None,
            obj_ptr: ObjRef::default(),
        }
    }

    pub fn with_crypt(lex: Lexer<'a>, crypt: Option<&'a dyn Decryptor>) -> Self {
        Self {
            lex,
            crypt,
            obj_ptr: ObjRef::default(),
        }
    }

    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lex
    }

    /// Reads one object.
    pub fn read_object(&mut self) -> Result<PdfObject> {
        let tok = self.lex.next_token()?;
        match tok {
            Token::Keyword(kw) => {
                return match kw.as_str() {
                    "null" => Ok(PdfObject::Null),
                    "<<" => self.read_dict(),
                    "[" => self.read_array(),
                    _ => Err(PdfError::MalformedObject(format!(
                        "unexpected keyword {:?} parsing object",
                        kw
                    ))),
                };
            }
            Token::Eof => {
                return Err(PdfError::MalformedObject(
                    "unexpected end of input parsing object".into(),
                ));
            }
            _ => {}
        }

        let tok = match tok {
            Token::String(s) => {
                let data = match self.crypt {
                    Some(crypt) if self.obj_ptr.id != 0 => {
                        crypt.decrypt_string(self.obj_ptr, &s)
                    }
                    _ => s,
                };
                Token::String(data)
            }
            other => other,
        };

        if let Token::Int(t1) = tok {
            if t1 >= 0 && t1 <= u32::MAX as i64 {
                return self.read_after_int(t1 as u32);
            }
        }

        Ok(token_to_object(tok))
    }

    /// Handles the `id gen R` / `id gen obj` lookahead after an integer.
    fn read_after_int(&mut self, t1: u32) -> Result<PdfObject> {
        let tok2 = self.lex.next_token()?;
        if let Token::Int(t2) = tok2 {
            if t2 >= 0 && t2 <= u16::MAX as i64 {
                let tok3 = self.lex.next_token()?;
                if tok3.is_keyword("R") {
                    return Ok(PdfObject::Ref(ObjRef::new(t1, t2 as u16)));
                }
                if tok3.is_keyword("obj") {
                    return self.read_definition(ObjRef::new(t1, t2 as u16));
                }
                self.lex.unread_token(tok3);
            }
        }
        self.lex.unread_token(tok2);
        Ok(PdfObject::Int(t1 as i64))
    }

    fn read_definition(&mut self, ptr: ObjRef) -> Result<PdfObject> {
        let old = self.obj_ptr;
        self.obj_ptr = ptr;
        let obj = self.read_object()?;
        // A stream body terminates via its Length; everything else must
        // close with endobj.
        if !matches!(obj, PdfObject::Stream(_)) {
            let tok = self.lex.next_token()?;
            if !tok.is_keyword("endobj") {
                return Err(PdfError::MalformedObject(format!(
                    "missing endobj after {} {} obj",
                    ptr.id, ptr.gen
                )));
            }
        }
        self.obj_ptr = old;
        Ok(PdfObject::Def(Box::new(ObjDef { ptr, obj })))
    }

    fn read_array(&mut self) -> Result<PdfObject> {
        let mut items = Vec::new();
        loop {
            let tok = self.lex.next_token()?;
            if tok.is_keyword("]") || tok == Token::Eof {
                break;
            }
            self.lex.unread_token(tok);
            items.push(self.read_object()?);
        }
        Ok(PdfObject::Array(items))
    }

    fn read_dict(&mut self) -> Result<PdfObject> {
        let mut dict = Dict::new();
        loop {
            let tok = self.lex.next_token()?;
            if tok.is_keyword(">>") || tok == Token::Eof {
                break;
            }
            let key = match tok {
                Token::Name(n) => n,
                other => {
                    return Err(PdfError::MalformedObject(format!(
                        "non-name dictionary key: {:?}",
                        other
                    )));
                }
            };
            dict.insert(key, self.read_object()?);
        }

        let tok = self.lex.next_token()?;
        if !tok.is_keyword("stream") {
            self.lex.unread_token(tok);
            return Ok(PdfObject::Dict(dict));
        }

        // The stream keyword is followed by exactly one line terminator;
        // the payload starts at the byte after it.
        self.consume_stream_newline()?;
        Ok(PdfObject::Stream(Box::new(PdfStream {
            dict,
            ptr: self.obj_ptr,
            offset: self.lex.read_offset(),
        })))
    }

    fn consume_stream_newline(&mut self) -> Result<()> {
        match self.read_raw_byte()? {
            b'\r' => {
                if self.read_raw_byte()? != b'\n' {
                    self.unread_raw_byte();
                }
                Ok(())
            }
            b'\n' => Ok(()),
            _ => Err(PdfError::MalformedObject(
                "stream keyword not followed by newline".into(),
            )),
        }
    }

    fn read_raw_byte(&mut self) -> Result<u8> {
        self.lex.read_byte_raw()
    }

    fn unread_raw_byte(&mut self) {
        self.lex.unread_byte_raw();
    }
}

fn token_to_object(tok: Token) -> PdfObject {
    match tok {
        Token::Bool(b) => PdfObject::Bool(b),
        Token::Int(n) => PdfObject::Int(n),
        Token::Real(n) => PdfObject::Real(n),
        Token::String(s) => PdfObject::String(s),
        Token::Name(n) => PdfObject::Name(n),
        // Keywords and Eof are handled before this point.
        Token::Keyword(_) | Token::Eof => PdfObject::Null,
    }
}
