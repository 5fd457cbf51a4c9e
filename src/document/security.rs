//! Standard security handler for encrypted documents.
//!
//! Supports the Standard handler, revisions 2-4, V in {1, 2, 4}: RC4 file
//! encryption plus AES-128-CBC stream encryption for V=4 crypt filters.
//! See PDF 32000-1:2008, section 7.6.

use crate::codec::crypt::{aes_cbc_decrypt, rc4};
use crate::error::{PdfError, Result};
use crate::model::objects::{Dict, ObjRef, PdfObject};
use crate::parser::objects::Decryptor;

/// Password padding constant from the PDF spec.
pub const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// A validated file key plus the negotiated cipher for streams.
#[derive(Debug)]
pub struct StandardSecurityHandler {
    key: Vec<u8>,
    use_aes: bool,
}

impl StandardSecurityHandler {
    /// Derives and validates the file key from the encryption dictionary,
    /// the first document identifier, and a candidate password.
    ///
    /// Fails with `UnsupportedEncryption` for anything outside the
    /// supported matrix and `InvalidPassword` when the user check does
    /// not match.
    pub fn new(encrypt: &Dict, doc_id: &[u8], password: &[u8]) -> Result<Self> {
        match encrypt.get("Filter") {
            Some(PdfObject::Name(f)) if f == "Standard" => {}
            other => {
                return Err(PdfError::UnsupportedEncryption(format!(
                    "encryption filter {:?}",
                    other
                )));
            }
        }

        let mut n = match encrypt.get("Length") {
            Some(v) => v.as_int().unwrap_or(0),
            None => 40,
        };
        if n == 0 {
            n = 40;
        }
        if n % 8 != 0 || !(40..=128).contains(&n) {
            return Err(PdfError::UnsupportedEncryption(format!(
                "{}-bit encryption key",
                n
            )));
        }

        let v = encrypt
            .get("V")
            .and_then(|v| v.as_int().ok())
            .unwrap_or(0);
        if v != 1 && v != 2 && (v != 4 || !okay_v4(encrypt)) {
            return Err(PdfError::UnsupportedEncryption(format!(
                "encryption version V={}",
                v
            )));
        }

        let r = encrypt
            .get("R")
            .and_then(|v| v.as_int().ok())
            .unwrap_or(0);
        if !(2..=4).contains(&r) {
            return Err(PdfError::UnsupportedEncryption(format!(
                "encryption revision R={}",
                r
            )));
        }

        let o = match encrypt.get("O") {
            Some(PdfObject::String(s)) if s.len() == 32 => s.clone(),
            _ => {
                return Err(PdfError::UnsupportedEncryption(
                    "missing or malformed O parameter".into(),
                ));
            }
        };
        let u = match encrypt.get("U") {
            Some(PdfObject::String(s)) if s.len() == 32 => s.clone(),
            _ => {
                return Err(PdfError::UnsupportedEncryption(
                    "missing or malformed U parameter".into(),
                ));
            }
        };
        let p = encrypt
            .get("P")
            .and_then(|v| v.as_int().ok())
            .unwrap_or(0) as u32;

        let key = derive_file_key(password, &o, p, doc_id, r, n);
        let check = user_check(&key, doc_id, r);

        let matches = if r == 2 {
            u == check
        } else {
            u.starts_with(&check)
        };
        if !matches {
            return Err(PdfError::InvalidPassword);
        }

        Ok(Self {
            key,
            use_aes: v == 4,
        })
    }

    /// Per-object key: MD5 over file key, 3 LE bytes of the id, 2 LE
    /// bytes of the generation, plus the AES salt; truncated to
    /// min(file_key_len + 5, 16).
    fn object_key(&self, ptr: ObjRef) -> Vec<u8> {
        let mut ctx = md5::Context::new();
        ctx.consume(&self.key);
        ctx.consume([
            ptr.id as u8,
            (ptr.id >> 8) as u8,
            (ptr.id >> 16) as u8,
            ptr.gen as u8,
            (ptr.gen >> 8) as u8,
        ]);
        if self.use_aes {
            ctx.consume(b"sAlT");
        }
        let digest = ctx.compute();
        let len = (self.key.len() + 5).min(16);
        digest.0[..len].to_vec()
    }

    /// Decrypts a stream payload scoped to its owning object.
    ///
    /// AES payloads with an invalid shape are kept as stored; some
    /// files carry clear-text streams next to encrypted ones.
    pub fn decrypt_stream(&self, ptr: ObjRef, data: &[u8]) -> Vec<u8> {
        let key = self.object_key(ptr);
        if self.use_aes {
            if data.len() < 16 {
                return data.to_vec();
            }
            match aes_cbc_decrypt(&key, &data[..16], &data[16..]) {
                Ok(plain) => plain,
                Err(_) => data.to_vec(),
            }
        } else {
            rc4(&key, data)
        }
    }
}

impl Decryptor for StandardSecurityHandler {
    fn decrypt_string(&self, ptr: ObjRef, data: &[u8]) -> Vec<u8> {
        if self.use_aes {
            // AES string decryption is out of scope; leave the bytes as
            // stored rather than producing garbage.
            log::debug!("skipping AES string decryption for {}", ptr);
            return data.to_vec();
        }
        rc4(&self.object_key(ptr), data)
    }
}

/// Validates the V=4 crypt-filter configuration: a CF dictionary whose
/// single negotiated filter is AESV2 with a 16-byte key, applied to both
/// streams and strings at document open.
fn okay_v4(encrypt: &Dict) -> bool {
    let cf = match encrypt.get("CF") {
        Some(PdfObject::Dict(d)) => d,
        _ => return false,
    };
    let stmf = match encrypt.get("StmF") {
        Some(PdfObject::Name(n)) => n,
        _ => return false,
    };
    let strf = match encrypt.get("StrF") {
        Some(PdfObject::Name(n)) => n,
        _ => return false,
    };
    if stmf != strf {
        return false;
    }
    let param = match cf.get(stmf) {
        Some(PdfObject::Dict(d)) => d,
        _ => return false,
    };
    match param.get("AuthEvent") {
        None => {}
        Some(PdfObject::Name(e)) if e == "DocOpen" => {}
        Some(_) => return false,
    }
    match param.get("Length") {
        None => {}
        Some(PdfObject::Int(16)) => {}
        Some(_) => return false,
    }
    matches!(param.get("CFM"), Some(PdfObject::Name(m)) if m == "AESV2")
}

/// Algorithm 2: file key from padded password, O, P, and the document id.
fn derive_file_key(
    password: &[u8],
    o: &[u8],
    p: u32,
    doc_id: &[u8],
    r: i64,
    length_bits: i64,
) -> Vec<u8> {
    let mut ctx = md5::Context::new();
    if password.len() >= 32 {
        ctx.consume(&password[..32]);
    } else {
        ctx.consume(password);
        ctx.consume(&PASSWORD_PAD[..32 - password.len()]);
    }
    ctx.consume(o);
    ctx.consume(p.to_le_bytes());
    ctx.consume(doc_id);
    let mut key = ctx.compute().0.to_vec();

    let n = if r >= 3 {
        (length_bits / 8) as usize
    } else {
        5
    };
    if r >= 3 {
        for _ in 0..50 {
            key = md5::compute(&key[..n]).0.to_vec();
        }
    }
    key.truncate(n);
    key
}

/// Algorithms 4/5: the user-password check value.
///
/// R=2 produces all 32 bytes; R>=3 produces the 16 significant bytes
/// (the stored U is compared by prefix).
fn user_check(key: &[u8], doc_id: &[u8], r: i64) -> Vec<u8> {
    if r == 2 {
        return rc4(key, &PASSWORD_PAD);
    }

    let mut ctx = md5::Context::new();
    ctx.consume(PASSWORD_PAD);
    ctx.consume(doc_id);
    let mut u = rc4(key, &ctx.compute().0);

    for i in 1..=19u8 {
        let xored: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        u = rc4(&xored, &u);
    }
    u
}
