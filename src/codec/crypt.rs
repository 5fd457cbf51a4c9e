//! Ciphers for encrypted documents: RC4 and AES-128-CBC.
//!
//! RC4 backs revisions 2 and 3 of the standard security handler; the
//! RustCrypto project publishes no maintained RC4 crate, so the
//! keystream is generated here. AES-128-CBC backs the V=4 crypt
//! filters through the `aes` and `cbc` crates, with the PKCS#7 tail
//! stripped as part of decryption.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{PdfError, Result};

const AES_BLOCK: usize = 16;

type CbcDec = cbc::Decryptor<aes::Aes128>;
type CbcEnc = cbc::Encryptor<aes::Aes128>;

/// RC4 keystream, yielding one XOR byte per step.
struct KeyStream {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl KeyStream {
    fn new(key: &[u8]) -> Self {
        assert!(
            !key.is_empty() && key.len() <= 256,
            "RC4 key must be 1-256 bytes"
        );

        let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut j = 0u8;
        for (i, &k) in key.iter().cycle().take(256).enumerate() {
            j = j.wrapping_add(state[i]).wrapping_add(k);
            state.swap(i, j as usize);
        }

        Self { state, i: 0, j: 0 }
    }
}

impl Iterator for KeyStream {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);

        let sum = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        Some(self.state[sum as usize])
    }
}

/// Applies RC4 to `data`; encryption and decryption are the same walk.
pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    KeyStream::new(key).zip(data).map(|(k, &b)| b ^ k).collect()
}

/// AES-128-CBC decryption with PKCS#7 unpadding.
///
/// The ciphertext must be block-aligned; a malformed trailing pad is
/// left in place rather than guessed at. An empty ciphertext decrypts
/// to nothing.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_key_iv(key, iv)?;
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() % AES_BLOCK != 0 {
        return Err(PdfError::MalformedStream(format!(
            "AES ciphertext of {} bytes is not block-aligned",
            data.len()
        )));
    }

    let mut buf = data.to_vec();
    CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| PdfError::MalformedStream("AES block decryption failed".into()))?;
    strip_pkcs7(&mut buf);
    Ok(buf)
}

/// AES-128-CBC encryption of an already block-aligned payload. Only
/// exercised when building encrypted fixtures.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_key_iv(key, iv)?;
    if data.len() % AES_BLOCK != 0 {
        return Err(PdfError::MalformedStream(format!(
            "AES plaintext of {} bytes is not block-aligned",
            data.len()
        )));
    }

    let mut buf = data.to_vec();
    CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, data.len())
        .map_err(|_| PdfError::MalformedStream("AES block encryption failed".into()))?;
    Ok(buf)
}

fn check_key_iv(key: &[u8], iv: &[u8]) -> Result<()> {
    if key.len() != AES_BLOCK || iv.len() != AES_BLOCK {
        return Err(PdfError::MalformedStream(format!(
            "AES-128 wants a 16-byte key and IV, got {} and {}",
            key.len(),
            iv.len()
        )));
    }
    Ok(())
}

/// Truncates a well-formed PKCS#7 tail in place; anything else stays.
fn strip_pkcs7(buf: &mut Vec<u8>) {
    let pad = match buf.last() {
        Some(&b) => b as usize,
        None => return,
    };
    if pad == 0 || pad > AES_BLOCK || pad > buf.len() {
        return;
    }
    if buf[buf.len() - pad..].iter().all(|&b| b as usize == pad) {
        buf.truncate(buf.len() - pad);
    }
}
