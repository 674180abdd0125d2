//! AES-256-GCM authenticated encryption.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce.  Unlike a
//! single prepended blob, the nonce, ciphertext and 16-byte auth tag are
//! returned as separate parts because the vault envelope stores them in
//! separate fields.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{OpenTermError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// The three parts produced by one encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Encrypt `plaintext` with a 32-byte `key`.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| OpenTermError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| OpenTermError::EncryptionFailed(format!("encryption error: {e}")))?;

    // aes-gcm appends the tag to the ciphertext.
    let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);

    Ok(Sealed {
        nonce: nonce.to_vec(),
        ciphertext,
        tag,
    })
}

/// Decrypt and authenticate the parts produced by `seal`.
///
/// A wrong key and a tampered ciphertext or tag are indistinguishable and
/// both surface as `InvalidMasterPassword`.  A nonce or tag of the wrong
/// length means the envelope itself is malformed.
pub fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(OpenTermError::DecodeFailure(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    if tag.len() != TAG_LEN {
        return Err(OpenTermError::DecodeFailure(format!(
            "auth tag must be {TAG_LEN} bytes, got {}",
            tag.len()
        )));
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| OpenTermError::InvalidMasterPassword)?;

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(nonce), combined.as_slice())
        .map_err(|_| OpenTermError::InvalidMasterPassword)
}
