//! The persisted vault envelope and the codec that produces it.
//!
//! A `vault.json` file looks like:
//!
//! ```text
//! {
//!   "salt": "<base64, 32 bytes>",
//!   "iterations": 50000,
//!   "connectionIds": ["<uuid>", ...],
//!   "nonce": "<base64, 12 bytes>",
//!   "ciphertext": "<base64>",
//!   "tag": "<base64, 16 bytes>",
//!   "kdf": { "algorithm": "argon2id", "memoryKib": 65536, "parallelism": 4 }
//! }
//! ```
//!
//! - **connectionIds** is a public index of the encrypted map's keys so the
//!   number of saved passwords can be shown without the master password.
//! - **kdf** is optional; envelopes without it use iterated SHA-256.
//! - **tag** is also accepted as `authTag` when reading.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::payload::VaultPayload;
use crate::crypto::encryption::{self, NONCE_LEN, TAG_LEN};
use crate::crypto::kdf::{KdfParams, KdfScheme, SALT_LEN};
use crate::crypto::VaultKey;
use crate::errors::{OpenTermError, Result};

/// The on-disk vault structure.  Replaced wholesale on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEnvelope {
    /// Salt used for key derivation (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// SHA-256 rounds, or the Argon2id time cost.
    pub iterations: u32,

    /// Public index of the connection ids inside the ciphertext.
    #[serde(default)]
    pub connection_ids: Option<Vec<String>>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub nonce: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    #[serde(
        alias = "authTag",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub tag: Vec<u8>,

    /// Key derivation scheme; absent in legacy envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf: Option<KdfScheme>,
}

impl VaultEnvelope {
    /// The derivation parameters needed to re-derive this envelope's key.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            scheme: self.kdf.unwrap_or_default(),
            iterations: self.iterations,
        }
    }

    /// Connection ids from the public index (empty when the index is null).
    pub fn connection_ids(&self) -> &[String] {
        self.connection_ids.as_deref().unwrap_or_default()
    }

    /// Check field lengths that the cipher and KDF depend on.
    pub fn validate(&self) -> Result<()> {
        if self.salt.len() != SALT_LEN {
            return Err(OpenTermError::DecodeFailure(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                self.salt.len()
            )));
        }
        if self.nonce.len() != NONCE_LEN {
            return Err(OpenTermError::DecodeFailure(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                self.nonce.len()
            )));
        }
        if self.tag.len() != TAG_LEN {
            return Err(OpenTermError::DecodeFailure(format!(
                "auth tag must be {TAG_LEN} bytes, got {}",
                self.tag.len()
            )));
        }
        Ok(())
    }
}

/// Encrypt `payload` under `key` into a fresh envelope.
///
/// A new nonce is drawn for every call and `connectionIds` is recomputed
/// from the payload's keys.
pub fn encrypt(
    payload: &VaultPayload,
    key: &VaultKey,
    salt: &[u8],
    kdf: &KdfParams,
) -> Result<VaultEnvelope> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(payload)
            .map_err(|e| OpenTermError::SerializationError(format!("payload: {e}")))?,
    );

    let sealed = encryption::seal(key.as_bytes(), &plaintext)?;

    let kdf_descriptor = match kdf.scheme {
        KdfScheme::Sha256Iterated => None,
        scheme @ KdfScheme::Argon2id { .. } => Some(scheme),
    };

    Ok(VaultEnvelope {
        salt: salt.to_vec(),
        iterations: kdf.iterations,
        connection_ids: Some(payload.sorted_ids()),
        nonce: sealed.nonce,
        ciphertext: sealed.ciphertext,
        tag: sealed.tag,
        kdf: kdf_descriptor,
    })
}

/// Decrypt an envelope back into its payload.
///
/// Fails with `InvalidMasterPassword` when authentication fails and with
/// `DecodeFailure` when the plaintext is not a valid payload.
pub fn decrypt(envelope: &VaultEnvelope, key: &VaultKey) -> Result<VaultPayload> {
    let plaintext = Zeroizing::new(encryption::open(
        key.as_bytes(),
        &envelope.nonce,
        &envelope.ciphertext,
        &envelope.tag,
    )?);

    serde_json::from_slice(&plaintext)
        .map_err(|e| OpenTermError::DecodeFailure(format!("vault payload: {e}")))
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
