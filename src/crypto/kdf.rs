//! Password-based key derivation.
//!
//! Two schemes are supported:
//!
//! - **Iterated SHA-256**: the digest of `password || salt` is re-hashed
//!   until `rounds` hashes have been applied.  This is the scheme used by
//!   vaults written before Argon2id support, and envelopes without a `kdf`
//!   descriptor are always read with it.
//! - **Argon2id**: a memory-hard KDF, used for newly created vaults unless
//!   the settings select the legacy scheme.
//!
//! Both produce a 32-byte key suitable for AES-256-GCM.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::errors::{OpenTermError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default number of SHA-256 rounds for the iterated scheme.
pub const DEFAULT_SHA256_ROUNDS: u32 = 50_000;

/// Minimum safe Argon2 memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// The `kdf` descriptor stored in a vault envelope.
///
/// The iteration count lives in the envelope's `iterations` field for both
/// schemes, so the descriptor only carries what the legacy shape lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KdfScheme {
    #[default]
    Sha256Iterated,
    #[serde(rename_all = "camelCase")]
    Argon2id { memory_kib: u32, parallelism: u32 },
}

/// A fully specified derivation: scheme plus cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub scheme: KdfScheme,
    pub iterations: u32,
}

impl KdfParams {
    /// Iterated SHA-256 with the given number of rounds.
    pub fn sha256(rounds: u32) -> Self {
        Self {
            scheme: KdfScheme::Sha256Iterated,
            iterations: rounds,
        }
    }

    /// Argon2id with explicit parameters.
    pub fn argon2id(params: Argon2Params) -> Self {
        Self {
            scheme: KdfScheme::Argon2id {
                memory_kib: params.memory_kib,
                parallelism: params.parallelism,
            },
            iterations: params.iterations,
        }
    }

    /// Derive a key from `password` and `salt` with these parameters.
    pub fn derive(&self, password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
        match self.scheme {
            KdfScheme::Sha256Iterated => {
                if self.iterations < 1 {
                    return Err(OpenTermError::KeyDerivationFailed(
                        "SHA-256 rounds must be at least 1".into(),
                    ));
                }
                Ok(derive_key(password, salt, self.iterations))
            }
            KdfScheme::Argon2id {
                memory_kib,
                parallelism,
            } => derive_argon2id_key(
                password,
                salt,
                &Argon2Params {
                    memory_kib,
                    iterations: self.iterations,
                    parallelism,
                },
            ),
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::argon2id(Argon2Params::default())
    }
}

/// Derive a 32-byte key by iterated SHA-256.
///
/// The first round hashes `password || salt`; every following round hashes
/// the previous digest.  `rounds == 0` is treated as a single round.
pub fn derive_key(password: &[u8], salt: &[u8], rounds: u32) -> [u8; KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    let mut digest: [u8; KEY_LEN] = hasher.finalize().into();

    for _ in 1..rounds {
        let next: [u8; KEY_LEN] = Sha256::digest(digest).into();
        digest.zeroize();
        digest = next;
    }

    digest
}

/// Derive a 32-byte key with explicit Argon2id parameters.
///
/// Enforces minimum Argon2 parameters to prevent dangerously weak settings.
pub fn derive_argon2id_key(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    if argon2_params.memory_kib < MIN_MEMORY_KIB {
        return Err(OpenTermError::KeyDerivationFailed(format!(
            "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
            argon2_params.memory_kib
        )));
    }
    if argon2_params.iterations < 1 {
        return Err(OpenTermError::KeyDerivationFailed(
            "Argon2 iterations must be at least 1".into(),
        ));
    }
    if argon2_params.parallelism < 1 {
        return Err(OpenTermError::KeyDerivationFailed(
            "Argon2 parallelism must be at least 1".into(),
        ));
    }

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| OpenTermError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| OpenTermError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
