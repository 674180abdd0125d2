//! Cryptographic primitives for OpenTerm.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption with detached tags (`encryption`)
//! - Iterated SHA-256 and Argon2id key derivation (`kdf`)
//! - A zeroizing holder for the derived key (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use encryption::{open, seal, Sealed};
pub use kdf::{
    derive_argon2id_key, derive_key, generate_salt, Argon2Params, KdfParams, KdfScheme,
};
pub use keys::VaultKey;
