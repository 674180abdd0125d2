//! Vault module — encrypted per-connection password storage.
//!
//! This module provides:
//! - The plaintext `VaultPayload` / `PasswordExport` map (`payload`)
//! - The persisted `VaultEnvelope` and its AES-256-GCM codec (`envelope`)
//! - Atomic reads and writes of `vault.json` (`file_store`)
//! - The `CredentialVault` lifecycle state machine (`store`)

pub mod envelope;
pub mod file_store;
pub mod payload;
pub mod store;

// Re-export the most commonly used items.
pub use envelope::VaultEnvelope;
pub use file_store::VaultFileStore;
pub use payload::{PasswordExport, VaultPayload};
pub use store::{CredentialVault, VaultLifecycle, VaultStatus};
