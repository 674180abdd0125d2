use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in OpenTerm.
#[derive(Debug, Error)]
pub enum OpenTermError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Invalid master password — wrong password or corrupted vault")]
    InvalidMasterPassword,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Vault is not configured — run `openterm init` first")]
    NotConfigured,

    #[error("Vault already configured at {0}")]
    AlreadyConfigured(PathBuf),

    #[error("Vault is locked — unlock it with the master password first")]
    VaultLocked,

    #[error("Malformed vault data: {0}")]
    DecodeFailure(String),

    #[error("Connection id '{0}' is not a valid UUID")]
    InvalidConnectionId(String),

    #[error("No saved password for connection '{0}'")]
    PasswordNotFound(String),

    // --- Password input errors ---
    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,

    #[error("Password cannot be empty")]
    EmptyPassword,

    // --- Macro errors ---
    #[error("Macro '{0}' not found")]
    MacroNotFound(String),

    #[error("A macro named '{0}' already exists")]
    MacroAlreadyExists(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for OpenTerm results.
pub type Result<T> = std::result::Result<T, OpenTermError>;
