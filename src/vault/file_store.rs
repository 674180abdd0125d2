//! Atomic persistence of the vault envelope.
//!
//! The envelope is written as pretty JSON to `<data_dir>/vault.json`.
//! Writes go to a hidden temp file in the same directory which is fsynced
//! and then renamed over the target, so a crash leaves either the old
//! envelope or the new one on disk, never a mix of both.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::envelope::VaultEnvelope;
use crate::errors::{OpenTermError, Result};

/// File name of the vault inside the data directory.
pub const VAULT_FILE_NAME: &str = "vault.json";

/// Reads and writes the single vault envelope of an installation.
#[derive(Debug, Clone)]
pub struct VaultFileStore {
    path: PathBuf,
}

impl VaultFileStore {
    /// Store at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/vault.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(VAULT_FILE_NAME))
    }

    /// Returns the path to the vault file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if an envelope exists on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the envelope.  `Ok(None)` means no vault has been configured.
    pub fn read(&self) -> Result<Option<VaultEnvelope>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: VaultEnvelope = serde_json::from_slice(&data)
            .map_err(|e| OpenTermError::DecodeFailure(format!("vault file: {e}")))?;
        envelope.validate()?;

        Ok(Some(envelope))
    }

    /// Replace the envelope on disk atomically.
    pub fn write(&self, envelope: &VaultEnvelope) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(envelope)
            .map_err(|e| OpenTermError::SerializationError(format!("vault envelope: {e}")))?;
        write_atomic(&self.path, &bytes)?;
        debug!(path = %self.path.display(), "vault envelope written");
        Ok(())
    }
}

/// Write `bytes` to `path` via temp file + fsync + rename.
///
/// The temp file lives next to the target so the rename stays on one
/// filesystem.  On Unix the result is readable by the owner only.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result.map_err(OpenTermError::from)
}
