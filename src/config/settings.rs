use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{Argon2Params, KdfParams, DEFAULT_SHA256_ROUNDS};
use crate::errors::{OpenTermError, Result};
use crate::macros::PlaybackConfig;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "OPENTERM_DATA_DIR";

/// Which key derivation new vaults (and re-keyed vaults) use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KdfChoice {
    Argon2id,
    Sha256Iterated,
}

/// Application configuration, loaded from `<data_dir>/openterm.toml`.
///
/// Every field has a sensible default so OpenTerm works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Key derivation for new vaults (default: argon2id).
    #[serde(default = "default_kdf")]
    pub kdf: KdfChoice,

    /// Rounds for the iterated SHA-256 scheme (default: 50 000).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Delay after every macro step, in milliseconds (default: 50).
    #[serde(default = "default_inter_step_delay_ms")]
    pub inter_step_delay_ms: u64,

    /// Poll interval for `WAITFOR=` steps, in milliseconds (default: 500).
    #[serde(default = "default_wait_for_poll_ms")]
    pub wait_for_poll_ms: u64,

    /// Delay before a run-on-connect macro starts, in milliseconds (default: 1000).
    #[serde(default = "default_connect_delay_ms")]
    pub connect_delay_ms: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_kdf() -> KdfChoice {
    KdfChoice::Argon2id
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_SHA256_ROUNDS
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_inter_step_delay_ms() -> u64 {
    50
}

fn default_wait_for_poll_ms() -> u64 {
    500
}

fn default_connect_delay_ms() -> u64 {
    1_000
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            kdf: default_kdf(),
            kdf_iterations: default_kdf_iterations(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            inter_step_delay_ms: default_inter_step_delay_ms(),
            wait_for_poll_ms: default_wait_for_poll_ms(),
            connect_delay_ms: default_connect_delay_ms(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the data directory.
    const FILE_NAME: &'static str = "openterm.toml";

    /// Load settings from `<data_dir>/openterm.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            OpenTermError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Resolve the per-user data directory.
    ///
    /// Order: explicit path, `OPENTERM_DATA_DIR`, then the platform data
    /// directory (`~/Library/Application Support/OpenTerm` on macOS,
    /// `~/.local/share/OpenTerm` on Linux).
    pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        dirs::data_dir()
            .map(|d| d.join("OpenTerm"))
            .ok_or_else(|| {
                OpenTermError::ConfigError(
                    "cannot determine the user data directory — pass --data-dir".into(),
                )
            })
    }

    /// Convert the KDF settings into crypto-layer params.
    pub fn kdf_params(&self) -> KdfParams {
        match self.kdf {
            KdfChoice::Argon2id => KdfParams::argon2id(Argon2Params {
                memory_kib: self.argon2_memory_kib,
                iterations: self.argon2_iterations,
                parallelism: self.argon2_parallelism,
            }),
            KdfChoice::Sha256Iterated => KdfParams::sha256(self.kdf_iterations),
        }
    }

    /// Convert the timing settings into playback config.
    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            inter_step_delay: Duration::from_millis(self.inter_step_delay_ms),
            wait_poll_interval: Duration::from_millis(self.wait_for_poll_ms.max(1)),
            connect_delay: Duration::from_millis(self.connect_delay_ms),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
