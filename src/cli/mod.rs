//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{OpenTermError, Result};
use crate::vault::{CredentialVault, VaultFileStore};

/// Environment variable holding the master password (scripted use).
pub const PASSWORD_ENV: &str = "OPENTERM_PASSWORD";

/// Environment variable holding the new master password for `change-password`.
pub const NEW_PASSWORD_ENV: &str = "OPENTERM_NEW_PASSWORD";

/// OpenTerm CLI: saved connection passwords and terminal macros.
#[derive(Parser)]
#[command(
    name = "openterm",
    about = "Encrypted connection password vault and terminal macro player",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding vault.json and macros.json
    #[arg(long, global = true, env = "OPENTERM_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create the vault with a new master password
    Init,

    /// Show whether the vault is configured and how many passwords it holds
    Status,

    /// Check the master password
    Unlock,

    /// Save the password for a connection (add or update)
    Set {
        /// Connection id (UUID)
        id: String,
        /// Password (omit for interactive prompt)
        value: Option<String>,
    },

    /// Print the saved password for a connection
    Get {
        /// Connection id (UUID)
        id: String,
    },

    /// List connections with a saved password (no master password needed)
    List,

    /// Remove the saved password for a connection
    Remove {
        /// Connection id (UUID)
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Remove every saved password
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change the vault's master password
    ChangePassword,

    /// Export saved passwords as JSON
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import passwords from a JSON export
    Import {
        /// Path to the export file
        file: String,
    },

    /// Manage and play terminal macros
    Macro {
        #[command(subcommand)]
        action: MacroAction,
    },
}

/// Macro subcommands.
#[derive(clap::Subcommand)]
pub enum MacroAction {
    /// List saved macros
    List,

    /// Save a new macro (content from a file or stdin)
    Add {
        /// Macro name
        name: String,
        /// File with the macro text (reads stdin if omitted)
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Replace the text of a saved macro (content from a file or stdin)
    Update {
        /// Macro name or id
        name: String,
        /// File with the new macro text (reads stdin if omitted)
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Delete a saved macro
    Remove {
        /// Macro name or id
        name: String,
    },

    /// Show the parsed steps of a macro
    Show {
        /// Macro name or id
        name: String,
    },

    /// Play a macro into this terminal
    Play {
        /// Macro name or id
        name: String,
        /// Apply the run-on-connect delay before the first step
        #[arg(long)]
        on_connect: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolved data directory plus the settings loaded from it.
pub struct Context {
    pub data_dir: PathBuf,
    pub settings: Settings,
}

impl Context {
    /// Resolve the data directory and load `openterm.toml` from it.
    pub fn load(cli: &Cli) -> Result<Self> {
        let data_dir = Settings::resolve_data_dir(cli.data_dir.as_deref())?;
        let settings = Settings::load(&data_dir)?;
        Ok(Self { data_dir, settings })
    }

    /// Open the vault in its on-disk state (locked or unconfigured).
    pub fn open_vault(&self) -> Result<CredentialVault> {
        CredentialVault::open(
            VaultFileStore::in_dir(&self.data_dir),
            self.settings.kdf_params(),
        )
    }

    /// Open the vault and unlock it with the master password.
    pub fn unlock_vault(&self) -> Result<CredentialVault> {
        let mut vault = self.open_vault()?;
        if !vault.is_configured() {
            return Err(OpenTermError::NotConfigured);
        }
        let password = prompt_password()?;
        vault.unlock(&password)?;
        Ok(vault)
    }

    /// Path to `macros.json`.
    pub fn macros_path(&self) -> PathBuf {
        self.data_dir.join(crate::macros::library::MACROS_FILE_NAME)
    }
}

/// Get the master password, trying in order:
/// 1. `OPENTERM_PASSWORD` env var
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env(PASSWORD_ENV) {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter master password")
        .interact()
        .map_err(|e| OpenTermError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password and its confirmation.
///
/// Both values are returned unchecked: the vault validates them, so a
/// mismatch surfaces as `PasswordMismatch`.  When `env_var` is set its
/// value is used for both.
pub fn prompt_new_password(env_var: &str) -> Result<(Zeroizing<String>, Zeroizing<String>)> {
    if let Some(pw) = password_from_env(env_var) {
        return Ok((pw.clone(), pw));
    }

    let password = dialoguer::Password::new()
        .with_prompt("Choose master password")
        .interact()
        .map_err(|e| OpenTermError::CommandFailed(format!("password prompt: {e}")))?;
    let confirm = dialoguer::Password::new()
        .with_prompt("Confirm master password")
        .interact()
        .map_err(|e| OpenTermError::CommandFailed(format!("password prompt: {e}")))?;

    Ok((Zeroizing::new(password), Zeroizing::new(confirm)))
}

fn password_from_env(var: &str) -> Option<Zeroizing<String>> {
    match std::env::var(var) {
        Ok(pw) if !pw.is_empty() => Some(Zeroizing::new(pw)),
        _ => None,
    }
}

/// Ask a yes/no question, defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| OpenTermError::CommandFailed(format!("confirm prompt: {e}")))
}
