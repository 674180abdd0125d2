//! `openterm change-password` — re-key the vault under a new master password.
//!
//! The vault decrypts with the current password, generates a new salt,
//! derives a new key with the configured KDF, re-encrypts every entry and
//! replaces the file atomically.

use crate::cli::output;
use crate::cli::{prompt_new_password, prompt_password, Cli, Context, NEW_PASSWORD_ENV};
use crate::errors::{OpenTermError, Result};

/// Execute the `change-password` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.open_vault()?;
    if !vault.is_configured() {
        return Err(OpenTermError::NotConfigured);
    }

    // 1. Current password.
    output::info("Enter your current master password.");
    let current = prompt_password()?;

    // 2. New password with confirmation.
    output::info("Choose your new master password.");
    let (new_password, confirm) = prompt_new_password(NEW_PASSWORD_ENV)?;

    // 3. Re-key and save atomically.
    vault.change_master_password(&current, &new_password, &confirm)?;
    let count = vault.saved_connection_ids().len();
    vault.lock();

    output::success(&format!(
        "Master password changed ({count} password(s) re-encrypted)"
    ));

    Ok(())
}
