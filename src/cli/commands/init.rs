//! `openterm init` — configure the vault with a new master password.

use crate::cli::output;
use crate::cli::{prompt_new_password, Cli, Context, PASSWORD_ENV};
use crate::errors::{OpenTermError, Result};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.open_vault()?;

    // 1. Refuse to overwrite an existing vault.
    if vault.is_configured() {
        output::tip("Use `openterm change-password` to change the master password.");
        return Err(OpenTermError::AlreadyConfigured(vault.path().to_path_buf()));
    }

    // 2. Prompt for the master password twice; the vault checks the match.
    let (password, confirm) = prompt_new_password(PASSWORD_ENV)?;

    // 3. Derive the key and write the empty envelope.
    output::status("Deriving key from master password...");
    vault.configure(&password, &confirm)?;

    output::success(&format!("Vault created at {}", vault.path().display()));
    output::tip("Run `openterm set <CONNECTION-ID>` to save a connection password.");
    output::tip("Run `openterm macro add <NAME>` to save a macro.");

    Ok(())
}
