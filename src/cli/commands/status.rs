//! `openterm status` — show vault state without asking for a password.

use crate::cli::output;
use crate::cli::{Cli, Context};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let vault = ctx.open_vault()?;
    let status = vault.status();

    if !status.is_configured() {
        output::info(&format!(
            "No vault configured (data directory: {})",
            ctx.data_dir.display()
        ));
        output::tip("Run `openterm init` to create one.");
        return Ok(());
    }

    let state = if status.is_unlocked() { "Unlocked" } else { "Locked" };
    output::info(&format!("Vault: {}", vault.path().display()));
    output::info(&format!("{state}, {} saved password(s)", status.saved_count));

    Ok(())
}
