//! `openterm clear` — delete every saved password.

use crate::cli::output;
use crate::cli::{confirm, Cli, Context};
use crate::errors::Result;

/// Execute the `clear` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let ctx = Context::load(cli)?;

    if !force && !confirm("Remove ALL saved passwords?")? {
        output::info("Cancelled.");
        return Ok(());
    }

    let mut vault = ctx.unlock_vault()?;
    let count = vault.saved_connection_ids().len();
    vault.remove_all()?;
    vault.lock();

    output::success(&format!("Removed {count} saved password(s)"));
    Ok(())
}
