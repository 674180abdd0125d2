//! `openterm remove` — delete the saved password for a connection.

use crate::cli::output;
use crate::cli::{confirm, Cli, Context};
use crate::errors::{OpenTermError, Result};

/// Execute the `remove` command.
pub fn execute(cli: &Cli, id: &str, force: bool) -> Result<()> {
    let ctx = Context::load(cli)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force && !confirm(&format!("Remove saved password for {id}?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    let mut vault = ctx.unlock_vault()?;
    let existed = vault.remove_password(id)?;
    vault.lock();

    if !existed {
        return Err(OpenTermError::PasswordNotFound(id.to_string()));
    }
    output::success(&format!("Removed saved password for {id}"));

    Ok(())
}
