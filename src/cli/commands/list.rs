//! `openterm list` — list connections that have a saved password.
//!
//! Reads the envelope's public index, so no password is needed.

use crate::cli::output;
use crate::cli::{Cli, Context};
use crate::errors::{OpenTermError, Result};

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let vault = ctx.open_vault()?;

    if !vault.is_configured() {
        return Err(OpenTermError::NotConfigured);
    }

    let ids = vault.saved_connection_ids();
    output::info(&format!("{} saved password(s)", ids.len()));
    output::print_connections_table(ids);

    Ok(())
}
