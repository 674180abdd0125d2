//! `openterm unlock` — verify the master password.

use crate::cli::output;
use crate::cli::{Cli, Context};
use crate::errors::Result;

/// Execute the `unlock` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.unlock_vault()?;

    let count = vault.saved_connection_ids().len();
    vault.lock();

    output::success(&format!("Master password OK ({count} saved password(s))"));
    Ok(())
}
