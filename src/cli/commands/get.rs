//! `openterm get` — print the saved password for one connection.

use crate::cli::{Cli, Context};
use crate::errors::{OpenTermError, Result};

/// Execute the `get` command.
pub fn execute(cli: &Cli, id: &str) -> Result<()> {
    let ctx = Context::load(cli)?;
    let vault = ctx.unlock_vault()?;

    // Print the password to stdout so it can be piped.
    let password = vault
        .password(id)?
        .ok_or_else(|| OpenTermError::PasswordNotFound(id.to_string()))?;
    println!("{password}");

    Ok(())
}
