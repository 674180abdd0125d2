//! `openterm set` — save or update the password for a connection.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{Cli, Context};
use crate::errors::{OpenTermError, Result};

/// Execute the `set` command.
pub fn execute(cli: &Cli, id: &str, value: Option<&str>) -> Result<()> {
    let ctx = Context::load(cli)?;

    // Determine the password from one of three sources.
    let connection_password = Zeroizing::new(if let Some(v) = value {
        // Source 1: Inline value on the command line.
        output::warning("Password provided on the command line may appear in shell history.");
        v.to_string()
    } else if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        // Source 3: Interactive secure prompt (default).
        dialoguer::Password::new()
            .with_prompt(format!("Password for connection {id}"))
            .interact()
            .map_err(|e| OpenTermError::CommandFailed(format!("input prompt: {e}")))?
    });

    // Unlock, store, and let the vault write the new envelope.
    let mut vault = ctx.unlock_vault()?;
    let existed = vault.password(id)?.is_some();
    vault.store_password(id, &connection_password)?;
    let total = vault.saved_connection_ids().len();
    vault.lock();

    let verb = if existed { "updated" } else { "saved" };
    output::success(&format!("Password for {id} {verb} ({total} total)"));

    Ok(())
}
