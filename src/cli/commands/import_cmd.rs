//! `openterm import` — merge passwords from a JSON export.
//!
//! Imported values win over existing entries with the same connection id;
//! unrelated entries are kept.  If no vault exists yet, one is created with
//! the given master password.

use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{prompt_new_password, prompt_password, Cli, Context, PASSWORD_ENV};
use crate::errors::{OpenTermError, Result};
use crate::vault::PasswordExport;

/// Execute the `import` command.
pub fn execute(cli: &Cli, file_path: &str) -> Result<()> {
    let ctx = Context::load(cli)?;
    let source = Path::new(file_path);

    if !source.exists() {
        return Err(OpenTermError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    let export = parse_export_file(source)?;
    if export.is_empty() {
        output::warning("No passwords found in the import file.");
        return Ok(());
    }

    let mut vault = ctx.open_vault()?;
    let password = if vault.is_configured() {
        prompt_password()?
    } else {
        output::info("No vault yet — choose a master password to create one.");
        let (password, confirm) = prompt_new_password(PASSWORD_ENV)?;
        if password != confirm {
            return Err(OpenTermError::PasswordMismatch);
        }
        password
    };

    let count = vault.import_passwords(&export, &password)?;
    vault.lock();

    output::success(&format!(
        "Imported {count} password(s) from {} ({} total)",
        source.display(),
        vault.saved_connection_ids().len()
    ));

    Ok(())
}

/// Parse an export file (`{ "passwords": { id: password } }`).
fn parse_export_file(path: &Path) -> Result<PasswordExport> {
    let content = Zeroizing::new(
        fs::read_to_string(path)
            .map_err(|e| OpenTermError::CommandFailed(format!("failed to read file: {e}")))?,
    );

    serde_json::from_str(&content)
        .map_err(|e| OpenTermError::DecodeFailure(format!("invalid export JSON: {e}")))
}
