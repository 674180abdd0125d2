//! `openterm export` — export saved passwords as JSON.
//!
//! The output is `{ "passwords": { "<connection-id>": "<password>" } }`,
//! the same shape `openterm import` accepts.

use std::collections::BTreeMap;
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{prompt_password, Cli, Context};
use crate::errors::{OpenTermError, Result};
use crate::vault::file_store::{write_atomic, VAULT_FILE_NAME};
use crate::vault::PasswordExport;

/// Execute the `export` command.
pub fn execute(cli: &Cli, output_path: Option<&str>) -> Result<()> {
    let ctx = Context::load(cli)?;
    let vault = ctx.open_vault()?;
    if !vault.is_configured() {
        return Err(OpenTermError::NotConfigured);
    }

    let password = prompt_password()?;
    let export = vault
        .export_passwords(&password)
        .ok_or(OpenTermError::InvalidMasterPassword)?;

    let content = format_as_json(&export)?;

    match output_path {
        Some(dest) => {
            // Safety: refuse to overwrite the vault itself.
            if Path::new(dest)
                .file_name()
                .is_some_and(|name| name == VAULT_FILE_NAME)
            {
                return Err(OpenTermError::CommandFailed(format!(
                    "refusing to export over a {VAULT_FILE_NAME} file"
                )));
            }

            write_atomic(Path::new(dest), content.as_bytes()).map_err(|e| {
                OpenTermError::CommandFailed(format!("failed to write export file: {e}"))
            })?;

            output::success(&format!("Exported {} password(s) to {dest}", export.len()));
            output::warning("The export file contains plaintext passwords.");
        }
        None => {
            // Write to stdout (no success message, just raw output).
            println!("{}", content.as_str());
        }
    }

    Ok(())
}

/// Serialize with sorted keys for deterministic output.
fn format_as_json(export: &PasswordExport) -> Result<Zeroizing<String>> {
    let sorted: BTreeMap<&String, &String> = export.passwords.iter().collect();
    let json = serde_json::to_string_pretty(&serde_json::json!({ "passwords": sorted }))
        .map_err(|e| OpenTermError::SerializationError(format!("JSON export: {e}")))?;
    Ok(Zeroizing::new(json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_export_is_sorted_and_reimportable() {
        let export: PasswordExport = [
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect();

        let json = format_as_json(&export).unwrap();
        assert!(json.find("\"a\"").unwrap() < json.find("\"b\"").unwrap());

        let parsed: PasswordExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, export);
    }
}
