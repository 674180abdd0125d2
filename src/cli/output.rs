//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.  Status lines go to stderr
//! when stdout may carry data (exports, macro playback).

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::macros::{Macro, MacroStep};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Blue info message on stderr, for commands whose stdout is data.
pub fn status(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the connection ids that have a saved password.
pub fn print_connections_table<'a>(ids: impl IntoIterator<Item = &'a String>) {
    let ids: Vec<&String> = ids.into_iter().collect();
    if ids.is_empty() {
        info("No saved passwords yet.");
        tip("Run `openterm set <CONNECTION-ID>` to save one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Connection"]);

    for (i, id) in ids.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), (*id).clone()]);
    }

    println!("{table}");
}

/// Print a table of saved macros (Name, Steps, Updated).
pub fn print_macros_table(macros: &[&Macro]) {
    if macros.is_empty() {
        info("No macros saved yet.");
        tip("Run `openterm macro add <NAME> --file <PATH>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Steps", "Updated", "Id"]);

    for m in macros {
        table.add_row(vec![
            m.name.clone(),
            m.steps().len().to_string(),
            m.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            m.id.to_string(),
        ]);
    }

    println!("{table}");
}

/// Print parsed steps with the bytes each one sends.
pub fn print_steps_table(steps: &[MacroStep]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Step", "Bytes"]);

    for (i, step) in steps.iter().enumerate() {
        let bytes = step.to_bytes();
        let shown = if step.is_control_flow() {
            "(timing)".to_string()
        } else if bytes.is_empty() {
            "-".to_string()
        } else {
            bytes
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        table.add_row(vec![(i + 1).to_string(), step.to_string(), shown]);
    }

    println!("{table}");
}
