//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::Entry;

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

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Render a value for display: UTF-8 text when valid, otherwise base64.
pub fn display_value(value: &[u8], force_base64: bool) -> String {
    if force_base64 {
        return BASE64.encode(value);
    }
    match std::str::from_utf8(value) {
        Ok(text) => text.to_string(),
        Err(_) => BASE64.encode(value),
    }
}

/// Print a table of entries (Key, Size, Value). Values are masked unless
/// `show_values` is set.
pub fn print_entries_table(namespace: &str, entries: &[Entry], show_values: bool) {
    if entries.is_empty() {
        info(&format!("No secrets in namespace '{namespace}'."));
        tip("Run `credvault set <NAMESPACE> <KEY>` to add one.");
        return;
    }

    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.key.cmp(&b.key));

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Size", "Value"]);

    for entry in sorted {
        let value = if show_values {
            display_value(&entry.value, false)
        } else {
            "••••••••".to_string()
        };
        table.add_row(vec![
            entry.key.clone(),
            format!("{} B", entry.value.len()),
            value,
        ]);
    }

    println!("{table}");
}
