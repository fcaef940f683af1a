//! `credvault list` — display the secrets in a namespace.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;
use crate::vault::Namespace;

/// Execute the `list` command.
pub fn execute(cli: &Cli, namespace: &str, show_values: bool) -> Result<()> {
    let namespace = Namespace::new(namespace)?;
    let vault = open_vault(cli)?;

    let entries = vault.list(&namespace)?;
    if !entries.is_empty() {
        output::info(&format!("{namespace}: {} secret(s)", entries.len()));
    }
    output::print_entries_table(namespace.as_str(), &entries, show_values);

    Ok(())
}
