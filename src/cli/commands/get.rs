//! `credvault get` — retrieve and print a single secret's value.

use crate::cli::output::display_value;
use crate::cli::{open_vault, parse_entry_args, Cli};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, namespace: &str, key: &str, base64: bool) -> Result<()> {
    let (namespace, key) = parse_entry_args(namespace, key)?;
    let vault = open_vault(cli)?;

    let value = vault.get(&namespace, &key)?;
    println!("{}", display_value(&value, base64));

    Ok(())
}
