//! `credvault delete` — remove a secret from a namespace.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_vault, parse_entry_args, Cli};
use crate::errors::{CredVaultError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, namespace: &str, key: &str, force: bool) -> Result<()> {
    let (namespace, key) = parse_entry_args(namespace, key)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete secret '{key}' from '{namespace}'?"))
            .default(false)
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let vault = open_vault(cli)?;
    vault.delete(&namespace, &key)?;

    output::success(&format!("Deleted secret '{key}' from '{namespace}'"));

    Ok(())
}
