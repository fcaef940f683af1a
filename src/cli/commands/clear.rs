//! `credvault clear` — remove every secret in a namespace.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{CredVaultError, Result};
use crate::vault::Namespace;

/// Execute the `clear` command.
pub fn execute(cli: &Cli, namespace: &str, force: bool) -> Result<()> {
    let namespace = Namespace::new(namespace)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete ALL secrets in '{namespace}'?"))
            .default(false)
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let vault = open_vault(cli)?;
    let removed = vault.clear(&namespace)?;

    output::success(&format!(
        "Cleared namespace '{namespace}' ({removed} secret(s) removed)"
    ));

    Ok(())
}
