//! `credvault set` — add or update a secret.

use std::io::{self, IsTerminal, Read};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_vault, parse_entry_args, Cli};
use crate::errors::{CredVaultError, Result};

/// Execute the `set` command.
pub fn execute(
    cli: &Cli,
    namespace: &str,
    key: &str,
    value: Option<&str>,
    base64: bool,
) -> Result<()> {
    let (namespace, key) = parse_entry_args(namespace, key)?;

    // Determine the secret value from one of three sources.
    let raw = if let Some(v) = value {
        output::warning("Value provided on command line — it may appear in shell history.");
        Zeroizing::new(v.to_string())
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end_matches(['\n', '\r']).to_string();
        zeroize::Zeroize::zeroize(&mut buf);
        Zeroizing::new(trimmed)
    } else {
        let v = dialoguer::Password::new()
            .with_prompt(format!("Enter value for {key}"))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("input prompt: {e}")))?;
        Zeroizing::new(v)
    };

    let bytes = if base64 {
        Zeroizing::new(
            BASE64
                .decode(raw.trim())
                .map_err(|e| CredVaultError::InvalidArguments(format!("value is not base64: {e}")))?,
        )
    } else {
        Zeroizing::new(raw.as_bytes().to_vec())
    };

    let vault = open_vault(cli)?;
    let stored = Zeroizing::new(vault.set(&namespace, &key, &bytes)?);

    output::success(&format!(
        "Secret '{key}' stored in namespace '{namespace}' ({} bytes)",
        stored.len()
    ));

    Ok(())
}
