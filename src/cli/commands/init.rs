//! `credvault init` — create a new encrypted file store.

use crate::backend::FileStore;
use crate::cli::output;
use crate::cli::{project_dir, prompt_new_password, resolve_settings, Cli};
use crate::config::BackendKind;
use crate::errors::{CredVaultError, Result};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = project_dir()?;
    let settings = resolve_settings(cli, &cwd)?;

    // Only the file store has anything to set up.
    if settings.backend != BackendKind::File {
        output::info(&format!(
            "The {} backend needs no initialization.",
            settings.backend
        ));
        return Ok(());
    }

    let store_dir = settings.store_dir(&cwd);
    if FileStore::exists(&store_dir) {
        output::tip("Use `credvault set` to add secrets to the existing store.");
        return Err(CredVaultError::StoreAlreadyExists(store_dir));
    }

    let password = prompt_new_password()?;
    let store = FileStore::create(
        &store_dir,
        password.as_bytes(),
        Some(&settings.argon2_params()),
    )?;

    output::success(&format!("Store created at {}", store.dir().display()));
    output::tip("Run `credvault set <NAMESPACE> <KEY>` to add a secret.");
    output::tip("Run `credvault list <NAMESPACE>` to see a namespace.");

    Ok(())
}
