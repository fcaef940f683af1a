//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::backend::open_backend;
use crate::config::{BackendKind, Settings};
use crate::errors::{CredVaultError, Result};
use crate::vault::{Namespace, SecretKey, Vault};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable consulted before prompting for the store password.
pub const PASSWORD_ENV: &str = "CREDVAULT_PASSWORD";

/// credvault CLI: namespaced credential vault.
#[derive(Parser)]
#[command(
    name = "credvault",
    about = "Namespaced credential vault with pluggable secure storage",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backing store: file, keyring or memory (default from .credvault.toml, else file)
    #[arg(long, global = true, env = "CREDVAULT_BACKEND")]
    pub backend: Option<BackendKind>,

    /// File store directory (default from .credvault.toml, else .credvault)
    #[arg(long, global = true)]
    pub vault_dir: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Initialize a new encrypted file store
    Init,

    /// Print a secret's value
    Get {
        /// Namespace (e.g. the owning service)
        namespace: String,
        /// Secret key
        key: String,
        /// Always print the value as base64
        #[arg(long)]
        base64: bool,
    },

    /// List the secrets in a namespace
    List {
        /// Namespace to list
        namespace: String,
        /// Show secret values instead of masking them
        #[arg(long)]
        show_values: bool,
    },

    /// Set a secret (add or update)
    Set {
        /// Namespace
        namespace: String,
        /// Secret key
        key: String,
        /// Secret value (omit to read stdin or prompt)
        value: Option<String>,
        /// Treat the value as base64-encoded bytes
        #[arg(long)]
        base64: bool,
    },

    /// Delete a secret
    Delete {
        /// Namespace
        namespace: String,
        /// Secret key
        key: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete every secret in a namespace
    Clear {
        /// Namespace to clear
        namespace: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Serve JSON requests from stdin, one per line, answering on stdout
    Call,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the store password, trying in order:
/// 1. `CREDVAULT_PASSWORD` env var (CI/CD)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter store password")
        .interact()
        .map_err(|e| CredVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used during `init`).
///
/// Also respects `CREDVAULT_PASSWORD` for scripted/CI usage.
/// Enforces a minimum password length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        if pw.len() < MIN_PASSWORD_LEN {
            return Err(CredVaultError::CommandFailed(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose store password")
            .with_confirmation(
                "Confirm store password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

fn password_from_env() -> Option<Zeroizing<String>> {
    match std::env::var(PASSWORD_ENV) {
        Ok(pw) if !pw.is_empty() => Some(Zeroizing::new(pw)),
        _ => None,
    }
}

/// Load `.credvault.toml` from `project_dir` and apply CLI overrides.
pub fn resolve_settings(cli: &Cli, project_dir: &Path) -> Result<Settings> {
    let mut settings = Settings::load(project_dir)?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    if let Some(dir) = &cli.vault_dir {
        settings.vault_dir = dir.clone();
    }
    Ok(settings)
}

/// The project directory commands operate in (the current directory).
pub fn project_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir()?)
}

/// Open the vault over the configured backing store.
///
/// The password is only requested when the file backend is selected.
pub fn open_vault(cli: &Cli) -> Result<Vault> {
    let cwd = project_dir()?;
    let settings = resolve_settings(cli, &cwd)?;
    if settings.backend == BackendKind::Memory && !matches!(cli.command, Commands::Call) {
        output::warning("Using the memory backend: nothing persists after this command.");
    }
    let store = open_backend(&settings, &cwd, prompt_password)?;
    Ok(Vault::new(store))
}

/// Validate a namespace/key pair given on the command line.
pub fn parse_entry_args(namespace: &str, key: &str) -> Result<(Namespace, SecretKey)> {
    Ok((Namespace::new(namespace)?, SecretKey::new(key)?))
}
