//! OS keyring backing store.
//!
//! Stores each entry as a credential in the operating system's secure
//! credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! The credential's service is the namespace and its user is the entry key.
//! OS credential APIs cannot enumerate a service, so every namespace also
//! holds a JSON index of its keys under [`INDEX_USER`].

use std::collections::BTreeSet;
use std::sync::Mutex;

use tracing::{debug, warn};

use super::BackingStore;
use crate::errors::{CredVaultError, Result};
use crate::vault::locks::{lock, LockTable};
use crate::vault::{Entry, Namespace, SecretKey};

/// Reserved user name holding a namespace's key index.
pub const INDEX_USER: &str = "__credvault_index__";

/// `BackingStore` backed by the platform credential manager.
pub struct KeyringStore {
    /// Serialises index updates per namespace.
    indexes: LockTable<Mutex<()>>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            indexes: LockTable::new(),
        }
    }

    fn entry(namespace: &str, user: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(namespace, user).map_err(|e| {
            CredVaultError::KeyringError(format!("failed to create keyring entry: {e}"))
        })
    }

    /// Read a credential's bytes, mapping "no entry" to `None`.
    fn get(namespace: &str, user: &str) -> Result<Option<Vec<u8>>> {
        match Self::entry(namespace, user)?.get_secret() {
            Ok(bytes) => Ok(Some(bytes)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredVaultError::KeyringError(format!(
                "failed to read from keyring: {e}"
            ))),
        }
    }

    fn set(namespace: &str, user: &str, bytes: &[u8]) -> Result<()> {
        Self::entry(namespace, user)?.set_secret(bytes).map_err(|e| {
            CredVaultError::KeyringError(format!("failed to store secret in keyring: {e}"))
        })
    }

    /// Delete a credential. Returns whether it existed.
    fn remove(namespace: &str, user: &str) -> Result<bool> {
        match Self::entry(namespace, user)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(CredVaultError::KeyringError(format!(
                "failed to delete from keyring: {e}"
            ))),
        }
    }

    fn load_index(namespace: &Namespace) -> Result<BTreeSet<String>> {
        match Self::get(namespace.as_str(), INDEX_USER)? {
            Some(bytes) => parse_index(&bytes),
            None => Ok(BTreeSet::new()),
        }
    }

    fn save_index(namespace: &Namespace, index: &BTreeSet<String>) -> Result<()> {
        if index.is_empty() {
            Self::remove(namespace.as_str(), INDEX_USER)?;
            return Ok(());
        }
        let bytes = serde_json::to_vec(index)
            .map_err(|e| CredVaultError::SerializationError(format!("keyring index: {e}")))?;
        Self::set(namespace.as_str(), INDEX_USER, &bytes)
    }

    /// Run `f` with exclusive access to the namespace's index.
    fn with_index<T>(
        &self,
        namespace: &Namespace,
        f: impl FnOnce(&mut BTreeSet<String>) -> Result<T>,
    ) -> Result<T> {
        let slot = self.indexes.slot(namespace.as_str());
        let result = {
            let _guard = lock(&slot);
            Self::load_index(namespace).and_then(|mut index| f(&mut index))
        };
        self.indexes.release(namespace.as_str(), slot);
        result
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a stored key index.
pub(crate) fn parse_index(bytes: &[u8]) -> Result<BTreeSet<String>> {
    serde_json::from_slice(bytes)
        .map_err(|e| CredVaultError::InvalidStoreFormat(format!("keyring index: {e}")))
}

fn reject_reserved(key: &SecretKey) -> Result<()> {
    if key.as_str() == INDEX_USER {
        return Err(CredVaultError::InvalidArguments(format!(
            "key '{INDEX_USER}' is reserved by the keyring store"
        )));
    }
    Ok(())
}

impl BackingStore for KeyringStore {
    fn read(&self, namespace: &Namespace, key: &SecretKey) -> Result<Option<Vec<u8>>> {
        reject_reserved(key)?;
        Self::get(namespace.as_str(), key.as_str())
    }

    fn read_all(&self, namespace: &Namespace) -> Result<Vec<Entry>> {
        let index = Self::load_index(namespace)?;
        let mut entries = Vec::with_capacity(index.len());
        for key in index {
            // Indexed keys whose credential is gone were interrupted
            // mid-write or mid-erase; they are not entries.
            match Self::get(namespace.as_str(), &key)? {
                Some(value) => entries.push(Entry::new(key, value)),
                None => debug!(namespace = %namespace, key = %key, "Skipping stale index entry"),
            }
        }
        Ok(entries)
    }

    fn write(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<()> {
        reject_reserved(key)?;
        self.with_index(namespace, |index| {
            // Index first: a failed value write then leaves a stale index
            // entry, never an unlisted value.
            if index.insert(key.as_str().to_string()) {
                Self::save_index(namespace, index)?;
            }
            Self::set(namespace.as_str(), key.as_str(), value)
        })
    }

    fn erase(&self, namespace: &Namespace, key: &SecretKey) -> Result<bool> {
        reject_reserved(key)?;
        self.with_index(namespace, |index| {
            let removed = Self::remove(namespace.as_str(), key.as_str())?;
            if index.remove(key.as_str()) {
                if let Err(e) = Self::save_index(namespace, index) {
                    warn!(namespace = %namespace, key = %key, error = %e, "Failed to update keyring index");
                    return Err(e);
                }
            }
            Ok(removed)
        })
    }
}
