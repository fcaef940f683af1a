//! The vault: namespaced secret operations over a backing store.
//!
//! `Vault` validates nothing itself (its inputs are already-validated
//! `Namespace`/`SecretKey` values); it owns the locking discipline and
//! turns backing-store answers into the vault's error model.
//!
//! Locking: every namespace has a `scan` lock and one lock per key.
//! Single-key operations share `scan` and lock their key, so they only
//! contend with operations on the same key. `list` and `clear` take `scan`
//! exclusively and see or change the namespace as a whole.

use std::sync::RwLock;

use tracing::{debug, info, warn};

use super::entry::{Entry, Namespace, SecretKey};
use super::locks::{read, write, LockTable};
use crate::backend::BackingStore;
use crate::errors::{CredVaultError, Result};

#[derive(Default)]
struct NamespaceLocks {
    scan: RwLock<()>,
    entries: LockTable<RwLock<()>>,
}

#[derive(Clone, Copy)]
enum Access {
    Shared,
    Exclusive,
}

/// A namespaced key/value secret store.
///
/// Values handed out are always copies; the only way to change what the
/// vault holds is through `set`, `delete` and `clear`.
pub struct Vault<S = Box<dyn BackingStore>> {
    store: S,
    namespaces: LockTable<NamespaceLocks>,
}

impl<S: BackingStore> Vault<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            namespaces: LockTable::new(),
        }
    }

    /// The backing store this vault delegates to.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Return the value stored under `key`.
    ///
    /// Fails with `NotFound` when the entry is absent; a store that cannot
    /// be read reports its own error instead.
    pub fn get(&self, namespace: &Namespace, key: &SecretKey) -> Result<Vec<u8>> {
        self.with_entry(namespace, key, Access::Shared, || {
            match self.store.read(namespace, key) {
                Ok(Some(value)) => {
                    debug!(namespace = %namespace, key = %key, "Read secret");
                    Ok(value)
                }
                Ok(None) => {
                    debug!(namespace = %namespace, key = %key, "Secret not found");
                    Err(CredVaultError::NotFound {
                        namespace: namespace.to_string(),
                        key: key.to_string(),
                    })
                }
                Err(e) => Err(report("read", namespace, Some(key), e)),
            }
        })
    }

    /// Return every entry in the namespace, in no particular order.
    pub fn list(&self, namespace: &Namespace) -> Result<Vec<Entry>> {
        self.with_namespace(namespace, || {
            let entries = self
                .store
                .read_all(namespace)
                .map_err(|e| report("list", namespace, None, e))?;
            debug!(namespace = %namespace, count = entries.len(), "Listed secrets");
            Ok(entries)
        })
    }

    /// Create or overwrite an entry, returning the value now stored.
    ///
    /// If the store fails, the previous value (if any) is still readable.
    pub fn set(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<Vec<u8>> {
        self.with_entry(namespace, key, Access::Exclusive, || {
            self.store
                .write(namespace, key, value)
                .map_err(|e| report("write", namespace, Some(key), e))?;
            info!(namespace = %namespace, key = %key, len = value.len(), "Stored secret");
            Ok(value.to_vec())
        })
    }

    /// Remove an entry. Removing an absent entry succeeds.
    pub fn delete(&self, namespace: &Namespace, key: &SecretKey) -> Result<()> {
        self.with_entry(namespace, key, Access::Exclusive, || {
            let removed = self
                .store
                .erase(namespace, key)
                .map_err(|e| report("erase", namespace, Some(key), e))?;
            if removed {
                info!(namespace = %namespace, key = %key, "Deleted secret");
            } else {
                debug!(namespace = %namespace, key = %key, "Delete of absent secret");
            }
            Ok(())
        })
    }

    /// Remove every entry in the namespace. Returns how many were removed.
    pub fn clear(&self, namespace: &Namespace) -> Result<usize> {
        self.with_namespace(namespace, || {
            let removed = self
                .store
                .erase_all(namespace)
                .map_err(|e| report("clear", namespace, None, e))?;
            info!(namespace = %namespace, removed, "Cleared namespace");
            Ok(removed)
        })
    }

    // ------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------

    fn with_entry<T>(
        &self,
        namespace: &Namespace,
        key: &SecretKey,
        access: Access,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let ns_slot = self.namespaces.slot(namespace.as_str());
        let result = {
            let _scan = read(&ns_slot.scan);
            let key_slot = ns_slot.entries.slot(key.as_str());
            let result = match access {
                Access::Shared => {
                    let _guard = read(&key_slot);
                    f()
                }
                Access::Exclusive => {
                    let _guard = write(&key_slot);
                    f()
                }
            };
            ns_slot.entries.release(key.as_str(), key_slot);
            result
        };
        self.namespaces.release(namespace.as_str(), ns_slot);
        result
    }

    fn with_namespace<T>(&self, namespace: &Namespace, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let ns_slot = self.namespaces.slot(namespace.as_str());
        let result = {
            let _scan = write(&ns_slot.scan);
            f()
        };
        self.namespaces.release(namespace.as_str(), ns_slot);
        result
    }
}

/// Log a backing-store failure and hand the error back unchanged.
fn report(
    operation: &str,
    namespace: &Namespace,
    key: Option<&SecretKey>,
    error: CredVaultError,
) -> CredVaultError {
    match key {
        Some(key) => warn!(operation, namespace = %namespace, key = %key, error = %error, "Backing store failed"),
        None => warn!(operation, namespace = %namespace, error = %error, "Backing store failed"),
    }
    error
}
