//! Backing stores: where the vault keeps its entries durably.
//!
//! This module provides:
//! - The `BackingStore` capability trait
//! - An in-memory fake with fault injection (`memory`)
//! - An encrypted on-disk store (`file`, `format`)
//! - An OS keyring store (`keyring`, feature `keyring-store`)
//! - `open_backend`, which builds the store selected in `Settings`

pub mod file;
pub mod format;
pub mod memory;

#[cfg(feature = "keyring-store")]
pub mod keyring;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::{BackendKind, Settings};
use crate::errors::Result;
use crate::vault::{Entry, Namespace, SecretKey};

pub use file::FileStore;
pub use memory::MemoryStore;

#[cfg(feature = "keyring-store")]
pub use self::keyring::KeyringStore;

/// Durable storage capability the vault delegates to.
///
/// Implementations must make `write` atomic: if it fails, the previous
/// value for that key (if any) must still be readable. Absence is never an
/// error: `read` returns `None` and `erase` returns `false`.
pub trait BackingStore: Send + Sync {
    /// Read one value, or `None` if the key is absent.
    fn read(&self, namespace: &Namespace, key: &SecretKey) -> Result<Option<Vec<u8>>>;

    /// Read every entry in a namespace. An unknown namespace is empty.
    fn read_all(&self, namespace: &Namespace) -> Result<Vec<Entry>>;

    /// Create or overwrite one value.
    fn write(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<()>;

    /// Remove one value. Returns whether anything was removed.
    fn erase(&self, namespace: &Namespace, key: &SecretKey) -> Result<bool>;

    /// Remove every entry in a namespace. Returns how many were removed.
    fn erase_all(&self, namespace: &Namespace) -> Result<usize> {
        let mut removed = 0;
        for entry in self.read_all(namespace)? {
            let key = SecretKey::new(entry.key)?;
            if self.erase(namespace, &key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl<S: BackingStore + ?Sized> BackingStore for Box<S> {
    fn read(&self, namespace: &Namespace, key: &SecretKey) -> Result<Option<Vec<u8>>> {
        (**self).read(namespace, key)
    }

    fn read_all(&self, namespace: &Namespace) -> Result<Vec<Entry>> {
        (**self).read_all(namespace)
    }

    fn write(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<()> {
        (**self).write(namespace, key, value)
    }

    fn erase(&self, namespace: &Namespace, key: &SecretKey) -> Result<bool> {
        (**self).erase(namespace, key)
    }

    fn erase_all(&self, namespace: &Namespace) -> Result<usize> {
        (**self).erase_all(namespace)
    }
}

impl<S: BackingStore + ?Sized> BackingStore for Arc<S> {
    fn read(&self, namespace: &Namespace, key: &SecretKey) -> Result<Option<Vec<u8>>> {
        (**self).read(namespace, key)
    }

    fn read_all(&self, namespace: &Namespace) -> Result<Vec<Entry>> {
        (**self).read_all(namespace)
    }

    fn write(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<()> {
        (**self).write(namespace, key, value)
    }

    fn erase(&self, namespace: &Namespace, key: &SecretKey) -> Result<bool> {
        (**self).erase(namespace, key)
    }

    fn erase_all(&self, namespace: &Namespace) -> Result<usize> {
        (**self).erase_all(namespace)
    }
}

/// Build the backing store selected in `settings`.
///
/// `password` is only consulted for the file store, and only when it is
/// actually opened, so keyring and memory backends never prompt.
pub fn open_backend<F>(
    settings: &Settings,
    project_dir: &Path,
    password: F,
) -> Result<Box<dyn BackingStore>>
where
    F: FnOnce() -> Result<zeroize::Zeroizing<String>>,
{
    match settings.backend {
        BackendKind::Memory => {
            info!(backend = "memory", "Using in-memory backing store");
            Ok(Box::new(MemoryStore::new()))
        }
        BackendKind::File => {
            let dir = settings.store_dir(project_dir);
            info!(backend = "file", dir = %dir.display(), "Using encrypted file backing store");
            let password = password()?;
            Ok(Box::new(FileStore::open(&dir, password.as_bytes())?))
        }
        BackendKind::Keyring => open_keyring(),
    }
}

#[cfg(feature = "keyring-store")]
fn open_keyring() -> Result<Box<dyn BackingStore>> {
    info!(backend = "keyring", "Using OS keyring backing store");
    Ok(Box::new(KeyringStore::new()))
}

#[cfg(not(feature = "keyring-store"))]
fn open_keyring() -> Result<Box<dyn BackingStore>> {
    Err(crate::errors::CredVaultError::ConfigError(
        "keyring backend requires building with `--features keyring-store`".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CredVaultError;
    use tempfile::TempDir;
    use zeroize::Zeroizing;

    #[test]
    fn memory_backend_never_asks_for_a_password() {
        let settings = Settings {
            backend: BackendKind::Memory,
            ..Settings::default()
        };
        let tmp = TempDir::new().unwrap();
        let store = open_backend(&settings, tmp.path(), || {
            panic!("password requested for the memory backend")
        })
        .unwrap();

        let ns = Namespace::new("svc").unwrap();
        assert!(store.read_all(&ns).unwrap().is_empty());
    }

    #[test]
    fn file_backend_requires_initialized_store() {
        let settings = Settings::default();
        let tmp = TempDir::new().unwrap();
        let result = open_backend(&settings, tmp.path(), || {
            Ok(Zeroizing::new("password-123".to_string()))
        });
        assert!(matches!(result, Err(CredVaultError::StoreNotFound(_))));
    }

    #[test]
    fn default_erase_all_removes_every_entry() {
        let store = MemoryStore::new();
        let ns = Namespace::new("svc").unwrap();
        for key in ["a", "b", "c"] {
            store
                .write(&ns, &SecretKey::new(key).unwrap(), b"v")
                .unwrap();
        }
        let boxed: Box<dyn BackingStore> = Box::new(store);
        assert_eq!(boxed.erase_all(&ns).unwrap(), 3);
        assert!(boxed.read_all(&ns).unwrap().is_empty());
    }
}
