//! In-memory backing store.
//!
//! Used by tests and by `--backend memory` sessions. Faults can be switched
//! on per operation class so callers can observe how the vault reacts to a
//! failing store without touching the OS.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use super::BackingStore;
use crate::errors::{CredVaultError, Result};
use crate::vault::locks::{read, write};
use crate::vault::{Entry, Namespace, SecretKey};

#[derive(Debug, Default)]
struct Faults {
    read: AtomicBool,
    read_all: AtomicBool,
    write: AtomicBool,
    erase: AtomicBool,
}

/// A `BackingStore` that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `read` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.faults.read.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `read_all` fail.
    pub fn fail_enumeration(&self, fail: bool) {
        self.faults.read_all.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `write` fail without touching stored data.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.write.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `erase` fail without touching stored data.
    pub fn fail_erases(&self, fail: bool) {
        self.faults.erase.store(fail, Ordering::SeqCst);
    }

    /// Number of namespaces currently holding at least one entry.
    pub fn namespace_count(&self) -> usize {
        read(&self.data).len()
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(CredVaultError::Backend(format!("injected {what} failure")));
        }
        Ok(())
    }
}

impl BackingStore for MemoryStore {
    fn read(&self, namespace: &Namespace, key: &SecretKey) -> Result<Option<Vec<u8>>> {
        Self::check(&self.faults.read, "read")?;
        let data = read(&self.data);
        Ok(data
            .get(namespace.as_str())
            .and_then(|entries| entries.get(key.as_str()))
            .cloned())
    }

    fn read_all(&self, namespace: &Namespace) -> Result<Vec<Entry>> {
        Self::check(&self.faults.read_all, "enumeration")?;
        let data = read(&self.data);
        Ok(data
            .get(namespace.as_str())
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key, value)| Entry::new(key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn write(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<()> {
        Self::check(&self.faults.write, "write")?;
        let mut data = write(&self.data);
        data.entry(namespace.as_str().to_string())
            .or_default()
            .insert(key.as_str().to_string(), value.to_vec());
        Ok(())
    }

    fn erase(&self, namespace: &Namespace, key: &SecretKey) -> Result<bool> {
        Self::check(&self.faults.erase, "erase")?;
        let mut data = write(&self.data);
        let Some(entries) = data.get_mut(namespace.as_str()) else {
            return Ok(false);
        };
        let removed = entries.remove(key.as_str()).is_some();
        if entries.is_empty() {
            data.remove(namespace.as_str());
        }
        Ok(removed)
    }
}
