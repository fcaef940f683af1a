//! Encrypted file backing store.
//!
//! `FileStore` keeps each namespace in its own HMAC-protected file inside a
//! store directory. Values are encrypted with AES-256-GCM under a key
//! derived from the master key, the namespace and the entry key, so no two
//! entries share an encryption key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use fd_lock::RwLock;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use super::format::{self, NamespaceHeader, StoreHeader, StoredEntry, CURRENT_VERSION};
use super::BackingStore;
use crate::crypto::{decrypt, derive_master_key_with_params, encrypt, generate_salt};
use crate::crypto::{Argon2Params, MasterKey};
use crate::errors::{CredVaultError, Result};
use crate::vault::locks::{lock, LockTable};
use crate::vault::{Entry, Namespace, SecretKey};

/// Password-protected, on-disk `BackingStore`.
pub struct FileStore {
    /// Directory holding `store.json` and the namespace files.
    dir: PathBuf,

    /// Derived from the password; zeroized on drop.
    master_key: MasterKey,

    /// Serialises read-modify-write cycles on a namespace file within this
    /// store; the `.lock` file does the same across stores and processes.
    writers: LockTable<Mutex<()>>,
}

impl FileStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Initialise a new store in `dir`.
    ///
    /// Generates a random salt, derives the master key from the password
    /// and records the salt, the Argon2 params and a password verifier in
    /// `store.json`. Pass `None` for `argon2_params` to use the defaults.
    pub fn create(dir: &Path, password: &[u8], argon2_params: Option<&Argon2Params>) -> Result<Self> {
        if Self::exists(dir) {
            return Err(CredVaultError::StoreAlreadyExists(dir.to_path_buf()));
        }
        fs::create_dir_all(dir)?;

        let salt = generate_salt();
        let params = argon2_params.copied().unwrap_or_default();
        let master_key = derive(password, &salt, &params)?;

        let header = StoreHeader {
            version: CURRENT_VERSION,
            salt: salt.to_vec(),
            argon2_params: params,
            created_at: Utc::now(),
            verifier: master_key.derive_verifier()?.to_vec(),
        };
        format::write_store_header(dir, &header)?;

        info!(dir = %dir.display(), "Created encrypted file store");

        Ok(Self {
            dir: dir.to_path_buf(),
            master_key,
            writers: LockTable::new(),
        })
    }

    /// Open an existing store, rejecting a wrong password.
    pub fn open(dir: &Path, password: &[u8]) -> Result<Self> {
        let header = format::read_store_header(dir)?;
        let master_key = derive(password, &header.salt, &header.argon2_params)?;

        let mut verifier = master_key.derive_verifier()?;
        let matches: bool = verifier.as_slice().ct_eq(&header.verifier).into();
        verifier.zeroize();
        if !matches {
            warn!(dir = %dir.display(), "Store password verification failed");
            return Err(CredVaultError::DecryptionFailed);
        }

        debug!(dir = %dir.display(), "Opened encrypted file store");

        Ok(Self {
            dir: dir.to_path_buf(),
            master_key,
            writers: LockTable::new(),
        })
    }

    /// Returns `true` if `dir` already holds an initialised store.
    pub fn exists(dir: &Path) -> bool {
        format::store_header_path(dir).exists()
    }

    /// Returns the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ------------------------------------------------------------------
    // Namespace files
    // ------------------------------------------------------------------

    /// Load and verify the entries of a namespace, keyed by entry key.
    fn load(&self, namespace: &Namespace) -> Result<BTreeMap<String, StoredEntry>> {
        let path = format::namespace_path(&self.dir, namespace.as_str());
        let Some(raw) = format::read_namespace_file(&path)? else {
            return Ok(BTreeMap::new());
        };

        let mut hmac_key = self.master_key.derive_hmac_key(namespace.as_str())?;
        let verified = format::verify_hmac(
            &hmac_key,
            &raw.header_bytes,
            &raw.entries_bytes,
            &raw.stored_hmac,
        );
        hmac_key.zeroize();
        if let Err(e) = verified {
            warn!(namespace = %namespace, path = %path.display(), "Namespace file failed integrity check");
            return Err(e);
        }

        if raw.header.namespace != namespace.as_str() {
            return Err(CredVaultError::InvalidStoreFormat(format!(
                "file {} belongs to namespace '{}'",
                path.display(),
                raw.header.namespace
            )));
        }

        Ok(raw
            .entries
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect())
    }

    /// Persist a namespace, removing its file once it holds no entries.
    fn save(&self, namespace: &Namespace, entries: &BTreeMap<String, StoredEntry>) -> Result<()> {
        let path = format::namespace_path(&self.dir, namespace.as_str());

        if entries.is_empty() {
            format::remove_namespace_file(&path)?;
            return Ok(());
        }

        let header = NamespaceHeader {
            version: CURRENT_VERSION,
            namespace: namespace.as_str().to_string(),
            updated_at: Utc::now(),
        };
        let list: Vec<StoredEntry> = entries.values().cloned().collect();

        let mut hmac_key = self.master_key.derive_hmac_key(namespace.as_str())?;
        let written = format::write_namespace_file(&path, &header, &list, &hmac_key);
        hmac_key.zeroize();
        written
    }

    fn open_value(&self, namespace: &Namespace, entry: &StoredEntry) -> Result<Vec<u8>> {
        let mut entry_key = self
            .master_key
            .derive_entry_key(namespace.as_str(), &entry.key)?;
        let plaintext = decrypt(&entry_key, &entry.encrypted_value);
        entry_key.zeroize();
        plaintext
    }

    fn seal_value(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<Vec<u8>> {
        let mut entry_key = self
            .master_key
            .derive_entry_key(namespace.as_str(), key.as_str())?;
        let sealed = encrypt(&entry_key, value);
        entry_key.zeroize();
        sealed
    }
}

impl BackingStore for FileStore {
    fn read(&self, namespace: &Namespace, key: &SecretKey) -> Result<Option<Vec<u8>>> {
        let entries = self.load(namespace)?;
        entries
            .get(key.as_str())
            .map(|entry| self.open_value(namespace, entry))
            .transpose()
    }

    fn read_all(&self, namespace: &Namespace) -> Result<Vec<Entry>> {
        let entries = self.load(namespace)?;
        entries
            .values()
            .map(|entry| {
                let value = self.open_value(namespace, entry)?;
                Ok(Entry::new(entry.key.clone(), value))
            })
            .collect()
    }

    fn write(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<()> {
        self.exclusive(namespace, || self.write_locked(namespace, key, value))
    }

    fn erase(&self, namespace: &Namespace, key: &SecretKey) -> Result<bool> {
        self.exclusive(namespace, || self.erase_locked(namespace, key))
    }

    fn erase_all(&self, namespace: &Namespace) -> Result<usize> {
        self.exclusive(namespace, || self.erase_all_locked(namespace))
    }
}

impl FileStore {
    /// Run a read-modify-write cycle on `namespace` with both the in-process
    /// writer slot and the namespace's advisory file lock held, so other
    /// `FileStore`s on the same directory (in any process) wait their turn.
    fn exclusive<T>(&self, namespace: &Namespace, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let slot = self.writers.slot(namespace.as_str());
        let result = {
            let _guard = lock(&slot);
            self.with_file_lock(namespace, op)
        };
        self.writers.release(namespace.as_str(), slot);
        result
    }

    fn with_file_lock<T>(&self, namespace: &Namespace, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let file = format::open_lock_file(&self.dir, namespace.as_str())?;
        let mut file_lock = RwLock::new(file);
        let _held = file_lock.write()?;
        op()
    }

    fn write_locked(&self, namespace: &Namespace, key: &SecretKey, value: &[u8]) -> Result<()> {
        let mut entries = self.load(namespace)?;
        let encrypted_value = self.seal_value(namespace, key, value)?;
        let now = Utc::now();

        // Overwrites keep the original creation time.
        let created_at = entries
            .get(key.as_str())
            .map_or(now, |existing| existing.created_at);

        entries.insert(
            key.as_str().to_string(),
            StoredEntry {
                key: key.as_str().to_string(),
                encrypted_value,
                created_at,
                updated_at: now,
            },
        );

        self.save(namespace, &entries)?;
        debug!(namespace = %namespace, key = %key, "Wrote entry to namespace file");
        Ok(())
    }

    fn erase_locked(&self, namespace: &Namespace, key: &SecretKey) -> Result<bool> {
        let mut entries = self.load(namespace)?;
        if entries.remove(key.as_str()).is_none() {
            return Ok(false);
        }
        self.save(namespace, &entries)?;
        debug!(namespace = %namespace, key = %key, "Erased entry from namespace file");
        Ok(true)
    }

    fn erase_all_locked(&self, namespace: &Namespace) -> Result<usize> {
        // Verify before deleting so a tampered file is reported, not discarded.
        let removed = self.load(namespace)?.len();
        let path = format::namespace_path(&self.dir, namespace.as_str());
        format::remove_namespace_file(&path)?;
        Ok(removed)
    }
}

fn derive(password: &[u8], salt: &[u8], params: &Argon2Params) -> Result<MasterKey> {
    let mut bytes = derive_master_key_with_params(password, salt, params)?;
    let master_key = MasterKey::new(bytes);
    bytes.zeroize();
    Ok(master_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::MIN_MEMORY_KIB;
    use tempfile::TempDir;

    const FAST: Argon2Params = Argon2Params {
        memory_kib: MIN_MEMORY_KIB,
        iterations: 1,
        parallelism: 1,
    };

    fn names(ns: &str, key: &str) -> (Namespace, SecretKey) {
        (Namespace::new(ns).unwrap(), SecretKey::new(key).unwrap())
    }

    #[test]
    fn create_refuses_existing_store() {
        let tmp = TempDir::new().unwrap();
        FileStore::create(tmp.path(), b"password-1", Some(&FAST)).unwrap();
        let again = FileStore::create(tmp.path(), b"password-1", Some(&FAST));
        assert!(matches!(again, Err(CredVaultError::StoreAlreadyExists(_))));
    }

    #[test]
    fn empty_namespace_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::create(tmp.path(), b"password-1", Some(&FAST)).unwrap();
        let (ns, key) = names("svc", "token");

        store.write(&ns, &key, b"v").unwrap();
        let path = format::namespace_path(tmp.path(), "svc");
        assert!(path.exists());

        assert!(store.erase(&ns, &key).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn values_are_not_stored_in_plaintext() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::create(tmp.path(), b"password-1", Some(&FAST)).unwrap();
        let (ns, key) = names("svc", "token");
        store.write(&ns, &key, b"very-recognisable-secret").unwrap();

        let raw = fs::read(format::namespace_path(tmp.path(), "svc")).unwrap();
        let haystack = String::from_utf8_lossy(&raw);
        assert!(!haystack.contains("very-recognisable-secret"));
    }

    #[test]
    fn overwrite_preserves_created_at() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::create(tmp.path(), b"password-1", Some(&FAST)).unwrap();
        let (ns, key) = names("svc", "token");

        store.write(&ns, &key, b"one").unwrap();
        let first = store.load(&ns).unwrap()["token"].created_at;
        store.write(&ns, &key, b"two").unwrap();
        let after = store.load(&ns).unwrap();

        assert_eq!(after["token"].created_at, first);
        assert!(after["token"].updated_at >= first);
    }

    #[test]
    fn erase_all_reports_count() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::create(tmp.path(), b"password-1", Some(&FAST)).unwrap();
        let ns = Namespace::new("svc").unwrap();
        for key in ["a", "b"] {
            store.write(&ns, &SecretKey::new(key).unwrap(), b"v").unwrap();
        }
        assert_eq!(store.erase_all(&ns).unwrap(), 2);
        assert_eq!(store.erase_all(&ns).unwrap(), 0);
    }
}
