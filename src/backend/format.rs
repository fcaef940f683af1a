//! On-disk layout of the encrypted file store.
//!
//! A store directory holds one `store.json` header plus, per namespace, a
//! `.vault` data file and an empty `.lock` file that writers take an
//! advisory lock on. Data files look like this:
//!
//! ```text
//! [CVLT: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][entries JSON][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`CVLT`): identifies the file as a credvault namespace file.
//! - **Version**: format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the entries JSON begins.
//! - **Header JSON**: serialized `NamespaceHeader`.
//! - **Entries JSON**: serialized `Vec<StoredEntry>`.
//! - **HMAC-SHA256**: 32-byte tag over header + entries bytes, keyed per
//!   namespace.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tempfile::NamedTempFile;

use crate::crypto::Argon2Params;
use crate::errors::{CredVaultError, Result};

/// Magic bytes at the start of every namespace file.
const MAGIC: &[u8; 4] = b"CVLT";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the file (SHA-256 = 32 bytes).
const HMAC_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

/// File name of the store header inside a store directory.
pub const STORE_HEADER_FILE: &str = "store.json";

/// Extension of namespace files.
const NAMESPACE_EXT: &str = "vault";

/// Extension of the per-namespace writer lock files.
const LOCK_EXT: &str = "lock";

// ---------------------------------------------------------------------------
// Store header
// ---------------------------------------------------------------------------

/// Store-wide metadata, written once by `FileStore::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHeader {
    /// Format version.
    pub version: u8,

    /// The salt used for Argon2id key derivation (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// Argon2 params used at creation, reused on every open.
    pub argon2_params: Argon2Params,

    /// When this store was created.
    pub created_at: DateTime<Utc>,

    /// HKDF-derived verifier; a wrong password produces a different one.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub verifier: Vec<u8>,
}

pub fn store_header_path(dir: &Path) -> PathBuf {
    dir.join(STORE_HEADER_FILE)
}

pub fn write_store_header(dir: &Path, header: &StoreHeader) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(header)
        .map_err(|e| CredVaultError::SerializationError(format!("store header: {e}")))?;
    atomic_write(&store_header_path(dir), &bytes)
}

pub fn read_store_header(dir: &Path) -> Result<StoreHeader> {
    let path = store_header_path(dir);
    if !path.exists() {
        return Err(CredVaultError::StoreNotFound(dir.to_path_buf()));
    }

    let bytes = fs::read(&path)?;
    let header: StoreHeader = serde_json::from_slice(&bytes)
        .map_err(|e| CredVaultError::InvalidStoreFormat(format!("store header: {e}")))?;

    if header.version != CURRENT_VERSION {
        return Err(CredVaultError::InvalidStoreFormat(format!(
            "unsupported store version {}, expected {CURRENT_VERSION}",
            header.version
        )));
    }

    Ok(header)
}

// ---------------------------------------------------------------------------
// Namespace files
// ---------------------------------------------------------------------------

/// Metadata stored at the beginning of a namespace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceHeader {
    pub version: u8,

    /// The namespace this file belongs to, checked on read.
    pub namespace: String,

    /// When any entry in this file last changed.
    pub updated_at: DateTime<Utc>,
}

/// One encrypted entry inside a namespace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: String,

    /// Nonce + ciphertext, base64 in JSON.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub encrypted_value: Vec<u8>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Path of the file backing `namespace` inside a store directory.
///
/// Namespaces are arbitrary strings, so the file name is their
/// URL-safe base64 encoding.
pub fn namespace_path(dir: &Path, namespace: &str) -> PathBuf {
    dir.join(format!(
        "{}.{NAMESPACE_EXT}",
        URL_SAFE_NO_PAD.encode(namespace.as_bytes())
    ))
}

/// Path of the advisory lock file guarding writes to `namespace`.
pub fn lock_path(dir: &Path, namespace: &str) -> PathBuf {
    dir.join(format!(
        "{}.{LOCK_EXT}",
        URL_SAFE_NO_PAD.encode(namespace.as_bytes())
    ))
}

/// Open (creating if needed) the lock file for `namespace`.
///
/// The file stays empty; only its advisory lock matters. It is never
/// removed, so every process locks the same inode.
pub fn open_lock_file(dir: &Path, namespace: &str) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).read(true).write(true).truncate(false);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    Ok(options.open(lock_path(dir, namespace))?)
}

/// Write a namespace file to disk **atomically**.
pub fn write_namespace_file(
    path: &Path,
    header: &NamespaceHeader,
    entries: &[StoredEntry],
    hmac_key: &[u8],
) -> Result<()> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| CredVaultError::SerializationError(format!("header: {e}")))?;
    let entries_bytes = serde_json::to_vec(entries)
        .map_err(|e| CredVaultError::SerializationError(format!("entries: {e}")))?;

    let hmac_tag = compute_hmac(hmac_key, &header_bytes, &entries_bytes)?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        CredVaultError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let total = PREFIX_LEN + header_bytes.len() + entries_bytes.len() + HMAC_LEN;
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&entries_bytes);
    buf.extend_from_slice(&hmac_tag);

    atomic_write(path, &buf)
}

/// Raw data read from a namespace file.
///
/// Keeps the original bytes so the HMAC is verified over exactly what
/// was written, with no re-serialization.
pub struct RawNamespaceFile {
    pub header: NamespaceHeader,
    pub entries: Vec<StoredEntry>,
    pub header_bytes: Vec<u8>,
    pub entries_bytes: Vec<u8>,
    pub stored_hmac: Vec<u8>,
}

/// Read a namespace file, or `None` if it does not exist.
///
/// The caller must verify the HMAC before trusting the parsed contents.
pub fn read_namespace_file(path: &Path) -> Result<Option<RawNamespaceFile>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if data.len() < PREFIX_LEN + HMAC_LEN {
        return Err(CredVaultError::InvalidStoreFormat(
            "file too small to be a namespace file".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(CredVaultError::InvalidStoreFormat(
            "missing CVLT magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(CredVaultError::InvalidStoreFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| CredVaultError::InvalidStoreFormat("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        CredVaultError::InvalidStoreFormat(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN + header_len;
    if header_end + HMAC_LEN > data.len() {
        return Err(CredVaultError::InvalidStoreFormat(
            "header length exceeds file size".into(),
        ));
    }

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let entries_end = data.len() - HMAC_LEN;
    let entries_bytes = data[header_end..entries_end].to_vec();
    let stored_hmac = data[entries_end..].to_vec();

    let header: NamespaceHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| CredVaultError::InvalidStoreFormat(format!("header JSON: {e}")))?;

    let entries: Vec<StoredEntry> = serde_json::from_slice(&entries_bytes)
        .map_err(|e| CredVaultError::InvalidStoreFormat(format!("entries JSON: {e}")))?;

    Ok(Some(RawNamespaceFile {
        header,
        entries,
        header_bytes,
        entries_bytes,
        stored_hmac,
    }))
}

/// Remove a namespace file. Returns whether it existed.
pub fn remove_namespace_file(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Compute HMAC-SHA256 over header + entries bytes.
pub fn compute_hmac(hmac_key: &[u8], header_bytes: &[u8], entries_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| CredVaultError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(entries_bytes);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify the HMAC in constant time.
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    entries_bytes: &[u8],
    expected_hmac: &[u8],
) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| CredVaultError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(entries_bytes);

    mac.verify_slice(expected_hmac)
        .map_err(|_| CredVaultError::HmacMismatch)
}

/// Write `bytes` to a fresh temp file next to `path`, then rename it over
/// `path`.
///
/// Readers see either the old file or the new one, never a partial write,
/// and a failed write leaves the old file untouched. Every call stages in
/// its own uniquely named temp file, so concurrent writers never share one.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));

    // NamedTempFile is created 0600 and removed again if we bail out early.
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HMAC_KEY: [u8; 32] = [9u8; 32];

    fn sample() -> (NamespaceHeader, Vec<StoredEntry>) {
        let now = Utc::now();
        let header = NamespaceHeader {
            version: CURRENT_VERSION,
            namespace: "svc".into(),
            updated_at: now,
        };
        let entries = vec![StoredEntry {
            key: "token".into(),
            encrypted_value: vec![1, 2, 3],
            created_at: now,
            updated_at: now,
        }];
        (header, entries)
    }

    #[test]
    fn namespace_paths_are_filesystem_safe() {
        let dir = Path::new("/tmp/store");
        let path = namespace_path(dir, "../../etc/passwd");
        assert_eq!(path.parent(), Some(dir));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(".vault"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn write_then_read_verifies() {
        let tmp = TempDir::new().unwrap();
        let path = namespace_path(tmp.path(), "svc");
        let (header, entries) = sample();
        write_namespace_file(&path, &header, &entries, &HMAC_KEY).unwrap();

        let raw = read_namespace_file(&path).unwrap().unwrap();
        verify_hmac(&HMAC_KEY, &raw.header_bytes, &raw.entries_bytes, &raw.stored_hmac).unwrap();
        assert_eq!(raw.header.namespace, "svc");
        assert_eq!(raw.entries[0].encrypted_value, vec![1, 2, 3]);
    }

    #[test]
    fn rewrites_leave_no_staging_files() {
        let tmp = TempDir::new().unwrap();
        let path = namespace_path(tmp.path(), "svc");
        let (header, entries) = sample();
        for _ in 0..3 {
            write_namespace_file(&path, &header, &entries, &HMAC_KEY).unwrap();
        }

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![path.file_name().unwrap().to_os_string()]);
    }

    #[test]
    fn lock_file_sits_beside_namespace_file() {
        let tmp = TempDir::new().unwrap();
        let lock = lock_path(tmp.path(), "svc");
        assert_ne!(lock, namespace_path(tmp.path(), "svc"));
        assert_eq!(lock.file_stem(), namespace_path(tmp.path(), "svc").file_stem());

        open_lock_file(tmp.path(), "svc").unwrap();
        open_lock_file(tmp.path(), "svc").unwrap();
        assert!(lock.exists());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let path = namespace_path(tmp.path(), "nothing-here");
        assert!(read_namespace_file(&path).unwrap().is_none());
    }

    #[test]
    fn wrong_hmac_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = namespace_path(tmp.path(), "svc");
        let (header, entries) = sample();
        write_namespace_file(&path, &header, &entries, &HMAC_KEY).unwrap();

        let raw = read_namespace_file(&path).unwrap().unwrap();
        let result = verify_hmac(&[1u8; 32], &raw.header_bytes, &raw.entries_bytes, &raw.stored_hmac);
        assert!(matches!(result, Err(CredVaultError::HmacMismatch)));
    }

    #[test]
    fn garbage_file_is_invalid_format() {
        let tmp = TempDir::new().unwrap();
        let path = namespace_path(tmp.path(), "svc");
        fs::write(&path, vec![0u8; 64]).unwrap();
        assert!(matches!(
            read_namespace_file(&path),
            Err(CredVaultError::InvalidStoreFormat(_))
        ));
    }

    #[test]
    fn store_header_requires_file() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            read_store_header(tmp.path()),
            Err(CredVaultError::StoreNotFound(_))
        ));
    }
}
