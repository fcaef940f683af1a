//! Key derivation helpers using HKDF-SHA256.
//!
//! From a single master key we derive:
//! - A unique **per-entry** encryption key for each `(namespace, key)`.
//! - A **per-namespace** HMAC key for namespace file integrity.
//! - A **verifier** that lets the store reject a wrong password up front.
//!
//! HKDF (RFC 5869) uses the master key as input keying material (IKM)
//! and a context string (`info`) to produce independent sub-keys.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{CredVaultError, Result};

/// Length of derived sub-keys (256 bits).
const KEY_LEN: usize = 32;

/// Derive a per-entry encryption key.
///
/// The namespace is length-prefixed in `info` so that no two distinct
/// `(namespace, key)` pairs can produce the same context string.
pub fn derive_entry_key(master_key: &[u8], namespace: &str, key: &str) -> Result<[u8; KEY_LEN]> {
    let info = format!("credvault-entry:{}:{namespace}:{key}", namespace.len());
    hkdf_derive(master_key, info.as_bytes())
}

/// Derive the HMAC key protecting one namespace file.
///
/// Binding the key to the namespace means a file copied over another
/// namespace's file fails verification.
pub fn derive_hmac_key(master_key: &[u8], namespace: &str) -> Result<[u8; KEY_LEN]> {
    let info = format!("credvault-hmac:{namespace}");
    hkdf_derive(master_key, info.as_bytes())
}

/// Derive the password verifier stored in the store header.
pub fn derive_verifier(master_key: &[u8]) -> Result<[u8; KEY_LEN]> {
    hkdf_derive(master_key, b"credvault-verifier")
}

/// Run HKDF-SHA256 (extract with an all-zero salt, then expand) with the
/// given `info`.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte master key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn derive_entry_key(&self, namespace: &str, key: &str) -> Result<[u8; KEY_LEN]> {
        derive_entry_key(&self.bytes, namespace, key)
    }

    pub fn derive_hmac_key(&self, namespace: &str) -> Result<[u8; KEY_LEN]> {
        derive_hmac_key(&self.bytes, namespace)
    }

    pub fn derive_verifier(&self) -> Result<[u8; KEY_LEN]> {
        derive_verifier(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: [u8; 32] = [0x42; 32];

    #[test]
    fn entry_keys_differ_per_namespace() {
        let a = derive_entry_key(&MASTER, "app.one", "token").unwrap();
        let b = derive_entry_key(&MASTER, "app.two", "token").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn entry_keys_resist_separator_ambiguity() {
        let a = derive_entry_key(&MASTER, "a:b", "c").unwrap();
        let b = derive_entry_key(&MASTER, "a", "b:c").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hmac_and_verifier_keys_are_independent() {
        let hmac = derive_hmac_key(&MASTER, "svc").unwrap();
        let verifier = derive_verifier(&MASTER).unwrap();
        assert_ne!(hmac, verifier);
    }

    #[test]
    fn master_key_wrapper_matches_free_functions() {
        let master = MasterKey::new(MASTER);
        assert_eq!(
            master.derive_entry_key("svc", "k").unwrap(),
            derive_entry_key(&MASTER, "svc", "k").unwrap()
        );
        assert_eq!(
            master.derive_verifier().unwrap(),
            derive_verifier(&MASTER).unwrap()
        );
    }

    #[test]
    fn derivation_is_hkdf_with_zero_salt() {
        let hk = Hkdf::<Sha256>::new(Some(&[0u8; 32]), &MASTER);
        let mut expected = [0u8; KEY_LEN];
        hk.expand(b"credvault-verifier", &mut expected).unwrap();
        assert_eq!(derive_verifier(&MASTER).unwrap(), expected);
    }
}
