//! Namespace, key and entry types handled by the vault.
//!
//! `Namespace` and `SecretKey` are validated once at construction, so the
//! vault core and every backing store only ever see well-formed names.

use std::fmt;
use std::str::FromStr;

use crate::errors::{CredVaultError, Result};

/// Longest namespace accepted, in bytes.
///
/// The file store turns a namespace into a file name, which keeps this
/// well under common 255-byte file name limits once base64-encoded.
pub const MAX_NAMESPACE_LEN: usize = 128;

/// Longest key accepted, in bytes.
pub const MAX_KEY_LEN: usize = 1024;

/// An isolated secret collection (the `serviceName` of a keychain item).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("namespace", &name, MAX_NAMESPACE_LEN)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The name of a secret inside a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("key", &name, MAX_KEY_LEN)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reject empty, oversized, or control-character names.
fn validate_name(what: &str, name: &str, max_len: usize) -> Result<()> {
    if name.is_empty() {
        return Err(CredVaultError::InvalidArguments(format!(
            "{what} cannot be empty"
        )));
    }
    if name.len() > max_len {
        return Err(CredVaultError::InvalidArguments(format!(
            "{what} cannot exceed {max_len} bytes"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(CredVaultError::InvalidArguments(format!(
            "{what} '{}' contains control characters",
            name.escape_debug()
        )));
    }
    Ok(())
}

macro_rules! name_conversions {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $ty {
            type Err = CredVaultError;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = CredVaultError;

            fn try_from(s: String) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = CredVaultError;

            fn try_from(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }
    };
}

name_conversions!(Namespace);
name_conversions!(SecretKey);

/// A single secret: its key and an owned copy of its value.
#[derive(Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// Values never show up in logs or panic messages.
impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .finish()
    }
}
