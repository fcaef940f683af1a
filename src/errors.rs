use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors that can occur in credvault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Boundary errors ---
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Operation '{0}' is not implemented")]
    NotImplemented(String),

    // --- Vault errors ---
    #[error("Secret '{key}' not found in namespace '{namespace}'")]
    NotFound { namespace: String, key: String },

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- File store errors ---
    #[error("Store not initialized at {0} (run `credvault init`)")]
    StoreNotFound(PathBuf),

    #[error("Store already exists at {0}")]
    StoreAlreadyExists(PathBuf),

    #[error("Invalid store format: {0}")]
    InvalidStoreFormat(String),

    #[error("HMAC verification failed — namespace file may be tampered")]
    HmacMismatch,

    #[error("HMAC error: {0}")]
    HmacError(String),

    // --- Keyring errors ---
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Generic backing store failure ---
    #[error("Backing store error: {0}")]
    Backend(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// The externally observable error categories.
///
/// Every `CredVaultError` maps onto exactly one kind; the kind plus the
/// error's display message is what the bridge reports to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArguments,
    NotFound,
    BackingStoreError,
    NotImplemented,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArguments => "InvalidArguments",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::BackingStoreError => "BackingStoreError",
            ErrorKind::NotImplemented => "NotImplemented",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CredVaultError {
    /// Classify this error for callers on the other side of the bridge.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CredVaultError::InvalidArguments(_) | CredVaultError::CommandFailed(_) => {
                ErrorKind::InvalidArguments
            }
            CredVaultError::NotImplemented(_) => ErrorKind::NotImplemented,
            CredVaultError::NotFound { .. } => ErrorKind::NotFound,
            CredVaultError::EncryptionFailed(_)
            | CredVaultError::DecryptionFailed
            | CredVaultError::KeyDerivationFailed(_)
            | CredVaultError::StoreNotFound(_)
            | CredVaultError::StoreAlreadyExists(_)
            | CredVaultError::InvalidStoreFormat(_)
            | CredVaultError::HmacMismatch
            | CredVaultError::HmacError(_)
            | CredVaultError::KeyringError(_)
            | CredVaultError::Backend(_)
            | CredVaultError::ConfigError(_)
            | CredVaultError::Io(_)
            | CredVaultError::SerializationError(_) => ErrorKind::BackingStoreError,
        }
    }
}

/// Convenience type alias for credvault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_are_backing_store_errors() {
        let io = CredVaultError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(io.kind(), ErrorKind::BackingStoreError);
        assert_eq!(CredVaultError::HmacMismatch.kind(), ErrorKind::BackingStoreError);
        assert_eq!(
            CredVaultError::KeyringError("locked".into()).kind(),
            ErrorKind::BackingStoreError
        );
    }

    #[test]
    fn cli_failures_are_invalid_arguments() {
        let err = CredVaultError::CommandFailed("password prompt: interrupted".into());
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    }

    #[test]
    fn not_found_names_namespace_and_key() {
        let err = CredVaultError::NotFound {
            namespace: "com.example".into(),
            key: "token".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "Secret 'token' not found in namespace 'com.example'"
        );
    }

    #[test]
    fn kind_serializes_as_its_name() {
        let json = serde_json::to_string(&ErrorKind::BackingStoreError).unwrap();
        assert_eq!(json, "\"BackingStoreError\"");
        assert_eq!(ErrorKind::NotImplemented.to_string(), "NotImplemented");
    }
}
