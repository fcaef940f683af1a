//! Cryptographic primitives for the encrypted file store.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - HKDF-based per-entry key, HMAC key and verifier derivation (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_master_key_with_params, generate_salt, Argon2Params};
pub use keys::MasterKey;
