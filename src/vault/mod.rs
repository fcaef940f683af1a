//! Vault module — the credential vault core.
//!
//! This module provides:
//! - `Namespace`, `SecretKey` and `Entry` types (`entry`)
//! - Named lock slots used for per-entry locking (`locks`)
//! - `Vault`, the namespaced get/list/set/delete surface (`store`)

pub mod entry;
pub(crate) mod locks;
pub mod store;

pub use entry::{Entry, Namespace, SecretKey};
pub use store::Vault;
