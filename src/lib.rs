pub mod backend;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod vault;

pub use backend::BackingStore;
pub use errors::{CredVaultError, ErrorKind, Result};
pub use vault::{Entry, Namespace, SecretKey, Vault};
