//! Structured request/response boundary in front of the vault.
//!
//! A caller hands in one JSON request and always gets back exactly one
//! `Response`, success or error. Malformed input never reaches the vault.

pub mod request;
pub mod response;

pub use request::{Operation, Request};
pub use response::{Payload, Response, WireEntry};

use tracing::debug;

use crate::backend::BackingStore;
use crate::errors::Result;
use crate::vault::Vault;

/// Run an already-validated request against the vault.
pub fn execute<S: BackingStore>(vault: &Vault<S>, request: Request) -> Result<Payload> {
    match request {
        Request::Get { namespace, key } => vault
            .get(&namespace, &key)
            .map(|value| Payload::Value { value }),
        Request::List { namespace } => vault.list(&namespace).map(Payload::entries),
        Request::Set {
            namespace,
            key,
            value,
        } => vault
            .set(&namespace, &key, &value)
            .map(|value| Payload::Stored { value }),
        Request::Delete { namespace, key } => {
            vault.delete(&namespace, &key).map(|()| Payload::Deleted)
        }
        Request::Clear { namespace } => vault
            .clear(&namespace)
            .map(|removed| Payload::Cleared { removed }),
    }
}

/// Decode one raw request, run it, and produce its response.
pub fn handle<S: BackingStore>(vault: &Vault<S>, raw: &[u8]) -> Response {
    let result = Request::from_json(raw).and_then(|request| {
        debug!(?request, "Bridge request");
        execute(vault, request)
    });
    if let Err(e) = &result {
        debug!(kind = %e.kind(), error = %e, "Bridge request failed");
    }
    Response::from(result)
}
