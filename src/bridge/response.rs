use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::format::{base64_decode, base64_encode};
use crate::errors::{CredVaultError, ErrorKind, Result};
use crate::vault::Entry;

/// One `(key, value)` pair in a `list` result.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub key: String,
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub value: Vec<u8>,
}

impl From<Entry> for WireEntry {
    fn from(entry: Entry) -> Self {
        Self {
            key: entry.key,
            value: entry.value,
        }
    }
}

impl fmt::Debug for WireEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireEntry")
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .finish()
    }
}

/// The result of a successful operation, tagged by shape.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    /// `get`: the stored bytes.
    Value {
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
        value: Vec<u8>,
    },
    /// `list`: every entry in the namespace.
    Entries { entries: Vec<WireEntry> },
    /// `set`: the value now stored.
    Stored {
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
        value: Vec<u8>,
    },
    /// `delete`: nothing to return.
    Deleted,
    /// `clear`: how many entries were removed.
    Cleared { removed: usize },
}

impl Payload {
    pub fn entries(entries: Vec<Entry>) -> Self {
        Payload::Entries {
            entries: entries.into_iter().map(WireEntry::from).collect(),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Value { value } => f
                .debug_struct("Value")
                .field("value_len", &value.len())
                .finish(),
            Payload::Entries { entries } => f.debug_struct("Entries").field("entries", entries).finish(),
            Payload::Stored { value } => f
                .debug_struct("Stored")
                .field("value_len", &value.len())
                .finish(),
            Payload::Deleted => f.write_str("Deleted"),
            Payload::Cleared { removed } => {
                f.debug_struct("Cleared").field("removed", removed).finish()
            }
        }
    }
}

/// Exactly one of these is produced for every request.
///
/// ```json
/// {"status":"ok","result":{"type":"value","value":"c2VjcmV0"}}
/// {"status":"error","kind":"NotFound","message":"Secret 'k' not found in namespace 'svc'"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok { result: Payload },
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn ok(result: Payload) -> Self {
        Response::Ok { result }
    }

    pub fn error(err: &CredVaultError) -> Self {
        Response::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }

    /// The error kind, if this is an error response.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Response::Ok { .. } => None,
            Response::Error { kind, .. } => Some(*kind),
        }
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> String {
        match serde_json::to_string(self) {
            Ok(line) => line,
            // Only reachable if a payload refuses to serialize; the caller
            // still gets exactly one well-formed line.
            Err(e) => serde_json::json!({
                "status": "error",
                "kind": ErrorKind::BackingStoreError,
                "message": format!("failed to encode response: {e}"),
            })
            .to_string(),
        }
    }
}

impl From<Result<Payload>> for Response {
    fn from(result: Result<Payload>) -> Self {
        match result {
            Ok(payload) => Response::ok(payload),
            Err(e) => Response::error(&e),
        }
    }
}
