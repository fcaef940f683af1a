//! Decoding of bridge requests.
//!
//! Requests arrive as loosely-typed JSON objects. They are decoded exactly
//! once here into a `Request` variant whose fields are already validated,
//! so nothing malformed reaches the vault.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::{CredVaultError, Result};
use crate::vault::{Namespace, SecretKey};

/// The operations a bridge caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    List,
    Set,
    Delete,
    Clear,
}

impl Operation {
    /// Resolve an operation name, including the legacy keychain channel
    /// method names. Unknown names are `NotImplemented`.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "get" | "getKeychain" => Ok(Operation::Get),
            "list" | "getKeychainAll" => Ok(Operation::List),
            "set" | "setKeychain" => Ok(Operation::Set),
            "delete" | "deleteKeychain" => Ok(Operation::Delete),
            "clear" => Ok(Operation::Clear),
            other => Err(CredVaultError::NotImplemented(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Set => "set",
            Operation::Delete => "delete",
            Operation::Clear => "clear",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully validated call into the vault.
#[derive(Clone, PartialEq, Eq)]
pub enum Request {
    Get {
        namespace: Namespace,
        key: SecretKey,
    },
    List {
        namespace: Namespace,
    },
    Set {
        namespace: Namespace,
        key: SecretKey,
        value: Vec<u8>,
    },
    Delete {
        namespace: Namespace,
        key: SecretKey,
    },
    Clear {
        namespace: Namespace,
    },
}

// Argument sets reject fields their operation does not take.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NamespaceArgs {
    #[serde(rename = "operation")]
    _operation: IgnoredAny,
    #[serde(alias = "serviceName")]
    namespace: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyArgs {
    #[serde(rename = "operation")]
    _operation: IgnoredAny,
    #[serde(alias = "serviceName")]
    namespace: String,
    #[serde(alias = "keychainKey")]
    key: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SetArgs {
    #[serde(rename = "operation")]
    _operation: IgnoredAny,
    #[serde(alias = "serviceName")]
    namespace: String,
    #[serde(alias = "keychainKey")]
    key: String,
    #[serde(alias = "authDataUnit8List", deserialize_with = "wire_bytes")]
    value: Vec<u8>,
}

/// Byte payloads may be sent as base64 text or as a plain array of bytes.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireBytes {
    Base64(String),
    Raw(Vec<u8>),
}

fn wire_bytes<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match WireBytes::deserialize(deserializer)? {
        WireBytes::Base64(text) => BASE64.decode(text).map_err(serde::de::Error::custom),
        WireBytes::Raw(bytes) => Ok(bytes),
    }
}

impl Request {
    /// Decode and validate a JSON request.
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let doc: Value = serde_json::from_slice(raw)
            .map_err(|e| CredVaultError::InvalidArguments(format!("malformed request: {e}")))?;
        Self::from_value(doc)
    }

    /// Validate an already-parsed JSON request.
    pub fn from_value(doc: Value) -> Result<Self> {
        let operation = match doc.get("operation") {
            Some(Value::String(name)) => Operation::parse(name)?,
            Some(_) => return Err(invalid("`operation` must be a string")),
            None if doc.is_object() => return Err(invalid("missing field `operation`")),
            None => return Err(invalid("request must be a JSON object")),
        };

        match operation {
            Operation::Get => {
                let args: KeyArgs = decode(doc)?;
                Ok(Request::Get {
                    namespace: Namespace::new(args.namespace)?,
                    key: SecretKey::new(args.key)?,
                })
            }
            Operation::List => {
                let args: NamespaceArgs = decode(doc)?;
                Ok(Request::List {
                    namespace: Namespace::new(args.namespace)?,
                })
            }
            Operation::Set => {
                let args: SetArgs = decode(doc)?;
                Ok(Request::Set {
                    namespace: Namespace::new(args.namespace)?,
                    key: SecretKey::new(args.key)?,
                    value: args.value,
                })
            }
            Operation::Delete => {
                let args: KeyArgs = decode(doc)?;
                Ok(Request::Delete {
                    namespace: Namespace::new(args.namespace)?,
                    key: SecretKey::new(args.key)?,
                })
            }
            Operation::Clear => {
                let args: NamespaceArgs = decode(doc)?;
                Ok(Request::Clear {
                    namespace: Namespace::new(args.namespace)?,
                })
            }
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Request::Get { .. } => Operation::Get,
            Request::List { .. } => Operation::List,
            Request::Set { .. } => Operation::Set,
            Request::Delete { .. } => Operation::Delete,
            Request::Clear { .. } => Operation::Clear,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        match self {
            Request::Get { namespace, .. }
            | Request::List { namespace }
            | Request::Set { namespace, .. }
            | Request::Delete { namespace, .. }
            | Request::Clear { namespace } => namespace,
        }
    }
}

// Set requests carry secret bytes; keep them out of logs.
impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Request");
        out.field("operation", &self.operation())
            .field("namespace", self.namespace());
        match self {
            Request::Get { key, .. } | Request::Delete { key, .. } => {
                out.field("key", key);
            }
            Request::Set { key, value, .. } => {
                out.field("key", key).field("value_len", &value.len());
            }
            Request::List { .. } | Request::Clear { .. } => {}
        }
        out.finish()
    }
}

fn decode<T: for<'de> Deserialize<'de>>(doc: Value) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| CredVaultError::InvalidArguments(e.to_string()))
}

fn invalid(message: &str) -> CredVaultError {
    CredVaultError::InvalidArguments(message.to_string())
}
