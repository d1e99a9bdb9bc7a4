//! Rekor proposed entries and log entry decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::fulcio::{Content, IssuedCertificate};

/// API version of both supported entry kinds.
pub const ENTRY_API_VERSION: &str = "0.0.1";

/// Hash algorithm of the artifact digests produced by the helper.
pub const HASH_ALGORITHM: &str = "sha256";

/// Body of `POST /api/v1/log/entries`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum ProposedEntry {
    #[serde(rename = "hashedrekord")]
    HashedRekord {
        #[serde(rename = "apiVersion")]
        api_version: &'static str,
        spec: HashedRekordSpec,
    },
    #[serde(rename = "rfc3161")]
    Rfc3161 {
        #[serde(rename = "apiVersion")]
        api_version: &'static str,
        spec: Rfc3161Spec,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct HashedRekordSpec {
    pub signature: HashedRekordSignature,
    pub data: HashedRekordData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashedRekordSignature {
    pub content: String,
    pub public_key: Content,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashedRekordData {
    pub hash: HashValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashValue {
    pub algorithm: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rfc3161Spec {
    pub tsr: Content,
}

impl ProposedEntry {
    /// A signature over an artifact digest, verified by the issued certificate.
    pub fn hashed_rekord(
        signature_base64: &str,
        certificate: &IssuedCertificate,
        artifact_hash: &str,
    ) -> Self {
        ProposedEntry::HashedRekord {
            api_version: ENTRY_API_VERSION,
            spec: HashedRekordSpec {
                signature: HashedRekordSignature {
                    content: signature_base64.to_string(),
                    public_key: Content::new(certificate.to_base64()),
                },
                data: HashedRekordData {
                    hash: HashValue {
                        algorithm: HASH_ALGORITHM,
                        value: artifact_hash.to_string(),
                    },
                },
            },
        }
    }

    /// An RFC 3161 timestamp response.
    pub fn rfc3161(timestamp_token: &[u8]) -> Self {
        ProposedEntry::Rfc3161 {
            api_version: ENTRY_API_VERSION,
            spec: Rfc3161Spec {
                tsr: Content::new(STANDARD.encode(timestamp_token)),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProposedEntry::HashedRekord { .. } => "hashedrekord",
            ProposedEntry::Rfc3161 { .. } => "rfc3161",
        }
    }
}

/// Entry identifier from a `Location` header: its last path segment.
pub fn entry_uuid_from_location(location: &str) -> Option<&str> {
    location
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// Look up an entry in a fetch response, which is keyed by entry identifier.
///
/// Returns `None` when the response is not a JSON object or lacks the key.
pub fn lookup_entry<'a>(response: &'a Value, uuid: &str) -> Option<&'a Value> {
    response.as_object()?.get(uuid)
}

/// Decode an entry's base64 `body` into JSON.
pub fn decode_entry_body(entry: &Value) -> Result<DecodedLogEntry, DecodeError> {
    let body = entry
        .get("body")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingBody)?;
    let bytes = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
    let value = serde_json::from_str(&text).map_err(|e| DecodeError::Json(e.to_string()))?;
    Ok(DecodedLogEntry(value))
}

/// The decoded body of a log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLogEntry(Value);

impl DecodedLogEntry {
    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(Value::as_str)
    }

    /// The `spec.signature` block, if present and non-empty.
    pub fn signature(&self) -> Option<&Value> {
        self.0
            .get("spec")
            .and_then(|spec| spec.get("signature"))
            .filter(|signature| is_present(signature))
    }

    pub fn require_signature(&self) -> Result<&Value, DecodeError> {
        self.signature().ok_or(DecodeError::MissingSignature)
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Array(_) | Value::Object(_) => true,
    }
}
