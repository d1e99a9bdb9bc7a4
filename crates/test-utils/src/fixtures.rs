//! Common test fixtures for tas-perf tests.
//!
//! The values are syntactically shaped like the real services' output but
//! carry no real cryptographic material.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};

/// Identifier used by the default log entry responses.
pub const ENTRY_UUID: &str = "abc-123";

/// Location header returned by the default entry creation response.
pub const ENTRY_LOCATION: &str = "http://log/api/v1/log/entries/abc-123";

/// Access token issued by the default token response.
pub const ACCESS_TOKEN: &str = "tok1";

/// Leaf certificate returned first in the default issuance chain.
pub const LEAF_CERT_PEM: &str = "-----BEGIN CERTIFICATE-----\n\
MIICnzCCAiSgAwIBAgIUbGVhZi1jZXJ0aWZpY2F0ZS1mb3ItdGVzdHMwCgYIKoZI\n\
zj0EAwMwKjEVMBMGA1UEChMMc2lnc3RvcmUuZGV2MREwDwYDVQQDEwhzaWdzdG9y\n\
-----END CERTIFICATE-----";

/// Intermediate certificate of the default issuance chain.
pub const CHAIN_CERT_PEM: &str = "-----BEGIN CERTIFICATE-----\n\
MIIB9zCCAXygAwIBAgIUaW50ZXJtZWRpYXRlLWZvci10ZXN0czAKBggqhkjOPQQD\n\
-----END CERTIFICATE-----";

/// Raw timestamp token returned by the default helper response.
pub const TIMESTAMP_TOKEN: &[u8] = &[0x30, 0x82, 0x01, 0x0a, 0x02, 0x01, 0x00];

/// Issuance response body: the leaf followed by its chain.
pub fn fulcio_chain_body() -> String {
    format!("{LEAF_CERT_PEM}\n{CHAIN_CERT_PEM}\n")
}

/// Helper payload with every field populated.
pub fn crypto_bundle_json() -> Value {
    json!({
        "publicKeyBase64": STANDARD.encode("-----BEGIN PUBLIC KEY-----\nMFkw\n-----END PUBLIC KEY-----"),
        "signedEmailAddress": "MEUCIQDsignedemail",
        "artifactHash": "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        "artifactSignature": STANDARD.encode([0xde, 0xad, 0xbe, 0xef]),
    })
}

/// Helper payload whose artifact signature is empty.
pub fn crypto_bundle_without_signature() -> Value {
    let mut bundle = crypto_bundle_json();
    bundle["artifactSignature"] = json!("");
    bundle
}

/// Decoded body of a `hashedrekord` entry.
pub fn hashedrekord_body() -> Value {
    json!({
        "apiVersion": "0.0.1",
        "kind": "hashedrekord",
        "spec": {
            "signature": {
                "content": "3q2+7w==",
                "publicKey": {"content": STANDARD.encode(LEAF_CERT_PEM)}
            },
            "data": {"hash": {"algorithm": "sha256", "value": "e3b0c442"}}
        }
    })
}

/// Base64 of a JSON value's serialization, as Rekor encodes entry bodies.
pub fn encode_entry_body(body: &Value) -> String {
    STANDARD.encode(body.to_string())
}

/// A fetch response keyed by `uuid` whose entry carries `encoded_body`.
pub fn log_entry_response(uuid: &str, encoded_body: &str) -> Value {
    let mut response = Map::new();
    response.insert(
        uuid.to_string(),
        json!({
            "body": encoded_body,
            "integratedTime": 1_700_000_000,
            "logID": "c0d23d6ad406973f9559f3ba2d1ca01f84147d8ffc5b8445c224f98b9591801d",
            "logIndex": 42
        }),
    );
    Value::Object(response)
}
