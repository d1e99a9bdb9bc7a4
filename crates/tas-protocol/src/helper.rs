//! Pre-generated signing material served by the local helper.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One iteration's worth of signing material.
///
/// Every field is opaque to this crate except `artifact_signature`, which is
/// base64 and is decoded before requesting a timestamp for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoBundle {
    pub public_key_base64: String,
    pub signed_email_address: String,
    pub artifact_hash: String,
    #[serde(default)]
    pub artifact_signature: String,
}

impl CryptoBundle {
    /// Whether a signature is available for the timestamp workflow.
    pub fn has_signature(&self) -> bool {
        !self.artifact_signature.is_empty()
    }

    /// Raw signature bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.artifact_signature.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_helper_payload() {
        let json = r#"{
            "publicKeyBase64": "LS0tLS1CRUdJTg==",
            "signedEmailAddress": "MEUCIQ==",
            "artifactHash": "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            "artifactSignature": "3q2+7w=="
        }"#;
        let bundle: CryptoBundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.signed_email_address, "MEUCIQ==");
        assert!(bundle.has_signature());
        assert_eq!(bundle.signature_bytes().unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_missing_signature_defaults_to_empty() {
        let json = r#"{"publicKeyBase64":"a","signedEmailAddress":"b","artifactHash":"c"}"#;
        let bundle: CryptoBundle = serde_json::from_str(json).unwrap();
        assert!(!bundle.has_signature());
    }

    #[test]
    fn test_invalid_signature_encoding() {
        let bundle = CryptoBundle {
            public_key_base64: "a".into(),
            signed_email_address: "b".into(),
            artifact_hash: "c".into(),
            artifact_signature: "not base64!".into(),
        };
        assert!(bundle.signature_bytes().is_err());
    }
}
