//! Fulcio signing-certificate request and response handling.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// `{"content": ...}` wrapper used by both Fulcio and Rekor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub content: String,
}

impl Content {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Body of `POST /api/v1/signingCert`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningCertRequest {
    pub public_key: Content,
    pub signed_email_address: String,
}

impl SigningCertRequest {
    pub fn new(public_key_base64: &str, signed_email_address: &str) -> Self {
        Self {
            public_key: Content::new(public_key_base64),
            signed_email_address: signed_email_address.to_string(),
        }
    }
}

/// Return the first certificate PEM block in `body`, delimiters included.
///
/// The block is returned byte-for-byte as it appears in the body; at least
/// one character must separate the two delimiters.
pub fn extract_certificate_pem(body: &str) -> Option<&str> {
    let start = body.find(PEM_BEGIN)?;
    let after = start + PEM_BEGIN.len();
    let search_from = after + body[after..].chars().next()?.len_utf8();
    let end = search_from + body[search_from..].find(PEM_END)? + PEM_END.len();
    Some(&body[start..end])
}

/// A certificate extracted from an issuance response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    pem: String,
}

impl IssuedCertificate {
    /// Extract the leaf certificate from a Fulcio response body.
    pub fn from_response_body(body: &str) -> Option<Self> {
        extract_certificate_pem(body).map(|pem| Self {
            pem: pem.to_string(),
        })
    }

    /// Standard base64 of the PEM text, as Rekor expects it.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.pem.as_bytes())
    }
}
