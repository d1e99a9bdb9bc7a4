//! Endpoint paths of the services under test and the local helper.

/// Identity issuer token endpoint, relative to the issuer URL.
pub const OIDC_TOKEN: &str = "/protocol/openid-connect/token";

/// Fulcio certificate issuance.
pub const FULCIO_SIGNING_CERT: &str = "/api/v1/signingCert";

/// Rekor entry creation; entries are fetched at `{LOG_ENTRIES}/{uuid}`.
pub const REKOR_LOG_ENTRIES: &str = "/api/v1/log/entries";

/// Timestamp authority certificate chain.
pub const TSA_CERT_CHAIN: &str = "/certchain";

/// Helper: pre-generated signing material.
pub const HELPER_GENERATE_PAYLOADS: &str = "/generate-payloads";

/// Helper: timestamp token for a raw signature.
pub const HELPER_GET_TIMESTAMP: &str = "/get-timestamp";

/// Helper: error report sink.
pub const HELPER_REPORT_ERROR: &str = "/report-error";

/// Join a base URL and an absolute path without doubling the separator.
pub fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// URL of a single log entry.
pub fn log_entry(rekor_url: &str, uuid: &str) -> String {
    format!("{}/{}", join(rekor_url, REKOR_LOG_ENTRIES), uuid)
}
