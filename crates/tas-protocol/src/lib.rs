//! Wire types and response validators for the artifact-signing stack.
//!
//! Covers:
//! - OIDC password-grant token exchange
//! - Fulcio signing-certificate requests and PEM extraction
//! - Rekor proposed entries (`hashedrekord`, `rfc3161`) and entry decoding
//! - The local helper's crypto bundle
//!
//! Nothing in this crate performs network I/O.

pub mod endpoints;
pub mod error;
pub mod fulcio;
pub mod helper;
pub mod oidc;
pub mod rekor;

pub use error::{Component, DecodeError, FailureClass, TasError, TasResult};
pub use fulcio::{extract_certificate_pem, IssuedCertificate, SigningCertRequest};
pub use helper::CryptoBundle;
pub use oidc::{PasswordGrant, TokenResponse};
pub use rekor::{
    decode_entry_body, entry_uuid_from_location, lookup_entry, DecodedLogEntry, ProposedEntry,
};
