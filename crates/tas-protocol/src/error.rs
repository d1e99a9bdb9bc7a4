//! Error types for the signing workload.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using TasError.
pub type TasResult<T> = Result<T, TasError>;

/// A service under test that a failure can be attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Fulcio,
    Rekor,
    Tsa,
}

impl Component {
    /// Name used in error reports and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Fulcio => "fulcio",
            Component::Rekor => "rekor",
            Component::Tsa => "tsa",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary error type for workload iterations and setup.
#[derive(Debug, Error)]
pub enum TasError {
    /// The run cannot start; no iteration may contact the services.
    #[error("Setup failed: {0}")]
    Setup(String),

    /// Local helper material is unavailable. Fatal to one iteration, never reported.
    #[error("Prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    /// A service under test answered with an unexpected status or payload.
    #[error("{component} assertion failed: {message}")]
    ServiceAssertion {
        component: Component,
        message: String,
    },

    /// A fetched payload could not be decoded.
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl TasError {
    pub fn setup(message: impl Into<String>) -> Self {
        TasError::Setup(message.into())
    }

    pub fn prerequisite(message: impl Into<String>) -> Self {
        TasError::PrerequisiteMissing(message.into())
    }

    pub fn service(component: Component, message: impl Into<String>) -> Self {
        TasError::ServiceAssertion {
            component,
            message: message.into(),
        }
    }

    /// Classification used for aggregate metrics.
    pub fn class(&self) -> FailureClass {
        match self {
            TasError::Setup(_) => FailureClass::Setup,
            TasError::PrerequisiteMissing(_) => FailureClass::PrerequisiteMissing,
            TasError::ServiceAssertion { .. } => FailureClass::ServiceAssertion,
            TasError::Decode(_) => FailureClass::Decode,
        }
    }

    /// The service a failure is attributed to, if any.
    pub fn component(&self) -> Option<Component> {
        match self {
            TasError::ServiceAssertion { component, .. } => Some(*component),
            _ => None,
        }
    }
}

/// Coarse failure classes, one per [`TasError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Setup,
    PrerequisiteMissing,
    ServiceAssertion,
    Decode,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Setup => "setup",
            FailureClass::PrerequisiteMissing => "prerequisite_missing",
            FailureClass::ServiceAssertion => "service_assertion",
            FailureClass::Decode => "decode",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an encoded log entry could not be validated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("entry has no encoded body")]
    MissingBody,

    #[error("entry body is not valid base64: {0}")]
    Base64(String),

    #[error("entry body is not valid UTF-8")]
    Utf8,

    #[error("entry body is not valid JSON: {0}")]
    Json(String),

    #[error("entry body has no signature block")]
    MissingSignature,
}
