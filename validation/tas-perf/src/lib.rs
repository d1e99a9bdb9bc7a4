//! Load generator for a transparency and signing stack.
//!
//! This crate provides tools to:
//! - Acquire a single OIDC bearer token per run
//! - Drive sign-and-record iterations against Fulcio, Rekor and a timestamp helper
//! - Drive verify iterations that read back recorded entries
//! - Collect per-request, per-check and per-iteration metrics
//! - Output results in multiple formats (console, JSON, CSV)

pub mod client;
pub mod config;
pub mod credential;
pub mod crypto_source;
pub mod entries;
pub mod metrics;
pub mod pool;
pub mod report;
pub mod report_error;
pub mod runner;
pub mod sign;
pub mod trace;
pub mod verify;

pub use client::TasClient;
pub use config::{parse_toggle, OidcSettings, TestConfig};
pub use credential::RunCredential;
pub use entries::{collect_entries, EntrySink};
pub use metrics::{IterationOutcome, MetricsCollector, TestResults};
pub use pool::IdentifierPool;
pub use report::ResultsReport;
pub use report_error::ErrorReporter;
pub use runner::{LoadRunner, Workflow};
pub use sign::{SignContext, SignEndpoints};
pub use trace::IterationTrace;
pub use verify::VerifyContext;
