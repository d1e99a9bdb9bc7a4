//! Shared test utilities for the tas-perf workspace.
//!
//! This crate provides common testing infrastructure including:
//! - An in-process mock of the whole signing stack ([`MockStack`])
//! - Common test fixtures (certificates, helper payloads, log entries)
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! Then start a stack in an async test:
//!
//! ```ignore
//! use test_utils::{MockResponse, MockStack, Route};
//!
//! #[tokio::test]
//! async fn test_fulcio_down() {
//!     let stack = MockStack::start().await;
//!     stack.respond(Route::SigningCert, MockResponse::status(503));
//!     // point the workflow at stack.base_url()...
//! }
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::*;
pub use mock::{MockResponse, MockStack, RecordedRequest, Route};
