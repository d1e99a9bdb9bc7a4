//! Per-iteration record of tagged requests and named checks.

use std::time::Duration;

/// One tagged HTTP call made during an iteration.
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub name: &'static str,
    /// `None` when the request failed at the transport level.
    pub status: Option<u16>,
    pub latency: Duration,
}

/// Outcome of one named assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
}

/// Everything an iteration observed. Owned by the iteration and handed to
/// the metrics collector once it finishes.
#[derive(Debug, Default)]
pub struct IterationTrace {
    requests: Vec<RequestSample>,
    checks: Vec<CheckResult>,
}

impl IterationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a named assertion and return its outcome.
    pub fn check(&mut self, name: &'static str, passed: bool) -> bool {
        self.checks.push(CheckResult { name, passed });
        passed
    }

    pub fn record_request(&mut self, name: &'static str, status: Option<u16>, latency: Duration) {
        self.requests.push(RequestSample {
            name,
            status,
            latency,
        });
    }

    pub fn requests(&self) -> &[RequestSample] {
        &self.requests
    }

    pub fn checks(&self) -> &[CheckResult] {
        &self.checks
    }

    pub fn request_names(&self) -> Vec<&'static str> {
        self.requests.iter().map(|r| r.name).collect()
    }

    pub fn all_checks_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Outcome of the most recent check with this name.
    pub fn check_outcome(&self, name: &str) -> Option<bool> {
        self.checks
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| c.passed)
    }
}
