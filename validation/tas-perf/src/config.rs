//! Configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default base URL of the local crypto-material helper.
pub const DEFAULT_HELPER_URL: &str = "http://localhost:8080";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Run settings, optionally loaded from a YAML scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Concurrent virtual users.
    #[serde(default = "default_vus")]
    pub vus: u32,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    /// Stop after this many iterations have been started.
    #[serde(default)]
    pub iterations: Option<u64>,
    #[serde(default)]
    pub warmup_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub seed: Option<u64>, // Optional RNG seed for reproducible identifier selection
}

fn default_vus() -> u32 {
    1
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for TestConfig {
    /// One virtual user running a single iteration.
    fn default() -> Self {
        Self {
            name: "tas-perf".to_string(),
            description: String::new(),
            vus: default_vus(),
            duration_secs: None,
            iterations: Some(1),
            warmup_secs: 0,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            seed: None,
        }
    }
}

impl TestConfig {
    /// Load configuration from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TestConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.vus == 0 {
            anyhow::bail!("vus must be > 0");
        }
        if self.duration_secs.is_none() && self.iterations.is_none() {
            anyhow::bail!("either duration_secs or iterations must be specified");
        }
        if self.duration_secs == Some(0) {
            anyhow::bail!("duration_secs must be > 0");
        }
        if self.iterations == Some(0) {
            anyhow::bail!("iterations must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be > 0");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Identity issuer settings. Every field is required for a token request.
#[derive(Debug, Clone, Default)]
pub struct OidcSettings {
    pub issuer_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
}

/// [`OidcSettings`] with every field present.
#[derive(Debug, Clone, Copy)]
pub struct OidcCredentials<'a> {
    pub issuer_url: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub client_id: &'a str,
}

impl OidcSettings {
    /// `None` if any setting is absent or empty.
    pub fn credentials(&self) -> Option<OidcCredentials<'_>> {
        fn field(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        Some(OidcCredentials {
            issuer_url: field(&self.issuer_url)?,
            username: field(&self.username)?,
            password: field(&self.password)?,
            client_id: field(&self.client_id)?,
        })
    }
}

/// Interpret an on/off environment value. `None` for anything unrecognized.
pub fn parse_toggle(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
