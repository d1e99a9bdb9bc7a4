//! One-time bearer credential acquisition via OIDC password grant.

use std::fmt;

use tas_protocol::endpoints;
use tas_protocol::{PasswordGrant, TasError, TasResult, TokenResponse};
use tracing::{error, info, warn};

use crate::client::TasClient;
use crate::config::OidcSettings;

/// Bearer token shared read-only by every iteration of a run.
#[derive(Clone, PartialEq, Eq)]
pub struct RunCredential(String);

impl RunCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for RunCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RunCredential(<redacted>)")
    }
}

/// Exchange the configured user credentials for an access token.
///
/// Returns `None` without contacting the issuer when any setting is missing,
/// and `None` when the issuer does not answer with a token.
pub async fn fetch_token(client: &TasClient, settings: &OidcSettings) -> Option<RunCredential> {
    let Some(creds) = settings.credentials() else {
        warn!("OIDC issuer URL, user, password or client ID not configured");
        return None;
    };

    let url = endpoints::join(creds.issuer_url, endpoints::OIDC_TOKEN);
    let grant = PasswordGrant::new(creds.username, creds.password, creds.client_id);

    let response = match client.execute(client.post(&url).form(&grant)).await {
        Ok(response) => response,
        Err(e) => {
            error!(url = %url, error = %e, "OIDC token request failed");
            return None;
        }
    };

    if !(200..300).contains(&response.status()) {
        error!(
            status = response.status(),
            body = %response.text(),
            "OIDC token request failed"
        );
        return None;
    }

    match response.json::<TokenResponse>() {
        Ok(token) => token.into_token().map(RunCredential::new),
        Err(e) => {
            error!(error = %e, "OIDC token response is not valid JSON");
            None
        }
    }
}

/// Setup phase: obtain the run credential or refuse to start the run.
pub async fn setup(client: &TasClient, settings: &OidcSettings) -> TasResult<RunCredential> {
    info!("Fetching a single OIDC token for the entire test run");

    match fetch_token(client, settings).await {
        Some(credential) => {
            info!("OIDC token successfully retrieved, starting iterations");
            Ok(credential)
        }
        None => {
            error!("Failed to retrieve OIDC token during setup, cannot start the test");
            Err(TasError::setup("no OIDC access token could be obtained"))
        }
    }
}
