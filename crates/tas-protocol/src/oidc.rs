//! OIDC resource-owner password grant.

use serde::{Deserialize, Serialize};

/// Form body of a password-grant token request.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordGrant<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub scope: &'static str,
    pub client_id: &'a str,
    pub grant_type: &'static str,
}

impl<'a> PasswordGrant<'a> {
    pub fn new(username: &'a str, password: &'a str, client_id: &'a str) -> Self {
        Self {
            username,
            password,
            scope: "openid",
            client_id,
            grant_type: "password",
        }
    }
}

/// Token endpoint response. Only the access token is used.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

impl TokenResponse {
    /// The access token, if present and non-empty.
    pub fn into_token(self) -> Option<String> {
        self.access_token.filter(|token| !token.is_empty())
    }
}
