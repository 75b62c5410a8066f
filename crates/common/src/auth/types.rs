//! OAuth 2.0 types and structures

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens returned by an authorization-code exchange or a refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token for API authentication
    pub access_token: String,

    /// Refresh token; providers omit it on most refresh responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// OpenID Connect ID token (JWT) with account claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    /// Granted scopes (space-separated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("id_token", &self.id_token.as_ref().map(|_| "***"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

impl TokenSet {
    /// Absolute expiry given the instant the token was issued.
    #[must_use]
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + Duration::seconds(self.expires_in.max(0))
    }
}

/// OAuth client configuration for an authorization server.
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// Client secret; Google installed-app clients still require one
    pub client_secret: Option<String>,

    /// Authorization endpoint (browser redirect target)
    pub authorization_endpoint: String,

    /// Token endpoint (code exchange and refresh)
    pub token_endpoint: String,

    /// Redirect URI registered for the client
    pub redirect_uri: String,

    /// Scopes to request
    pub scopes: Vec<String>,

    /// Extra query parameters for the authorization request
    pub extra_authorize_params: Vec<(String, String)>,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl OAuthConfig {
    /// Scopes joined for the `scope` parameter.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// OAuth error response body (RFC 6749 §5.2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl OAuthError {
    /// `invalid_grant` means the refresh token was revoked or expired.
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        self.error == "invalid_grant"
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}
