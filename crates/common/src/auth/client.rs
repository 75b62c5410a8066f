//! OAuth 2.0 client with PKCE support
//!
//! Stateless: the caller keeps the [`PkceChallenge`] between building the
//! authorization URL and exchanging the code, so several connect attempts
//! (one per account role) can be pending at once.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::pkce::PkceChallenge;
use super::types::{OAuthConfig, OAuthError, TokenSet};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for OAuth client operations
#[derive(Debug, Error)]
pub enum OAuthClientError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Authorization server returned an error body
    #[error("OAuth error: {0}")]
    OAuth(OAuthError),

    /// Non-success status without a parseable OAuth error body
    #[error("token endpoint returned HTTP {status}")]
    Http { status: u16 },

    /// Failed to parse a response or token
    #[error("Parse error: {0}")]
    Parse(String),

    /// No refresh token available
    #[error("No refresh token available")]
    NoRefreshToken,
}

impl OAuthClientError {
    /// True when the grant itself is dead and the user must reconnect.
    pub fn requires_reauth(&self) -> bool {
        match self {
            Self::OAuth(err) => err.is_invalid_grant() || err.error == "unauthorized_client",
            Self::Http { status } => *status == 400 || *status == 401,
            Self::NoRefreshToken => true,
            Self::RequestFailed(_) | Self::Parse(_) => false,
        }
    }
}

/// Authorization URL plus the challenge that must be kept until callback.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub challenge: PkceChallenge,
}

/// OAuth 2.0 client (RFC 6749 + RFC 7636)
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: Client,
}

impl OAuthClient {
    /// Create a new OAuth client with the given configuration
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build().unwrap_or_else(|_| Client::new());
        Self { config, http }
    }

    /// Build the browser authorization URL with a fresh PKCE challenge.
    #[must_use]
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let challenge = PkceChallenge::generate();

        let mut params: Vec<(String, String)> = vec![
            ("response_type".into(), "code".into()),
            ("client_id".into(), self.config.client_id.clone()),
            ("redirect_uri".into(), self.config.redirect_uri.clone()),
            ("scope".into(), self.config.scope_string()),
            ("state".into(), challenge.state.clone()),
            ("code_challenge".into(), challenge.code_challenge.clone()),
            ("code_challenge_method".into(), challenge.challenge_method().into()),
        ];
        params.extend(self.config.extra_authorize_params.iter().cloned());

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        AuthorizationRequest {
            url: format!("{}?{}", self.config.authorization_endpoint, query),
            challenge,
        }
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// Returns `OAuth` if the server rejects the code, `RequestFailed` on
    /// transport errors.
    #[instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("code", code.to_string()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("code_verifier", code_verifier.to_string()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        self.post_token_form(&form).await
    }

    /// Refresh an access token.
    ///
    /// The returned set usually has no `refresh_token`; keep the old one.
    ///
    /// # Errors
    /// `NoRefreshToken` for an empty token, `OAuth` with `invalid_grant`
    /// when consent was revoked.
    #[instrument(skip_all)]
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("refresh_token", refresh_token.to_string()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        self.post_token_form(&form).await
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn post_token_form(
        &self,
        form: &[(&str, String)],
    ) -> Result<TokenSet, OAuthClientError> {
        let response = self.http.post(&self.config.token_endpoint).form(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<OAuthError>(&body) {
                Ok(err) => {
                    warn!(status = status.as_u16(), error = %err.error, "token endpoint rejected request");
                    OAuthClientError::OAuth(err)
                }
                Err(_) => OAuthClientError::Http { status: status.as_u16() },
            });
        }

        let tokens: TokenSet =
            response.json().await.map_err(|e| OAuthClientError::Parse(e.to_string()))?;
        debug!(expires_in = tokens.expires_in, "token endpoint returned tokens");
        Ok(tokens)
    }
}

#[derive(Deserialize)]
struct IdTokenClaims {
    email: Option<String>,
}

/// Read the `email` claim from an OpenID Connect ID token.
///
/// The signature is not verified; the token came straight from the token
/// endpoint over TLS.
///
/// # Errors
/// Returns `Parse` if the token is not a three-part JWT with a JSON payload.
pub fn extract_email_from_id_token(id_token: &str) -> Result<Option<String>, OAuthClientError> {
    let mut parts = id_token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => return Err(OAuthClientError::Parse("id_token is not a JWT".into())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| OAuthClientError::Parse(format!("id_token payload: {e}")))?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| OAuthClientError::Parse(format!("id_token claims: {e}")))?;

    Ok(claims.email)
}
