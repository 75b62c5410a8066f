//! Google OAuth token refresh

use std::sync::Arc;

use async_trait::async_trait;
use duesync_common::auth::{OAuthClient, OAuthConfig};
use duesync_common::Clock;
use duesync_core::{RefreshError, RefreshedToken, TokenRefresher};
use duesync_domain::OAuthSettings;
use tracing::{instrument, warn};

pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// OAuth client config for Google installed-app clients.
///
/// Offline access with forced consent so every connect yields a refresh
/// token, even for an account that connected before.
pub fn google_oauth_config(settings: &OAuthSettings) -> OAuthConfig {
    OAuthConfig {
        client_id: settings.client_id.clone(),
        client_secret: settings.client_secret.clone(),
        authorization_endpoint: GOOGLE_AUTHORIZATION_ENDPOINT.to_string(),
        token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
        redirect_uri: settings.redirect_uri.clone(),
        scopes: settings.scopes.clone(),
        extra_authorize_params: vec![
            ("access_type".to_string(), "offline".to_string()),
            ("prompt".to_string(), "consent".to_string()),
        ],
    }
}

/// [`TokenRefresher`] backed by the Google token endpoint
pub struct GoogleTokenRefresher {
    client: Arc<OAuthClient>,
    clock: Arc<dyn Clock>,
}

impl GoogleTokenRefresher {
    pub fn new(client: Arc<OAuthClient>, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }
}

#[async_trait]
impl TokenRefresher for GoogleTokenRefresher {
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, RefreshError> {
        let issued_at = self.clock.now();
        match self.client.refresh_access_token(refresh_token).await {
            Ok(tokens) => Ok(RefreshedToken {
                expires_at: tokens.expires_at(issued_at),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            }),
            Err(err) if err.requires_reauth() => {
                warn!(error = %err, "refresh token rejected");
                Err(RefreshError::Revoked(err.to_string()))
            }
            Err(err) => Err(RefreshError::Transient(err.to_string())),
        }
    }
}
