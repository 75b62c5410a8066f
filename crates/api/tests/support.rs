//! Shared setup for command tests.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use duesync_api::{AppContext, Endpoints};
use duesync_domain::{Config, DatabaseConfig, OAuthSettings, SyncConfig};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Context on a temp database, with Google endpoints on a mock server.
pub struct TestApp {
    pub ctx: AppContext,
    pub server: MockServer,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_sync(SyncConfig::default()).await
    }

    pub async fn with_sync(sync: SyncConfig) -> Self {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().expect("temp dir should be created");

        let config = Config {
            database: DatabaseConfig {
                path: temp_dir.path().join("duesync.db").to_string_lossy().to_string(),
                pool_size: 4,
                encryption_key: None,
            },
            sync,
            oauth: OAuthSettings {
                client_id: "client-1".to_string(),
                client_secret: Some("secret".to_string()),
                ..OAuthSettings::default()
            },
        };
        let endpoints = Endpoints {
            calendar_api_base: server.uri(),
            token_endpoint: Some(format!("{}/token", server.uri())),
        };

        let ctx = AppContext::with_database_key(config, TEST_KEY.to_string(), endpoints)
            .await
            .expect("context should build");

        Self { ctx, server, _temp_dir: temp_dir }
    }

    /// Token endpoint answers an authorization-code exchange for `code`.
    pub async fn mock_code_exchange(&self, code: &str, email: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains(format!("code={code}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": format!("access-{code}"),
                "refresh_token": format!("refresh-{code}"),
                "id_token": id_token(email),
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&self.server)
            .await;
    }

    /// Calendar API that provisions `cal-1` and accepts every event write.
    pub async fn mock_calendar_api(&self) {
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calendars"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cal-1"})))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calendars/cal-1/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-1"})))
            .mount(&self.server)
            .await;
    }
}

/// Unsigned JWT carrying an `email` claim.
pub fn id_token(email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"email": email, "sub": "1"}).to_string());
    format!("{header}.{payload}.sig")
}

/// Query parameter from an authorization URL.
pub fn query_value(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}
