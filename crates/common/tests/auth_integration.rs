//! Integration tests for the OAuth client against a mock token endpoint

#![cfg(feature = "platform")]

use duesync_common::auth::{OAuthClient, OAuthClientError, OAuthConfig};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OAuthConfig {
    OAuthConfig {
        client_id: "client-123".to_string(),
        client_secret: Some("secret-xyz".to_string()),
        authorization_endpoint: format!("{}/auth", server.uri()),
        token_endpoint: format!("{}/token", server.uri()),
        redirect_uri: "http://127.0.0.1:8765/callback".to_string(),
        scopes: vec!["openid".to_string(), "email".to_string()],
        extra_authorize_params: Vec::new(),
    }
}

#[tokio::test]
async fn exchange_code_posts_verifier_and_parses_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier=verifier-abc"))
        .and(body_string_contains("client_secret=secret-xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.access",
            "refresh_token": "1//refresh",
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": "openid email"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OAuthClient::new(config_for(&server));
    let tokens = client.exchange_code("auth-code", "verifier-abc").await.unwrap();

    assert_eq!(tokens.access_token, "ya29.access");
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
    assert_eq!(tokens.expires_in, 3599);
}

#[tokio::test]
async fn refresh_returns_new_access_token_without_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.renewed",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let client = OAuthClient::new(config_for(&server));
    let tokens = client.refresh_access_token("1//refresh").await.unwrap();

    assert_eq!(tokens.access_token, "ya29.renewed");
    assert!(tokens.refresh_token.is_none());
}

#[tokio::test]
async fn invalid_grant_requires_reauth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let client = OAuthClient::new(config_for(&server));
    let err = client.refresh_access_token("1//revoked").await.unwrap_err();

    assert!(matches!(err, OAuthClientError::OAuth(ref e) if e.is_invalid_grant()));
    assert!(err.requires_reauth());
}

#[tokio::test]
async fn server_error_is_not_reauth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let client = OAuthClient::new(config_for(&server));
    let err = client.refresh_access_token("1//refresh").await.unwrap_err();

    assert!(matches!(err, OAuthClientError::Http { status: 503 }));
    assert!(!err.requires_reauth());
}
