//! OAuth 2.0 authorization-code flow with PKCE

pub mod client;
pub mod pkce;
pub mod types;

pub use client::{extract_email_from_id_token, AuthorizationRequest, OAuthClient, OAuthClientError};
pub use pkce::PkceChallenge;
pub use types::{OAuthConfig, OAuthError, TokenSet};
