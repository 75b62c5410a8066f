//! OAuth credential records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::AccountRole;
use crate::impl_domain_status_conversions;

/// Whether stored credentials are still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Active,
    RequiresReauth,
}

impl_domain_status_conversions!(TokenStatus {
    Active => "active",
    RequiresReauth => "requires_reauth",
});

/// Persisted credential row. Token fields hold ciphertext only.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub user_id: String,
    pub student_id: String,
    pub role: AccountRole,
    pub encrypted_access: String,
    pub encrypted_refresh: String,
    pub expires_at: DateTime<Utc>,
    pub calendar_id: Option<String>,
    pub account_email: Option<String>,
    pub status: TokenStatus,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("user_id", &self.user_id)
            .field("student_id", &self.student_id)
            .field("role", &self.role)
            .field("expires_at", &self.expires_at)
            .field("calendar_id", &self.calendar_id)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Plaintext credentials handed to the token manager after OAuth.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub account_email: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_at", &self.expires_at)
            .field("account_email", &self.account_email.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

/// Decrypted bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { secret: secret.into(), expires_at }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A token guaranteed usable past the refresh margin, plus the record
/// metadata a pass needs.
#[derive(Debug, Clone)]
pub struct ValidToken {
    pub token: AccessToken,
    pub calendar_id: Option<String>,
    pub account_email: Option<String>,
}

/// Connection state of one role, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Active {
        email: Option<String>,
        calendar_id: Option<String>,
        expires_at: DateTime<Utc>,
    },
    RequiresReauth {
        email: Option<String>,
    },
}

impl ConnectionStatus {
    pub fn from_record(record: Option<&TokenRecord>) -> Self {
        match record {
            None => Self::Disconnected,
            Some(r) if r.status == TokenStatus::RequiresReauth => {
                Self::RequiresReauth { email: r.account_email.clone() }
            }
            Some(r) => Self::Active {
                email: r.account_email.clone(),
                calendar_id: r.calendar_id.clone(),
                expires_at: r.expires_at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(status: TokenStatus) -> TokenRecord {
        let at = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        TokenRecord {
            user_id: "u1".into(),
            student_id: "s1".into(),
            role: AccountRole::Parent,
            encrypted_access: "enc-a".into(),
            encrypted_refresh: "enc-r".into(),
            expires_at: at,
            calendar_id: Some("cal-1".into()),
            account_email: Some("p@example.com".into()),
            status,
            updated_at: at,
        }
    }

    #[test]
    fn connection_status_reflects_record() {
        assert_eq!(ConnectionStatus::from_record(None), ConnectionStatus::Disconnected);
        assert!(matches!(
            ConnectionStatus::from_record(Some(&record(TokenStatus::Active))),
            ConnectionStatus::Active { calendar_id: Some(_), .. }
        ));
        assert_eq!(
            ConnectionStatus::from_record(Some(&record(TokenStatus::RequiresReauth))),
            ConnectionStatus::RequiresReauth { email: Some("p@example.com".into()) }
        );
    }

    #[test]
    fn access_token_debug_hides_secret() {
        let token = AccessToken::new("ya29.secret", Utc::now());
        assert!(!format!("{token:?}").contains("ya29"));
    }
}
