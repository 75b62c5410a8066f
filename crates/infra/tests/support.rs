//! Shared fixtures for infra integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use duesync_common::auth::{OAuthClient, OAuthConfig};
use duesync_common::{Clock, SystemClock};
use duesync_domain::{Assignment, TokenGrant};
use duesync_infra::database::{
    DbManager, SqlCipherAssignmentRepository, SqlCipherMappingRepository,
    SqlCipherSettingsRepository, SqlCipherTokenRepository,
};
use duesync_infra::AesTokenCipher;
use tempfile::TempDir;

pub const TEST_DB_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Temporary migrated database that lives as long as the struct.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("duesync-test.db");

        let manager =
            DbManager::new(&db_path, 4, Some(TEST_DB_KEY)).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn tokens(&self) -> Arc<SqlCipherTokenRepository> {
        Arc::new(SqlCipherTokenRepository::new(Arc::clone(&self.manager)))
    }

    pub fn settings(&self) -> Arc<SqlCipherSettingsRepository> {
        Arc::new(SqlCipherSettingsRepository::new(Arc::clone(&self.manager)))
    }

    pub fn mappings(&self) -> Arc<SqlCipherMappingRepository> {
        Arc::new(SqlCipherMappingRepository::new(Arc::clone(&self.manager)))
    }

    pub fn assignments(&self) -> Arc<SqlCipherAssignmentRepository> {
        Arc::new(SqlCipherAssignmentRepository::new(Arc::clone(&self.manager)))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn cipher() -> Arc<AesTokenCipher> {
    Arc::new(AesTokenCipher::from_database_key(TEST_DB_KEY).expect("cipher should build"))
}

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// Whole seconds, matching what the database stores.
pub fn now_secs() -> DateTime<Utc> {
    DateTime::from_timestamp(Utc::now().timestamp(), 0).expect("timestamp in range")
}

pub fn assignment(student_id: &str, plannable_id: &str, due_in_days: i64) -> Assignment {
    Assignment {
        student_id: student_id.to_string(),
        plannable_id: plannable_id.to_string(),
        title: format!("Homework {plannable_id}"),
        course_id: "course-1".to_string(),
        course_name: "Algebra I".to_string(),
        due_at: Some(now_secs() + Duration::days(due_in_days)),
        points_possible: Some(10.0),
        current_grade: None,
        submitted: false,
        missing: false,
        late: false,
        graded: false,
    }
}

pub fn grant(access: &str, refresh: &str, expires_in: Duration) -> TokenGrant {
    TokenGrant {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_at: now_secs() + expires_in,
        account_email: Some("parent@example.com".to_string()),
    }
}

/// OAuth client whose token endpoint is a mock server.
pub fn oauth_client(token_endpoint: String) -> Arc<OAuthClient> {
    Arc::new(OAuthClient::new(OAuthConfig {
        client_id: "client-1".to_string(),
        client_secret: Some("secret".to_string()),
        authorization_endpoint: "https://auth.example.com/authorize".to_string(),
        token_endpoint,
        redirect_uri: "http://127.0.0.1:8765/callback".to_string(),
        scopes: vec!["https://www.googleapis.com/auth/calendar".to_string()],
        extra_authorize_params: Vec::new(),
    }))
}
