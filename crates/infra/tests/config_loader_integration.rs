//! Integration tests for configuration loading from files.

use std::io::Write;

use duesync_domain::DueSyncError;
use duesync_infra::config;
use tempfile::{Builder, NamedTempFile};

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().expect("temp file should be created");
    file.write_all(contents.as_bytes()).expect("config should be written");
    file.flush().expect("config should be flushed");
    file
}

#[test]
fn loads_json_with_partial_sections() {
    let file = config_file(
        ".json",
        r#"{
            "database": {"path": "/tmp/duesync-integration.db", "pool_size": 4},
            "sync": {"pass_timeout_ms": 45000, "auto_sync_cron": "0 0 * * * *"},
            "oauth": {"client_id": "client-abc"}
        }"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).unwrap();

    assert_eq!(config.database.path, "/tmp/duesync-integration.db");
    assert_eq!(config.database.pool_size, 4);
    assert_eq!(config.sync.pass_timeout_ms, 45000);
    assert_eq!(config.sync.auto_sync_cron, "0 0 * * * *");
    assert_eq!(config.sync.max_attempts, 5, "unset fields keep their defaults");
    assert_eq!(config.oauth.client_id, "client-abc");
    assert!(!config.oauth.scopes.is_empty());
}

#[test]
fn loads_toml() {
    let file = config_file(
        ".toml",
        r#"
[database]
path = "duesync-toml.db"

[sync]
max_attempts = 3
auto_sync_enabled = false
"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).unwrap();

    assert_eq!(config.database.path, "duesync-toml.db");
    assert_eq!(config.sync.max_attempts, 3);
    assert!(!config.sync.auto_sync_enabled);
}

#[test]
fn rejects_inconsistent_backoff() {
    let file = config_file(".json", r#"{"sync": {"base_delay_ms": 9000, "max_delay_ms": 100}}"#);

    let err = config::load_from_file(Some(file.path().to_path_buf())).unwrap_err();

    assert!(matches!(err, DueSyncError::Config(msg) if msg.contains("base_delay_ms")));
}

#[test]
fn rejects_malformed_and_unknown_formats() {
    let broken = config_file(".json", "{ not json");
    assert!(matches!(
        config::load_from_file(Some(broken.path().to_path_buf())),
        Err(DueSyncError::Config(msg)) if msg.contains("Invalid JSON")
    ));

    let yaml = config_file(".yaml", "database: {}");
    assert!(matches!(
        config::load_from_file(Some(yaml.path().to_path_buf())),
        Err(DueSyncError::Config(msg)) if msg.contains("Unsupported")
    ));
}

#[test]
fn missing_file_is_a_config_error() {
    let err = config::load_from_file(Some("/definitely/not/here/config.json".into())).unwrap_err();
    assert!(matches!(err, DueSyncError::Config(msg) if msg.contains("not found")));
}
