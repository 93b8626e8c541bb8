//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use cdnbulk_domain::BulkError;
use cdnbulk_infra::config;
use cdnbulk_infra::BulkOperationManager;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
[remote]
base_url = "https://cp.example.net/papi/v1"
request_timeout_seconds = 12
api_token = "toml-token"

[polling]
interval_seconds = 4
max_consecutive_failures = 8
timeout_seconds = 1800

[logging]
level = "debug"
json = true
"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let config = config::load_from_file(Some(path.clone())).expect("config should load");

    assert_eq!(config.remote.request_timeout().as_secs(), 12);
    assert_eq!(config.polling.interval().as_secs(), 4);
    assert_eq!(config.polling.max_consecutive_failures, 8);
    assert_eq!(config.polling.timeout().map(|t| t.as_secs()), Some(1800));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_invalid_json_is_a_config_error() {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(b"{ \"remote\": ").expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let err = config::load_from_file(Some(path.clone())).unwrap_err();
    assert!(matches!(err, BulkError::Config(ref msg) if msg.contains("Invalid JSON")));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_loaded_config_builds_manager() {
    let json_content = r#"{
        "remote": { "base_url": "https://cp.example.net", "api_token": "json-token" },
        "notifications": { "webhook_url": "https://hooks.example.net/bulk" }
    }"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let config = config::load_from_file(Some(path.clone())).expect("config should load");
    assert!(BulkOperationManager::from_config(&config).is_ok());

    std::fs::remove_file(path).ok();
}

#[test]
fn test_manager_requires_api_token() {
    let config = cdnbulk_domain::Config::default();

    let err = BulkOperationManager::from_config(&config).err().expect("missing token must fail");
    assert!(matches!(err, BulkError::Config(_)));
}
