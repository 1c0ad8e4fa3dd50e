//! Configuration loading tests.

use std::io::Write;

use kiln::config::{load_config, ConfigError, ValidationError};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
        [listener]
        bind_address = "127.0.0.1:3000"
        max_concurrent_requests = 64

        [http]
        default_content_type = "application/json"
        max_body_bytes = 1024
        request_timeout_secs = 10

        [errors]
        docs_url = "https://example.com/errors"

        [websocket]
        max_message_bytes = 4096

        [observability]
        log_level = "debug"
        log_format = "json"
        metrics_enabled = true
        metrics_address = "127.0.0.1:9100"
        "#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
    assert_eq!(config.listener.max_concurrent_requests, 64);
    assert_eq!(config.http.default_content_type, "application/json");
    assert_eq!(config.http.request_timeout_secs, Some(10));
    assert_eq!(config.errors.docs_url, "https://example.com/errors");
    assert_eq!(config.websocket.max_message_bytes, 4096);
    assert_eq!(config.observability.log_format, "json");
}

#[test]
fn test_empty_file_uses_defaults() {
    let file = write_config("");
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    assert!(!config.observability.metrics_enabled);
}

#[test]
fn test_invalid_values_list_every_error() {
    let file = write_config(
        r#"
        [listener]
        bind_address = "not-an-address"
        max_concurrent_requests = 0

        [observability]
        log_level = "loud"
        "#,
    );

    match load_config(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 3);
            assert!(errors.contains(&ValidationError::Zero {
                field: "listener.max_concurrent_requests"
            }));
            let message = ConfigError::Validation(errors).to_string();
            assert!(message.contains("listener.bind_address"));
            assert!(message.contains("observability.log_level"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_syntax_error_is_parse_error() {
    let file = write_config("[listener\nbind_address = ");
    assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
}
