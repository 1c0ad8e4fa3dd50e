//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Validate enumerated strings (log level, log format)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ServerConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: unsupported value '{value}' (expected one of {expected})")]
    Unsupported {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("{field}: '{value}' is not a valid header value")]
    InvalidHeader { field: &'static str, value: String },

    #[error("{field}: must not be empty")]
    Empty { field: &'static str },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_non_zero(
        &mut errors,
        "listener.max_concurrent_requests",
        config.listener.max_concurrent_requests as u64,
    );

    let content_type = &config.http.default_content_type;
    if content_type.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "http.default_content_type",
        });
    } else if HeaderValue::from_str(content_type).is_err() {
        errors.push(ValidationError::InvalidHeader {
            field: "http.default_content_type",
            value: content_type.clone(),
        });
    }
    check_non_zero(&mut errors, "http.max_body_bytes", config.http.max_body_bytes as u64);
    if let Some(secs) = config.http.request_timeout_secs {
        check_non_zero(&mut errors, "http.request_timeout_secs", secs);
    }

    if config.errors.docs_url.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "errors.docs_url",
        });
    }

    check_non_zero(
        &mut errors,
        "websocket.max_message_bytes",
        config.websocket.max_message_bytes as u64,
    );

    let observability = &config.observability;
    check_one_of(&mut errors, "observability.log_level", &observability.log_level, LOG_LEVELS);
    check_one_of(&mut errors, "observability.log_format", &observability.log_format, LOG_FORMATS);
    if observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_non_zero(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

fn check_one_of(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::Unsupported {
            field,
            value: value.to_string(),
            expected: allowed.join(", "),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config.http.max_body_bytes = 0;
        config.observability.log_format = "xml".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero {
            field: "http.max_body_bytes"
        }));
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "bad".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
