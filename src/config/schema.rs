//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for a kiln server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, backpressure).
    pub listener: ListenerConfig,

    /// Request handling settings.
    pub http: HttpConfig,

    /// Error body settings.
    pub errors: ErrorsConfig,

    /// WebSocket endpoint settings.
    pub websocket: WebSocketConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests served concurrently (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_concurrent_requests: 10_000,
        }
    }
}

/// Request handling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Content type assumed for responses and used for error negotiation
    /// when the client expresses no preference.
    pub default_content_type: String,

    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,

    /// Total request timeout in seconds. No timeout when unset.
    pub request_timeout_secs: Option<u64>,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            default_content_type: "text/plain".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
            request_timeout_secs: None,
        }
    }
}

/// Error body configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// Base URL of the error documentation; the `type` field of JSON
    /// error bodies is `{docs_url}#{slug}`.
    pub docs_url: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            docs_url: "https://kiln.rs/docs/errors".to_string(),
        }
    }
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Maximum size of an incoming message in bytes.
    pub max_message_bytes: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.http.default_content_type, "text/plain");
        assert!(config.http.request_timeout().is_none());
    }

    #[test]
    fn test_partial_section() {
        let config: ServerConfig = toml::from_str(
            r#"
            [http]
            default_content_type = "application/json"
            request_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.http.default_content_type, "application/json");
        assert_eq!(config.http.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.http.max_body_bytes, 2 * 1024 * 1024);
    }
}
