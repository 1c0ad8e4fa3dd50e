//! Content negotiation for error bodies.
//!
//! # Data Flow
//! ```text
//! Accept header + server default content type
//!     → accept.rs (parse media ranges and q-values)
//!     → negotiate() (JSON vs plain text)
//!     → errors::render (serialize the ResponseError)
//! ```
//!
//! # Design Decisions
//! - Only explicitly listed media types express a preference; `*/*` does not
//! - Any explicit JSON range with a non-zero quality selects JSON
//! - A JSON server default applies only when the client neither lists
//!   plain text nor refuses JSON with `q=0`
//! - Per-status overrides registered on the app are consulted before this

pub mod accept;

use accept::{is_json, is_plain_text, AcceptHeader};

/// Serialization chosen for a `ResponseError` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Json,
    PlainText,
}

impl ErrorFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ErrorFormat::Json => "application/json",
            ErrorFormat::PlainText => "text/plain; charset=utf-8",
        }
    }
}

/// Pick the error body format for a request.
pub fn negotiate(accept: Option<&str>, default_content_type: &str) -> ErrorFormat {
    let accept = AcceptHeader::parse(accept.unwrap_or_default());
    let json_q = accept.explicit_quality(is_json);
    let text_q = accept.explicit_quality(is_plain_text);

    if json_q > 0.0 {
        return ErrorFormat::Json;
    }

    let default_essence = default_content_type.split(';').next().unwrap_or_default();
    if is_json(default_essence) && text_q == 0.0 && !accept.lists(is_json) {
        return ErrorFormat::Json;
    }

    ErrorFormat::PlainText
}

/// Whether a status override registered for `content_type` applies to a
/// request with the given `Accept` header.
pub fn override_matches(content_type: &str, accept: Option<&str>) -> bool {
    content_type == "*"
        || accept
            .map(|a| a.to_ascii_lowercase().contains(&content_type.to_ascii_lowercase()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_json() {
        assert_eq!(negotiate(Some("application/json"), "text/plain"), ErrorFormat::Json);
    }

    #[test]
    fn test_explicit_plain_text() {
        assert_eq!(negotiate(Some("text/plain"), "text/plain"), ErrorFormat::PlainText);
        assert_eq!(
            negotiate(Some("text/plain"), "application/json"),
            ErrorFormat::PlainText
        );
    }

    #[test]
    fn test_default_content_type_json() {
        assert_eq!(negotiate(None, "application/json"), ErrorFormat::Json);
        assert_eq!(negotiate(Some("*/*"), "application/json"), ErrorFormat::Json);
        assert_eq!(
            negotiate(Some("text/html"), "application/json; charset=utf-8"),
            ErrorFormat::Json
        );
        assert_eq!(negotiate(None, "text/plain"), ErrorFormat::PlainText);
    }

    #[test]
    fn test_explicit_json_wins_regardless_of_quality() {
        assert_eq!(
            negotiate(Some("text/plain;q=0.9, application/json;q=0.5"), "text/plain"),
            ErrorFormat::Json
        );
        assert_eq!(
            negotiate(Some("text/plain, application/json;q=0.9"), "text/plain"),
            ErrorFormat::Json
        );
        assert_eq!(
            negotiate(Some("text/plain;q=0.5, application/json"), "text/plain"),
            ErrorFormat::Json
        );
        assert_eq!(
            negotiate(Some("application/json;q=0"), "text/plain"),
            ErrorFormat::PlainText
        );
    }

    #[test]
    fn test_refused_json_ignores_json_default() {
        assert_eq!(
            negotiate(Some("application/json;q=0"), "application/json"),
            ErrorFormat::PlainText
        );
        assert_eq!(
            negotiate(Some("application/json;q=0, */*"), "application/json"),
            ErrorFormat::PlainText
        );
    }

    #[test]
    fn test_override_matching() {
        assert!(override_matches("*", None));
        assert!(override_matches("html", Some("text/html,application/xhtml+xml")));
        assert!(!override_matches("html", Some("application/json")));
        assert!(!override_matches("html", None));
    }
}
