//! Serialization of `ResponseError`s.

use std::collections::BTreeMap;

use axum::body::Bytes;
use serde::Serialize;

use crate::errors::{ErrorKind, ResponseError};
use crate::negotiation::{negotiate, ErrorFormat};

/// Wire form of a JSON error body. Field order is part of the contract.
#[derive(Debug, Serialize)]
struct JsonErrorBody<'a> {
    title: &'a str,
    status: u16,
    #[serde(rename = "type")]
    type_url: String,
    details: &'a BTreeMap<String, String>,
}

/// Renders error bodies using the server's documentation base URL and
/// default content type.
#[derive(Debug, Clone)]
pub struct ErrorRenderer {
    docs_url: String,
    default_content_type: String,
}

impl ErrorRenderer {
    pub fn new(docs_url: impl Into<String>, default_content_type: impl Into<String>) -> Self {
        Self {
            docs_url: docs_url.into().trim_end_matches('#').to_string(),
            default_content_type: default_content_type.into(),
        }
    }

    /// Documentation URL for a kind: `{docs_url}#{slug}`.
    pub fn type_url(&self, kind: &ErrorKind) -> String {
        format!("{}#{}", self.docs_url, kind.doc_slug())
    }

    /// Format negotiated for a request's `Accept` header.
    pub fn format_for(&self, accept: Option<&str>) -> ErrorFormat {
        negotiate(accept, &self.default_content_type)
    }

    /// Serialize `err` in the given format.
    pub fn render(&self, err: &ResponseError, format: ErrorFormat) -> Bytes {
        match format {
            ErrorFormat::Json => {
                let body = JsonErrorBody {
                    title: err.title(),
                    status: err.status().as_u16(),
                    type_url: self.type_url(&err.kind()),
                    details: err.details(),
                };
                // A struct of strings and a map of strings always serializes.
                serde_json::to_vec(&body)
                    .map(Bytes::from)
                    .unwrap_or_else(|_| Bytes::from(err.title().to_string()))
            }
            ErrorFormat::PlainText => Bytes::from(err.title().to_string()),
        }
    }
}
