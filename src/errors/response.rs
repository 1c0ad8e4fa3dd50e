//! Status-carrying response errors.
//!
//! # Responsibilities
//! - Define the closed set of built-in error kinds (status, default title, doc slug)
//! - Provide an extension point for application-defined kinds
//! - Carry a title and a free-form detail map to the client
//!
//! # Design Decisions
//! - Kinds are plain `Copy` values so they can key override registries
//! - Errors are immutable; builder methods consume and return `Self`
//! - Details are kept in a `BTreeMap` so serialized output is deterministic

use std::collections::BTreeMap;
use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

/// Documentation anchor used for kinds without a slug of their own.
pub const FALLBACK_DOC_SLUG: &str = "error-responses";

/// Raised when a request body exceeds `http.max_body_bytes` or cannot be read.
pub const PAYLOAD_TOO_LARGE: CustomKind =
    CustomKind::new("PayloadTooLarge", StatusCode::PAYLOAD_TOO_LARGE).documented("payload-too-large");

/// An application-defined error kind.
///
/// Declare one as a constant and raise it with [`ResponseError::new`]:
///
/// ```
/// use kiln::errors::{CustomKind, ErrorKind, ResponseError};
/// use axum::http::StatusCode;
///
/// const TEAPOT: CustomKind = CustomKind::new("Teapot", StatusCode::IM_A_TEAPOT);
///
/// let err = ResponseError::new(ErrorKind::Custom(TEAPOT)).with_title("Short and stout");
/// assert_eq!(err.status(), StatusCode::IM_A_TEAPOT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomKind {
    name: &'static str,
    status: StatusCode,
    doc_slug: Option<&'static str>,
}

impl CustomKind {
    /// Create a kind with no documentation anchor.
    pub const fn new(name: &'static str, status: StatusCode) -> Self {
        Self {
            name,
            status,
            doc_slug: None,
        }
    }

    /// Attach a documentation anchor to this kind.
    pub const fn documented(mut self, slug: &'static str) -> Self {
        self.doc_slug = Some(slug);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Kind of a [`ResponseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    Gone,
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    /// Application-defined kind.
    Custom(CustomKind),
}

impl ErrorKind {
    /// HTTP status produced by this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Gone => StatusCode::GONE,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Custom(custom) => custom.status,
        }
    }

    /// Title used when the error is raised without a message.
    pub fn default_title(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not found",
            ErrorKind::MethodNotAllowed => "Method not allowed",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Gone => "Gone",
            ErrorKind::InternalServerError => "Internal server error",
            ErrorKind::BadGateway => "Bad gateway",
            ErrorKind::ServiceUnavailable => "Service unavailable",
            ErrorKind::GatewayTimeout => "Gateway timeout",
            ErrorKind::Custom(_) => "",
        }
    }

    /// Name of the kind, as used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Gone => "Gone",
            ErrorKind::InternalServerError => "InternalServerError",
            ErrorKind::BadGateway => "BadGateway",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
            ErrorKind::GatewayTimeout => "GatewayTimeout",
            ErrorKind::Custom(custom) => custom.name,
        }
    }

    /// Documentation anchor: the kind name lower-cased and hyphenated.
    pub fn doc_slug(&self) -> String {
        match self {
            ErrorKind::Custom(custom) => custom
                .doc_slug
                .unwrap_or(FALLBACK_DOC_SLUG)
                .to_string(),
            builtin => hyphenate(builtin.name()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `BadRequest` -> `bad-request`.
fn hyphenate(name: &str) -> String {
    let mut slug = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
        } else {
            slug.push(c);
        }
    }
    slug
}

/// A client-facing error with a status, a title and structured details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} {}", .kind.status().as_u16(), .title)]
pub struct ResponseError {
    kind: ErrorKind,
    title: String,
    details: BTreeMap<String, String>,
}

impl ResponseError {
    /// Create an error carrying the kind's default title.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            title: kind.default_title().to_string(),
            details: BTreeMap::new(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new(ErrorKind::BadRequest)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    pub fn internal_server_error() -> Self {
        Self::new(ErrorKind::InternalServerError)
    }

    /// Replace the default title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Replace the detail map.
    pub fn with_details<K, V>(mut self, details: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.details = details
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Add a single detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }
}
