//! kiln: an embedded HTTP server toolkit.
//!
//! Declarative routes with roles, a pluggable access manager, typed
//! client-facing errors with negotiated JSON or plain-text bodies, and a
//! dispatch pipeline that completes asynchronous handler results without
//! blocking a worker thread.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod http;
pub mod lifecycle;
pub mod negotiation;
pub mod observability;
pub mod routing;
pub mod security;

pub use app::App;
pub use config::schema::ServerConfig;
pub use errors::{CustomKind, ErrorKind, ResponseError};
pub use http::{Context, HandlerError, HandlerResult, HttpServer};
pub use lifecycle::Shutdown;
pub use security::{AccessManager, RoleAccessManager};
