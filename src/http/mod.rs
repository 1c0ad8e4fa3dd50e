//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, WebSocket routes)
//!     → context.rs (buffered request → Context)
//!     → [dispatch pipeline runs handlers]
//!     → context.rs (Context → Response)
//!     → Send to client
//! ```

pub mod context;
pub mod handler;
pub mod server;
pub mod websocket;

pub use context::Context;
pub use handler::{AsyncResult, BoxError, Completion, Handler, HandlerError, HandlerResult};
pub use server::{HttpServer, ServerError};
pub use websocket::{WsError, WsHandler, WsSession, WsSessions};
