//! Error taxonomy subsystem.
//!
//! # Data Flow
//! ```text
//! HandlerError (from before/route/after handler, access manager, async result)
//!     → mapper.rs (kind override? unexpected handler? status override?)
//!     → render.rs (negotiated JSON or plain-text body)
//!     → Context status/body/content type
//! ```
//!
//! # Design Decisions
//! - Built-in kinds are a closed enum; applications extend with `CustomKind`
//! - JSON bodies always carry `title`, `status`, `type`, `details` in that order
//! - Unexpected errors are never serialized as-is

pub mod mapper;
pub mod render;
pub mod response;

pub use mapper::ExceptionMapper;
pub use render::ErrorRenderer;
pub use response::{CustomKind, ErrorKind, ResponseError, FALLBACK_DOC_SLUG, PAYLOAD_TOO_LARGE};
