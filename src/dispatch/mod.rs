//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! axum catch-all handler (buffered request)
//!     → Context (method, path, query, headers, body)
//!     → Before: matching before-handlers, in registration order
//!     → Route: route lookup → access manager → route handler
//!     → Await: spawned async result, awaited once (optional)
//!     → Resolve: kind override / unexpected registry / taxonomy / status override
//!     → After: matching after-handlers, always
//!     → Done: Context → http::Response
//! ```
//!
//! # Design Decisions
//! - One failure slot per request; the first failure wins
//! - Registries are frozen before serving begins and shared behind `Arc`

pub mod pipeline;

pub use pipeline::{Dispatcher, Phase};
