//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (configuration time):
//!     App::routes / ApiBuilder::path (prefix concatenation)
//!     → dsl.rs (verb + roles)
//!     → router.rs (RouteTable, registration order kept)
//!
//! Incoming Request (method, path):
//!     → router.rs (scan routes in order)
//!     → matcher.rs (segment match, capture params)
//!     → Return: Found / MethodNotAllowed / NotFound
//! ```
//!
//! # Design Decisions
//! - Route table built at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod dsl;
pub mod matcher;
pub mod router;

pub use dsl::ApiBuilder;
pub use matcher::{PathParams, PathPattern};
pub use router::{Route, RouteMatch, RouteTable};
