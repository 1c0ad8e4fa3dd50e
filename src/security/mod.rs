//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Route found (handler, permitted roles):
//!     → access_manager.rs (configured gate, or GrantAll)
//!     → granted: gate invokes the handler
//!     → denied: gate sets status/body or fails with a ResponseError
//!     → Pass outcome to resolution
//! ```
//!
//! # Design Decisions
//! - Roles are opaque to the framework (roles.rs)
//! - Fail closed: the stock role gate denies unless a permitted role is held
//! - A gate failure is resolved exactly like a handler failure

pub mod access_manager;
pub mod roles;

pub use access_manager::{AccessManager, FnAccessManager, GrantAll, RoleAccessManager};
pub use roles::{role_set, RoleSet, RouteRole};
