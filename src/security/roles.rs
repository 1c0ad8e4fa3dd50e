//! Route roles.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// An authorization tag attached to routes.
///
/// Any small comparable type qualifies; the framework never interprets it.
/// Applications usually declare an enum:
///
/// ```
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// enum Role {
///     Anyone,
///     Admin,
/// }
/// ```
pub trait RouteRole: Debug + Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> RouteRole for T where T: Debug + Clone + Eq + Hash + Send + Sync + 'static {}

/// Roles permitted on a route. Empty means unrestricted.
pub type RoleSet<R> = HashSet<R>;

/// Collect roles into a set.
pub fn role_set<R: RouteRole>(roles: impl IntoIterator<Item = R>) -> RoleSet<R> {
    roles.into_iter().collect()
}
