//! Access manager gate.
//!
//! # Responsibilities
//! - Decide whether a route handler runs, given the route's permitted roles
//! - Short-circuit denied requests with a status/body or a `ResponseError`
//!
//! # Design Decisions
//! - The gate owns the call to the handler; the dispatcher never calls a
//!   route handler around it
//! - Without a configured manager every request is granted
//! - Role matching semantics belong to the manager, not the framework

use std::fmt;
use std::marker::PhantomData;

use crate::errors::{ErrorKind, ResponseError};
use crate::http::context::Context;
use crate::http::handler::{Handler, HandlerResult};
use crate::security::roles::{RoleSet, RouteRole};

/// Decides whether `handler` may run for the current request.
pub trait AccessManager<R: RouteRole>: Send + Sync + 'static {
    fn manage(&self, handler: &dyn Handler, ctx: &mut Context, permitted: &RoleSet<R>) -> HandlerResult;
}

/// Closure-backed access manager.
pub struct FnAccessManager<F> {
    f: F,
}

impl<F> FnAccessManager<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<R, F> AccessManager<R> for FnAccessManager<F>
where
    R: RouteRole,
    F: Fn(&dyn Handler, &mut Context, &RoleSet<R>) -> HandlerResult + Send + Sync + 'static,
{
    fn manage(&self, handler: &dyn Handler, ctx: &mut Context, permitted: &RoleSet<R>) -> HandlerResult {
        (self.f)(handler, ctx, permitted)
    }
}

/// Gate used when no access manager is configured: always grants.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrantAll;

impl<R: RouteRole> AccessManager<R> for GrantAll {
    fn manage(&self, handler: &dyn Handler, ctx: &mut Context, _permitted: &RoleSet<R>) -> HandlerResult {
        handler.handle(ctx)
    }
}

/// Grants when the route is unrestricted or the caller holds any permitted
/// role; otherwise fails with `deny_kind` (Unauthorized by default).
///
/// ```
/// use kiln::security::RoleAccessManager;
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// enum Role { Reader, Admin }
///
/// let manager = RoleAccessManager::new(|ctx| match ctx.header("x-role") {
///     Some("admin") => vec![Role::Admin, Role::Reader],
///     Some("reader") => vec![Role::Reader],
///     _ => vec![],
/// });
/// # let _ = manager;
/// ```
pub struct RoleAccessManager<R, F> {
    resolve: F,
    deny_kind: ErrorKind,
    _roles: PhantomData<fn() -> R>,
}

impl<R, F, I> RoleAccessManager<R, F>
where
    R: RouteRole,
    F: Fn(&Context) -> I + Send + Sync + 'static,
    I: IntoIterator<Item = R>,
{
    /// `resolve` returns the roles held by the caller of the current request.
    pub fn new(resolve: F) -> Self {
        Self {
            resolve,
            deny_kind: ErrorKind::Unauthorized,
            _roles: PhantomData,
        }
    }

    /// Kind of the error raised on denial.
    pub fn deny_with(mut self, kind: ErrorKind) -> Self {
        self.deny_kind = kind;
        self
    }
}

impl<R, F, I> AccessManager<R> for RoleAccessManager<R, F>
where
    R: RouteRole,
    F: Fn(&Context) -> I + Send + Sync + 'static,
    I: IntoIterator<Item = R>,
{
    fn manage(&self, handler: &dyn Handler, ctx: &mut Context, permitted: &RoleSet<R>) -> HandlerResult {
        if permitted.is_empty() {
            return handler.handle(ctx);
        }

        let granted = (self.resolve)(ctx)
            .into_iter()
            .any(|role| permitted.contains(&role));

        if granted {
            handler.handle(ctx)
        } else {
            tracing::warn!(
                path = %ctx.path(),
                permitted = ?permitted,
                "Access denied"
            );
            Err(ResponseError::new(self.deny_kind).into())
        }
    }
}

impl<R, F> fmt::Debug for RoleAccessManager<R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleAccessManager")
            .field("deny_kind", &self.deny_kind)
            .finish_non_exhaustive()
    }
}
