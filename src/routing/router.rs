//! Route table and lookup.
//!
//! # Responsibilities
//! - Store route handlers and before/after handlers in registration order
//! - Look up the route for a request
//! - Return a matched route, a method mismatch, or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in registration order; the first matching route wins
//! - Explicit `NotFound` / `MethodNotAllowed` rather than a silent default

use std::sync::Arc;

use axum::http::Method;

use crate::http::handler::Handler;
use crate::routing::matcher::{PathParams, PathPattern};
use crate::security::roles::{RoleSet, RouteRole};

/// A registered endpoint.
pub struct Route<R> {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: Arc<dyn Handler>,
    pub roles: RoleSet<R>,
}

/// A before or after handler bound to a path pattern.
pub struct HandlerEntry {
    pub pattern: PathPattern,
    pub handler: Arc<dyn Handler>,
}

/// Outcome of a route lookup.
pub enum RouteMatch<'a, R> {
    Found(&'a Route<R>, PathParams),
    /// The path matched, but not with this method.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Every handler the dispatcher knows about.
pub struct RouteTable<R> {
    routes: Vec<Route<R>>,
    before: Vec<HandlerEntry>,
    after: Vec<HandlerEntry>,
}

impl<R> Default for RouteTable<R> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }
}

impl<R: RouteRole> RouteTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, method: Method, path: &str, handler: Arc<dyn Handler>, roles: RoleSet<R>) {
        let pattern = PathPattern::parse(path);
        if self
            .routes
            .iter()
            .any(|r| r.method == method && r.pattern == pattern)
        {
            tracing::warn!(
                method = %method,
                path = %pattern,
                "Route already registered; the first registration wins"
            );
        }
        tracing::debug!(method = %method, path = %pattern, roles = ?roles, "Route registered");
        self.routes.push(Route {
            method,
            pattern,
            handler,
            roles,
        });
    }

    pub fn add_before(&mut self, path: &str, handler: Arc<dyn Handler>) {
        self.before.push(HandlerEntry {
            pattern: PathPattern::parse(path),
            handler,
        });
    }

    pub fn add_after(&mut self, path: &str, handler: Arc<dyn Handler>) {
        self.after.push(HandlerEntry {
            pattern: PathPattern::parse(path),
            handler,
        });
    }

    /// Find the route for `method` and `path`.
    ///
    /// HEAD falls back to a GET route when no HEAD route matches.
    pub fn find(&self, method: &Method, path: &str) -> RouteMatch<'_, R> {
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            if route.method == *method {
                return RouteMatch::Found(route, params);
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }

        if *method == Method::HEAD {
            if let Some((route, params)) = self.find_exact(&Method::GET, path) {
                return RouteMatch::Found(route, params);
            }
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed(allowed)
        }
    }

    fn find_exact(&self, method: &Method, path: &str) -> Option<(&Route<R>, PathParams)> {
        self.routes
            .iter()
            .filter(|r| r.method == *method)
            .find_map(|r| r.pattern.matches(path).map(|p| (r, p)))
    }

    /// Before handlers matching `path`, in registration order.
    pub fn before_matching<'a>(&'a self, path: &'a str) -> impl Iterator<Item = (&'a HandlerEntry, PathParams)> + 'a {
        matching(&self.before, path)
    }

    /// After handlers matching `path`, in registration order.
    pub fn after_matching<'a>(&'a self, path: &'a str) -> impl Iterator<Item = (&'a HandlerEntry, PathParams)> + 'a {
        matching(&self.after, path)
    }

    pub fn routes(&self) -> &[Route<R>] {
        &self.routes
    }
}

fn matching<'a>(entries: &'a [HandlerEntry], path: &'a str) -> impl Iterator<Item = (&'a HandlerEntry, PathParams)> + 'a {
    entries
        .iter()
        .filter_map(move |e| e.pattern.matches(path).map(|p| (e, p)))
}
