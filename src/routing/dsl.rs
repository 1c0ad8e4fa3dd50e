//! Route registration DSL.
//!
//! ```
//! use kiln::App;
//!
//! let mut app = App::new(Default::default());
//! app.routes(|api| {
//!     api.path("/users", |api| {
//!         api.get("", |ctx| {
//!             ctx.result("all users");
//!             Ok(())
//!         });
//!         api.get("/:id", |ctx| {
//!             let id = ctx.path_param("id").unwrap_or_default().to_string();
//!             ctx.result(id);
//!             Ok(())
//!         });
//!     });
//! });
//! ```

use std::sync::Arc;

use axum::http::Method;

use crate::http::context::Context;
use crate::http::handler::HandlerResult;
use crate::routing::matcher::join_paths;
use crate::routing::router::RouteTable;
use crate::security::roles::{role_set, RoleSet, RouteRole};

/// Registers routes under a path prefix.
pub struct ApiBuilder<'a, R> {
    table: &'a mut RouteTable<R>,
    prefix: String,
}

macro_rules! verb {
    ($name:ident, $with_roles:ident, $method:expr) => {
        pub fn $name<F>(&mut self, path: &str, handler: F) -> &mut Self
        where
            F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
        {
            self.register($method, path, handler, RoleSet::new())
        }

        pub fn $with_roles<F>(&mut self, path: &str, handler: F, roles: impl IntoIterator<Item = R>) -> &mut Self
        where
            F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
        {
            self.register($method, path, handler, role_set(roles))
        }
    };
}

impl<'a, R: RouteRole> ApiBuilder<'a, R> {
    pub(crate) fn new(table: &'a mut RouteTable<R>) -> Self {
        Self {
            table,
            prefix: String::new(),
        }
    }

    /// Register everything inside `f` under `prefix`, appended to the
    /// current prefix.
    pub fn path<F>(&mut self, prefix: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut ApiBuilder<'_, R>),
    {
        let mut nested = ApiBuilder {
            table: &mut *self.table,
            prefix: join_paths(&self.prefix, prefix),
        };
        f(&mut nested);
        self
    }

    verb!(get, get_with_roles, Method::GET);
    verb!(post, post_with_roles, Method::POST);
    verb!(put, put_with_roles, Method::PUT);
    verb!(patch, patch_with_roles, Method::PATCH);
    verb!(delete, delete_with_roles, Method::DELETE);
    verb!(head, head_with_roles, Method::HEAD);
    verb!(options, options_with_roles, Method::OPTIONS);

    /// Before handler scoped to the current prefix (`"*"` for all of it).
    pub fn before<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        let path = self.full_path(path);
        self.table.add_before(&path, Arc::new(handler));
        self
    }

    /// After handler scoped to the current prefix (`"*"` for all of it).
    pub fn after<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        let path = self.full_path(path);
        self.table.add_after(&path, Arc::new(handler));
        self
    }

    fn register<F>(&mut self, method: Method, path: &str, handler: F, roles: RoleSet<R>) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        let path = self.full_path(path);
        self.table.add_route(method, &path, Arc::new(handler), roles);
        self
    }

    fn full_path(&self, path: &str) -> String {
        join_paths(&self.prefix, path)
    }
}
