//! Application builder.
//!
//! # Responsibilities
//! - Collect routes, before/after handlers, the access manager and every
//!   error override at configuration time
//! - Freeze them into an immutable `Dispatcher` owned by the `HttpServer`
//!
//! # Design Decisions
//! - Registration needs `&mut App`; once `into_server` consumes the builder
//!   nothing can be registered while serving
//! - Roles are a type parameter so routes and the access manager agree on them

use std::error::Error as StdError;
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::errors::{ErrorKind, ExceptionMapper, ResponseError};
use crate::http::context::Context;
use crate::http::handler::{Handler, HandlerResult};
use crate::http::server::{HttpServer, ServerError};
use crate::http::websocket::{WsEndpoint, WsHandler};
use crate::routing::dsl::ApiBuilder;
use crate::routing::matcher::PathPattern;
use crate::routing::router::RouteTable;
use crate::security::access_manager::{AccessManager, FnAccessManager, GrantAll};
use crate::security::roles::{role_set, RoleSet, RouteRole};

/// Configuration-time registry of a kiln application.
///
/// ```no_run
/// use kiln::{App, ResponseError};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut app = App::new(Default::default());
/// app.get("/hello", |ctx| {
///     ctx.result("Hello");
///     Ok(())
/// });
/// app.get("/nope", |_| Err(ResponseError::bad_request().into()));
///
/// let server = app.into_server()?;
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// let shutdown = kiln::Shutdown::new();
/// server.run(listener, shutdown.subscribe()).await?;
/// # Ok(())
/// # }
/// ```
pub struct App<R = ()> {
    config: ServerConfig,
    table: RouteTable<R>,
    access_manager: Option<Box<dyn AccessManager<R>>>,
    exceptions: ExceptionMapper,
    ws_endpoints: Vec<WsEndpoint>,
}

impl App<()> {
    /// An application without route roles.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_roles(config)
    }
}

impl<R: RouteRole> App<R> {
    /// An application whose routes are tagged with roles of type `R`.
    pub fn with_roles(config: ServerConfig) -> Self {
        Self {
            config,
            table: RouteTable::new(),
            access_manager: None,
            exceptions: ExceptionMapper::new(),
            ws_endpoints: Vec::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register routes through the DSL.
    pub fn routes<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut ApiBuilder<'_, R>),
    {
        let mut api = ApiBuilder::new(&mut self.table);
        f(&mut api);
        self
    }

    /// Register a route with explicit roles.
    pub fn add_route<F>(&mut self, method: Method, path: &str, handler: F, roles: impl IntoIterator<Item = R>) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.add_route(method, path, Arc::new(handler), role_set(roles));
        self
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_route(Method::GET, path, handler, RoleSet::new())
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_route(Method::POST, path, handler, RoleSet::new())
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_route(Method::PUT, path, handler, RoleSet::new())
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_route(Method::PATCH, path, handler, RoleSet::new())
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_route(Method::DELETE, path, handler, RoleSet::new())
    }

    /// Before handler for requests matching `path`.
    pub fn before<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.add_before(path, Arc::new(handler));
        self
    }

    /// After handler for requests matching `path`.
    pub fn after<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.table.add_after(path, Arc::new(handler));
        self
    }

    pub fn before_all<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.before("*", handler)
    }

    pub fn after_all<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.after("*", handler)
    }

    /// Gate every route handler through `manager`.
    pub fn access_manager(&mut self, manager: impl AccessManager<R>) -> &mut Self {
        if self.access_manager.replace(Box::new(manager)).is_some() {
            tracing::debug!("Replacing access manager");
        }
        self
    }

    /// Gate every route handler through a closure.
    pub fn access_manager_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&dyn Handler, &mut Context, &RoleSet<R>) -> HandlerResult + Send + Sync + 'static,
    {
        self.access_manager(FnAccessManager::new(f))
    }

    /// Replace the default resolution of errors of `kind`.
    pub fn exception<F>(&mut self, kind: ErrorKind, handler: F) -> &mut Self
    where
        F: Fn(&ResponseError, &mut Context) + Send + Sync + 'static,
    {
        self.exceptions.on_kind(kind, handler);
        self
    }

    /// Handle unexpected errors of type `E`, anywhere in the source chain.
    pub fn unexpected<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: StdError + 'static,
        F: Fn(&E, &mut Context) + Send + Sync + 'static,
    {
        self.exceptions.on_unexpected::<E, F>(handler);
        self
    }

    /// Override responses with `status` for requests accepting
    /// `content_type` (`"*"` for all requests).
    pub fn error<F>(&mut self, status: StatusCode, content_type: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.exceptions.on_status(status, content_type, handler);
        self
    }

    /// Register a WebSocket endpoint.
    pub fn ws<F>(&mut self, path: &str, configure: F) -> &mut Self
    where
        F: FnOnce(&mut WsHandler),
    {
        let mut handler = WsHandler::new();
        configure(&mut handler);
        tracing::debug!(path = %path, handler = ?handler, "WebSocket endpoint registered");
        self.ws_endpoints
            .push(WsEndpoint::new(PathPattern::parse(path), handler));
        self
    }

    /// Freeze the registries into a server.
    pub fn into_server(self) -> Result<HttpServer<R>, ServerError> {
        let access_manager = self
            .access_manager
            .unwrap_or_else(|| Box::new(GrantAll));
        let dispatcher = Dispatcher::new(self.table, access_manager, self.exceptions, &self.config);
        HttpServer::new(dispatcher, self.ws_endpoints, self.config)
    }
}
