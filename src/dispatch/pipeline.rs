//! Request dispatch pipeline.
//!
//! # Responsibilities
//! - Drive one request through Before → Route → Await → Resolve → After → Done
//! - Funnel every failure (before, gate, route, async) into one resolution
//! - Await async results without blocking a worker thread
//!
//! # Design Decisions
//! - Phases are an explicit state machine; each request owns its `Context`
//! - Async results are spawned, so they complete even if the client goes away
//! - After-handlers always run and have the final word

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header::{self, HeaderValue};
use axum::http::Method;
use axum::response::Response;

use crate::config::ServerConfig;
use crate::errors::{ErrorKind, ErrorRenderer, ExceptionMapper, ResponseError, PAYLOAD_TOO_LARGE};
use crate::http::context::Context;
use crate::http::handler::{Completion, HandlerError, HandlerResult};
use crate::observability::metrics;
use crate::routing::router::{RouteMatch, RouteTable};
use crate::security::access_manager::AccessManager;
use crate::security::roles::RouteRole;

/// Stage of a request inside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    Route,
    Await,
    Resolve,
    After,
    Done,
}

/// Immutable registries and settings shared by every request.
pub struct Dispatcher<R> {
    table: RouteTable<R>,
    access_manager: Box<dyn AccessManager<R>>,
    exceptions: ExceptionMapper,
    renderer: ErrorRenderer,
    default_content_type: String,
    max_body_bytes: usize,
}

impl<R: RouteRole> Dispatcher<R> {
    pub fn new(
        table: RouteTable<R>,
        access_manager: Box<dyn AccessManager<R>>,
        exceptions: ExceptionMapper,
        config: &ServerConfig,
    ) -> Self {
        Self {
            table,
            access_manager,
            exceptions,
            renderer: ErrorRenderer::new(
                config.errors.docs_url.clone(),
                config.http.default_content_type.clone(),
            ),
            default_content_type: config.http.default_content_type.clone(),
            max_body_bytes: config.http.max_body_bytes,
        }
    }

    pub fn routes(&self) -> &RouteTable<R> {
        &self.table
    }

    /// Serve one HTTP request.
    pub async fn dispatch(self: Arc<Self>, request: Request) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let (parts, body) = request.into_parts();

        let (mut ctx, failure) = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => (Context::from_parts(parts, bytes), None),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body");
                let err = ResponseError::new(ErrorKind::Custom(PAYLOAD_TOO_LARGE))
                    .with_title("Request body could not be read")
                    .with_detail("limit", self.max_body_bytes.to_string());
                (Context::from_parts(parts, Bytes::new()), Some(err.into()))
            }
        };
        ctx.set_content_type(&self.default_content_type);

        let ctx = self.run(ctx, failure).await;
        let status = ctx.status();
        let mut response = ctx.into_response();
        if method == Method::HEAD {
            *response.body_mut() = Body::empty();
        }

        metrics::record_request(&method, status, start.elapsed());
        response
    }

    /// Run the phases over a context. `failure` short-circuits to Resolve.
    pub async fn run(&self, mut ctx: Context, mut failure: Option<HandlerError>) -> Context {
        let mut phase = if failure.is_some() {
            Phase::Resolve
        } else {
            Phase::Before
        };

        loop {
            tracing::trace!(phase = ?phase, method = %ctx.method(), path = %ctx.path(), "Dispatch phase");
            phase = match phase {
                Phase::Before => match self.run_before(&mut ctx) {
                    Ok(()) => Phase::Route,
                    Err(err) => {
                        failure = Some(err);
                        Phase::Resolve
                    }
                },
                Phase::Route => match self.run_route(&mut ctx) {
                    Ok(()) if ctx.has_pending() => Phase::Await,
                    Ok(()) => Phase::Resolve,
                    Err(err) => {
                        failure = Some(err);
                        Phase::Resolve
                    }
                },
                Phase::Await => {
                    if let Err(err) = self.await_result(&mut ctx).await {
                        failure = Some(err);
                    }
                    Phase::Resolve
                }
                Phase::Resolve => {
                    if ctx.take_pending().is_some() {
                        tracing::debug!(path = %ctx.path(), "Discarding async result of a failed request");
                    }
                    self.resolve(&mut ctx, failure.take());
                    Phase::After
                }
                Phase::After => {
                    self.run_after(&mut ctx);
                    Phase::Done
                }
                Phase::Done => break,
            };
        }

        ctx
    }

    fn run_before(&self, ctx: &mut Context) -> HandlerResult {
        let path = ctx.path().to_string();
        for (entry, params) in self.table.before_matching(&path) {
            ctx.bind(entry.pattern.as_str(), params);
            entry.handler.handle(ctx)?;
        }
        Ok(())
    }

    fn run_route(&self, ctx: &mut Context) -> HandlerResult {
        let path = ctx.path().to_string();
        match self.table.find(ctx.method(), &path) {
            RouteMatch::Found(route, params) => {
                ctx.bind(route.pattern.as_str(), params);
                self.access_manager.manage(route.handler.as_ref(), ctx, &route.roles)
            }
            RouteMatch::MethodNotAllowed(allowed) => {
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    ctx.set_header(header::ALLOW, value);
                }
                Err(ResponseError::new(ErrorKind::MethodNotAllowed)
                    .with_detail("allowed", allow)
                    .into())
            }
            RouteMatch::NotFound => Err(ResponseError::not_found().into()),
        }
    }

    async fn await_result(&self, ctx: &mut Context) -> HandlerResult {
        let Some(pending) = ctx.take_pending() else {
            return Ok(());
        };

        let outcome = match tokio::spawn(pending.into_inner()).await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(HandlerError::unexpected(join_error)),
        };
        metrics::record_async_result(outcome.is_ok());

        match outcome? {
            Completion::Body(body) => {
                ctx.result(body);
            }
            Completion::Json(body) => {
                ctx.result(body).set_content_type("application/json");
            }
        }
        Ok(())
    }

    fn resolve(&self, ctx: &mut Context, failure: Option<HandlerError>) {
        let handled_by_user = match failure {
            Some(err) => {
                tracing::debug!(error = %err, path = %ctx.path(), "Resolving failed request");
                self.exceptions.handle(err, ctx, &self.renderer)
            }
            None => false,
        };

        if !handled_by_user && self.exceptions.apply_status(ctx) {
            tracing::debug!(status = %ctx.status(), "Applied status override");
        }
    }

    fn run_after(&self, ctx: &mut Context) {
        let path = ctx.path().to_string();
        for (entry, params) in self.table.after_matching(&path) {
            ctx.bind(entry.pattern.as_str(), params);
            if let Err(err) = entry.handler.handle(ctx) {
                tracing::warn!(
                    error = %err,
                    pattern = %entry.pattern,
                    "After handler failed"
                );
                self.resolve(ctx, Some(err));
            }
        }

        if ctx.take_pending().is_some() {
            tracing::warn!(path = %path, "Ignoring async result registered by an after handler");
        }
    }
}
