//! Error resolution registries.
//!
//! # Responsibilities
//! - Per-kind overrides for `ResponseError`s (built-in and custom kinds)
//! - Type-keyed handlers for unexpected errors
//! - Per-status / content-type overrides
//! - Default resolution through the taxonomy renderer
//!
//! # Design Decisions
//! - Populated at configuration time, read-only while serving
//! - Unexpected errors are matched against the error first, then its
//!   `source()` chain; the nearest registered type wins
//! - A status override suppresses the taxonomy body for that status

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;

use crate::errors::render::ErrorRenderer;
use crate::errors::{ErrorKind, ResponseError};
use crate::http::context::Context;
use crate::http::handler::{BoxError, HandlerError};
use crate::negotiation::override_matches;
use crate::observability::metrics;

type KindHandler = Arc<dyn Fn(&ResponseError, &mut Context) + Send + Sync>;
type StatusHandler = Arc<dyn Fn(&mut Context) + Send + Sync>;
type UnexpectedHandler = Box<dyn Fn(&(dyn StdError + 'static), &mut Context) -> bool + Send + Sync>;

struct UnexpectedEntry {
    type_id: TypeId,
    type_name: &'static str,
    handler: UnexpectedHandler,
}

struct StatusEntry {
    status: StatusCode,
    content_type: String,
    handler: StatusHandler,
}

/// Registry consulted when a request fails or ends with an overridden status.
#[derive(Default)]
pub struct ExceptionMapper {
    kinds: HashMap<ErrorKind, KindHandler>,
    unexpected: Vec<UnexpectedEntry>,
    statuses: Vec<StatusEntry>,
}

impl ExceptionMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default resolution of `kind`.
    pub fn on_kind<F>(&mut self, kind: ErrorKind, handler: F)
    where
        F: Fn(&ResponseError, &mut Context) + Send + Sync + 'static,
    {
        if self.kinds.insert(kind, Arc::new(handler)).is_some() {
            tracing::debug!(kind = %kind, "Replacing error kind handler");
        }
    }

    /// Handle unexpected errors of concrete type `E`.
    pub fn on_unexpected<E, F>(&mut self, handler: F)
    where
        E: StdError + 'static,
        F: Fn(&E, &mut Context) + Send + Sync + 'static,
    {
        let entry = UnexpectedEntry {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            handler: Box::new(move |err: &(dyn StdError + 'static), ctx: &mut Context| match err.downcast_ref::<E>() {
                Some(err) => {
                    handler(err, ctx);
                    true
                }
                None => false,
            }),
        };

        match self.unexpected.iter_mut().find(|e| e.type_id == entry.type_id) {
            Some(existing) => {
                tracing::debug!(error_type = entry.type_name, "Replacing unexpected error handler");
                *existing = entry;
            }
            None => self.unexpected.push(entry),
        }
    }

    /// Override responses with `status` for requests accepting `content_type`
    /// (`"*"` for every request).
    pub fn on_status<F>(&mut self, status: StatusCode, content_type: impl Into<String>, handler: F)
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        let content_type = content_type.into();
        self.statuses
            .retain(|e| !(e.status == status && e.content_type == content_type));
        self.statuses.push(StatusEntry {
            status,
            content_type,
            handler: Arc::new(handler),
        });
    }

    /// Resolve a failure into the context's status and body.
    ///
    /// Returns `true` when a registered kind or unexpected-error handler
    /// produced the response; status overrides must not run after it.
    pub fn handle(&self, err: HandlerError, ctx: &mut Context, renderer: &ErrorRenderer) -> bool {
        match err {
            HandlerError::Response(err) => self.handle_response(&err, ctx, renderer),
            HandlerError::Unexpected(err) => self.handle_unexpected(err, ctx, renderer),
        }
    }

    fn handle_response(&self, err: &ResponseError, ctx: &mut Context, renderer: &ErrorRenderer) -> bool {
        metrics::record_error(err.kind().name());

        if let Some(handler) = self.kinds.get(&err.kind()) {
            tracing::debug!(kind = %err.kind(), "Resolving with registered kind handler");
            handler(err, ctx);
            return true;
        }

        ctx.set_status(err.status());
        if self.find_status(err.status(), ctx.accept()).is_some() {
            // Rendered by the status override during resolution.
            ctx.result(Bytes::new());
            return false;
        }

        let format = renderer.format_for(ctx.accept());
        ctx.result(renderer.render(err, format))
            .set_content_type(format.content_type());
        false
    }

    fn handle_unexpected(&self, err: BoxError, ctx: &mut Context, renderer: &ErrorRenderer) -> bool {
        if let Some(response) = err.downcast_ref::<ResponseError>() {
            return self.handle_response(response, ctx, renderer);
        }

        let root: &(dyn StdError + 'static) = err.as_ref();
        let mut current = Some(root);
        while let Some(cause) = current {
            for entry in &self.unexpected {
                if (entry.handler)(cause, ctx) {
                    tracing::debug!(error_type = entry.type_name, "Resolved unexpected error");
                    metrics::record_error(entry.type_name);
                    return true;
                }
            }
            current = cause.source();
        }

        tracing::error!(
            error = %err,
            path = %ctx.path(),
            "Unhandled error in request handler"
        );
        self.handle_response(&ResponseError::internal_server_error(), ctx, renderer)
    }

    /// Run the status override matching the context's current status, if any.
    /// Returns whether one ran.
    pub fn apply_status(&self, ctx: &mut Context) -> bool {
        match self.find_status(ctx.status(), ctx.accept()) {
            Some(handler) => {
                handler(ctx);
                true
            }
            None => false,
        }
    }

    fn find_status(&self, status: StatusCode, accept: Option<&str>) -> Option<&StatusHandler> {
        let matching = |e: &&StatusEntry| e.status == status && override_matches(&e.content_type, accept);
        self.statuses
            .iter()
            .filter(|e| e.content_type != "*")
            .find(matching)
            .or_else(|| self.statuses.iter().filter(|e| e.content_type == "*").find(matching))
            .map(|e| &e.handler)
    }
}
