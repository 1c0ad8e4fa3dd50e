//! Handler boundary types.
//!
//! # Responsibilities
//! - Define the `Handler` trait every before/route/after handler satisfies
//! - Classify handler failures into typed and unexpected errors
//! - Represent deferred (async) handler results
//!
//! # Design Decisions
//! - Handlers are synchronous; async work is handed to the context as a
//!   `'static` future, so the handler never holds the context across an await
//! - Unexpected errors keep their concrete type so they can be matched later

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use axum::body::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::errors::ResponseError;
use crate::http::context::Context;

/// Boxed unexpected error.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result returned by every handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Failure produced by a handler, an access manager or an async result.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Client-facing error, serialized through the error taxonomy.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Any other failure, routed to the unexpected-error handlers.
    #[error("{0}")]
    Unexpected(BoxError),
}

impl HandlerError {
    /// Wrap an arbitrary error as unexpected.
    pub fn unexpected<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        HandlerError::Unexpected(Box::new(err))
    }

    pub fn as_response(&self) -> Option<&ResponseError> {
        match self {
            HandlerError::Response(err) => Some(err),
            HandlerError::Unexpected(_) => None,
        }
    }
}

/// A request handler.
///
/// Implemented for every `Fn(&mut Context) -> HandlerResult`; registration
/// methods take closures directly so their argument types are inferred.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, ctx: &mut Context) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut Context) -> HandlerResult {
        self(ctx)
    }
}

/// Successful value of an async result.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Raw body; the response content type is left as is.
    Body(Bytes),
    /// Serialized JSON body.
    Json(Bytes),
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A deferred handler outcome, awaited once by the dispatcher.
pub struct AsyncResult {
    inner: BoxFuture<Result<Completion, HandlerError>>,
}

impl AsyncResult {
    /// Future resolving to a raw body.
    pub fn body<F, B>(future: F) -> Self
    where
        F: Future<Output = Result<B, HandlerError>> + Send + 'static,
        B: Into<Bytes>,
    {
        Self {
            inner: Box::pin(async move { future.await.map(|b| Completion::Body(b.into())) }),
        }
    }

    /// Future resolving to a value serialized as JSON.
    pub fn json<F, T>(future: F) -> Self
    where
        F: Future<Output = Result<T, HandlerError>> + Send + 'static,
        T: Serialize,
    {
        Self {
            inner: Box::pin(async move {
                let value = future.await?;
                serde_json::to_vec(&value)
                    .map(|v| Completion::Json(Bytes::from(v)))
                    .map_err(HandlerError::unexpected)
            }),
        }
    }

    pub(crate) fn into_inner(self) -> BoxFuture<Result<Completion, HandlerError>> {
        self.inner
    }
}

impl fmt::Debug for AsyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[test]
    fn test_response_error_converts() {
        let err: HandlerError = ResponseError::not_found().into();
        assert_eq!(err.as_response().map(|e| e.status().as_u16()), Some(404));
        assert_eq!(err.to_string(), "404 Not found");
    }

    #[test]
    fn test_unexpected_keeps_type() {
        let err = HandlerError::unexpected(DiskError);
        match err {
            HandlerError::Unexpected(inner) => assert!(inner.downcast_ref::<DiskError>().is_some()),
            HandlerError::Response(_) => panic!("expected unexpected error"),
        }
    }

    #[tokio::test]
    async fn test_json_completion() {
        let result = AsyncResult::json(async { Ok::<_, HandlerError>(vec![1, 2, 3]) });
        let completion = result.into_inner().await.unwrap();
        assert_eq!(completion, Completion::Json(Bytes::from_static(b"[1,2,3]")));
    }
}
