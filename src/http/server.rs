//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler and WebSocket endpoints
//! - Wire up middleware (tracing, request ID, limits, timeout, panics)
//! - Bind server to listener
//! - Graceful shutdown, closing live WebSocket sessions

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderValue};
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::errors::ErrorKind;
use crate::http::websocket::{WsEndpoint, WsSessions, GOING_AWAY};
use crate::security::roles::RouteRole;

/// Error type for server construction and serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket path '{0}' must not contain wildcards")]
    InvalidWebSocketPath(String),

    #[error("WebSocket path '{0}' registered twice")]
    DuplicateWebSocketPath(String),
}

/// HTTP server for a kiln application.
pub struct HttpServer<R> {
    dispatcher: Arc<Dispatcher<R>>,
    ws_endpoints: Vec<(String, Arc<WsEndpoint>)>,
    sessions: Arc<WsSessions>,
    config: ServerConfig,
}

impl<R: RouteRole> HttpServer<R> {
    /// Create a server from a frozen dispatcher and WebSocket endpoints.
    pub fn new(
        dispatcher: Dispatcher<R>,
        endpoints: Vec<WsEndpoint>,
        config: ServerConfig,
    ) -> Result<Self, ServerError> {
        let mut seen = HashSet::new();
        let mut ws_endpoints = Vec::with_capacity(endpoints.len());

        for endpoint in endpoints {
            let raw = endpoint.pattern().as_str().to_string();
            let path = endpoint
                .pattern()
                .to_axum_path()
                .ok_or_else(|| ServerError::InvalidWebSocketPath(raw.clone()))?;
            if !seen.insert(path.clone()) {
                return Err(ServerError::DuplicateWebSocketPath(raw));
            }
            ws_endpoints.push((path, Arc::new(endpoint)));
        }

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            ws_endpoints,
            sessions: Arc::new(WsSessions::new()),
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let max_message_bytes = self.config.websocket.max_message_bytes;
        let mut router = Router::new();

        for (path, endpoint) in &self.ws_endpoints {
            let endpoint = Arc::clone(endpoint);
            let sessions = Arc::clone(&self.sessions);
            router = router.route(
                path,
                any(move |ws: WebSocketUpgrade, uri: Uri| {
                    let endpoint = Arc::clone(&endpoint);
                    let sessions = Arc::clone(&sessions);
                    async move { endpoint.upgrade(ws, &uri, sessions, max_message_bytes) }
                }),
            );
        }

        let mut router = router
            .fallback(dispatch_request::<R>)
            .with_state(Arc::clone(&self.dispatcher));

        if let Some(timeout) = self.config.http.request_timeout() {
            router = router.layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout));
        }

        router
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(GlobalConcurrencyLimitLayer::new(
                self.config.listener.max_concurrent_requests,
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Live WebSocket sessions.
    pub fn sessions(&self) -> Arc<WsSessions> {
        Arc::clone(&self.sessions)
    }

    pub fn dispatcher(&self) -> &Dispatcher<R> {
        &self.dispatcher
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.routes().routes().len(),
            websockets = self.ws_endpoints.len(),
            "HTTP server starting"
        );

        let sessions = Arc::clone(&self.sessions);
        let app = self.router();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!(sessions = sessions.len(), "Shutdown signal received");
                sessions.close_all(GOING_AWAY, "Server shutting down");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every non-WebSocket request goes through the pipeline.
async fn dispatch_request<R: RouteRole>(
    State(dispatcher): State<Arc<Dispatcher<R>>>,
    request: Request,
) -> Response {
    dispatcher.dispatch(request).await
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %message, "Request handler panicked");

    let kind = ErrorKind::InternalServerError;
    let mut response = Response::new(Body::from(kind.default_title()));
    *response.status_mut() = kind.status();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
