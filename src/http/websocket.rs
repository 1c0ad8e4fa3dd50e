//! WebSocket endpoints.
//!
//! # Responsibilities
//! - Complete the upgrade handshake for registered WebSocket paths
//! - Drive one session: connect, text messages, close, errors
//! - Track live sessions so shutdown can close them
//!
//! # Data Flow
//! ```text
//! Client ──── frames ────→ reader loop → WsHandler callbacks
//! Client ←─── frames ───── writer task ← WsSession::send / close
//! ```
//!
//! # Design Decisions
//! - WebSocket handled separately from the HTTP dispatch pipeline
//! - Outgoing frames go through an unbounded channel so callbacks stay sync
//! - Close status: the peer's code, 1005 without payload, 1006 on loss
//! - Ping/pong handled transparently

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::http::Uri;
use axum::response::Response;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::http::handler::{HandlerError, HandlerResult};
use crate::observability::metrics;
use crate::routing::matcher::{PathParams, PathPattern};

/// Close code reported when a close frame carries no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Close code reported when the connection drops without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code sent to sessions when the server shuts down.
pub const GOING_AWAY: u16 = 1001;
/// Close code sent when the connect handler fails.
pub const INTERNAL_ERROR: u16 = 1011;

/// Failure inside a WebSocket session.
#[derive(Debug, Error)]
pub enum WsError {
    #[error("websocket handler failed: {0}")]
    Handler(#[from] HandlerError),

    #[error("websocket protocol error: {0}")]
    Protocol(#[from] axum::Error),

    #[error("websocket session is closed")]
    Closed,
}

type ConnectHandler = Box<dyn Fn(&WsSession) -> HandlerResult + Send + Sync>;
type MessageHandler = Box<dyn Fn(&WsSession, &str) -> HandlerResult + Send + Sync>;
type CloseHandler = Box<dyn Fn(&WsSession, u16, Option<&str>) -> HandlerResult + Send + Sync>;
type ErrorHandler = Box<dyn Fn(&WsSession, &WsError) + Send + Sync>;

/// Callbacks of one WebSocket endpoint.
#[derive(Default)]
pub struct WsHandler {
    connect: Option<ConnectHandler>,
    message: Option<MessageHandler>,
    close: Option<CloseHandler>,
    error: Option<ErrorHandler>,
}

impl WsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&WsSession) -> HandlerResult + Send + Sync + 'static,
    {
        self.connect = Some(Box::new(f));
        self
    }

    pub fn on_message<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&WsSession, &str) -> HandlerResult + Send + Sync + 'static,
    {
        self.message = Some(Box::new(f));
        self
    }

    /// Called once per session with the close status code and optional reason.
    pub fn on_close<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&WsSession, u16, Option<&str>) -> HandlerResult + Send + Sync + 'static,
    {
        self.close = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&WsSession, &WsError) + Send + Sync + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }

    fn handle_connect(&self, session: &WsSession) -> bool {
        match self.connect.as_ref().map(|f| f(session)) {
            Some(Err(err)) => {
                self.handle_error(session, WsError::Handler(err));
                false
            }
            _ => true,
        }
    }

    fn handle_message(&self, session: &WsSession, text: &str) {
        if let Some(Err(err)) = self.message.as_ref().map(|f| f(session, text)) {
            self.handle_error(session, WsError::Handler(err));
        }
    }

    fn handle_close(&self, session: &WsSession, code: u16, reason: Option<&str>) {
        if let Some(Err(err)) = self.close.as_ref().map(|f| f(session, code, reason)) {
            self.handle_error(session, WsError::Handler(err));
        }
    }

    fn handle_error(&self, session: &WsSession, err: WsError) {
        tracing::warn!(session_id = %session.id(), error = %err, "WebSocket handler error");
        if let Some(f) = &self.error {
            f(session, &err);
        }
    }
}

impl fmt::Debug for WsHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsHandler")
            .field("on_connect", &self.connect.is_some())
            .field("on_message", &self.message.is_some())
            .field("on_close", &self.close.is_some())
            .field("on_error", &self.error.is_some())
            .finish()
    }
}

/// Handle to one live WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsSession {
    id: Uuid,
    path: String,
    params: PathParams,
    outgoing: mpsc::UnboundedSender<Message>,
}

impl WsSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request path the session was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Queue a text message.
    pub fn send(&self, text: impl Into<String>) -> Result<(), WsError> {
        let text: String = text.into();
        self.outgoing
            .send(Message::Text(text.into()))
            .map_err(|_| WsError::Closed)
    }

    /// Start the closing handshake.
    pub fn close(&self, code: u16, reason: &str) -> Result<(), WsError> {
        let frame = CloseFrame {
            code,
            reason: reason.into(),
        };
        self.outgoing
            .send(Message::Close(Some(frame)))
            .map_err(|_| WsError::Closed)
    }
}

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct WsSessions {
    sessions: DashMap<Uuid, WsSession>,
}

impl WsSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn insert(&self, session: WsSession) {
        self.sessions.insert(session.id, session);
        metrics::record_ws_sessions(self.sessions.len());
    }

    fn remove(&self, id: Uuid) {
        self.sessions.remove(&id);
        metrics::record_ws_sessions(self.sessions.len());
    }

    /// Ask every live session to close.
    pub fn close_all(&self, code: u16, reason: &str) {
        for entry in self.sessions.iter() {
            if let Err(e) = entry.value().close(code, reason) {
                tracing::debug!(session_id = %entry.key(), error = %e, "Session already closed");
            }
        }
    }
}

/// A registered WebSocket path and its callbacks.
pub struct WsEndpoint {
    pattern: PathPattern,
    handler: Arc<WsHandler>,
}

impl WsEndpoint {
    pub fn new(pattern: PathPattern, handler: WsHandler) -> Self {
        Self {
            pattern,
            handler: Arc::new(handler),
        }
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Complete the upgrade and run the session in the background.
    pub(crate) fn upgrade(
        &self,
        ws: WebSocketUpgrade,
        uri: &Uri,
        sessions: Arc<WsSessions>,
        max_message_bytes: usize,
    ) -> Response {
        let handler = Arc::clone(&self.handler);
        let path = uri.path().to_string();
        let params = self.pattern.matches(&path).unwrap_or_default();

        ws.max_message_size(max_message_bytes)
            .on_upgrade(move |socket| run_session(socket, handler, sessions, path, params))
    }
}

async fn run_session(
    socket: WebSocket,
    handler: Arc<WsHandler>,
    sessions: Arc<WsSessions>,
    path: String,
    params: PathParams,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let session = WsSession {
        id: Uuid::new_v4(),
        path,
        params,
        outgoing: tx,
    };
    sessions.insert(session.clone());
    tracing::info!(session_id = %session.id, path = %session.path, "WebSocket connected");

    let session_id = session.id;
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = sink.send(message).await {
                tracing::debug!(session_id = %session_id, error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    if !handler.handle_connect(&session) {
        let _ = session.close(INTERNAL_ERROR, "Internal error");
    }

    let mut closed: Option<(u16, Option<String>)> = None;
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) if closed.is_none() => handler.handle_message(&session, text.as_str()),
            Ok(Message::Close(frame)) => {
                // Keep reading so the closing handshake completes.
                closed = Some(match frame {
                    Some(frame) => (frame.code, Some(frame.reason.to_string())),
                    None => (NO_STATUS_RECEIVED, None),
                });
            }
            Ok(_) => {}
            Err(e) => {
                handler.handle_error(&session, WsError::Protocol(e));
                break;
            }
        }
    }

    let (code, reason) = closed.unwrap_or((ABNORMAL_CLOSURE, None));
    let reason = reason.filter(|r| !r.is_empty());
    tracing::info!(session_id = %session.id, code, "WebSocket disconnected");
    handler.handle_close(&session, code, reason.as_deref());

    sessions.remove(session.id);
    writer.abort();
}
