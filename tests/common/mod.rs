//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use kiln::config::ServerConfig;
use kiln::lifecycle::Shutdown;
use kiln::security::RouteRole;
use kiln::App;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// A server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.handle.await;
    }
}

/// Start `app` on 127.0.0.1 with an ephemeral port.
pub async fn spawn_app<R: RouteRole>(app: App<R>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = app.into_server().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        server.run(listener, receiver).await.unwrap();
    });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Router of `app`, for in-process requests.
pub fn router<R: RouteRole>(app: App<R>) -> Router {
    app.into_server().unwrap().router()
}

/// Send a GET with an `Accept` header through the router.
pub async fn get(router: &Router, path: &str, accept: &str) -> Response<Body> {
    send(
        router,
        Request::get(path)
            .header("Accept", accept)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn config() -> ServerConfig {
    ServerConfig::default()
}

pub fn json_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.http.default_content_type = "application/json".to_string();
    config
}
