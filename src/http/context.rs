//! Per-request context shared by every handler phase.
//!
//! # Responsibilities
//! - Expose the incoming request (method, path, params, headers, body)
//! - Accumulate the outgoing response (status, headers, body)
//! - Hold at most one pending async result for the dispatcher
//!
//! # Design Decisions
//! - Owned by exactly one in-flight request; never shared between tasks
//! - Response headers use `HeaderMap`, so lookups are case-insensitive
//! - Typed request-scoped attributes live in `http::Extensions`

use std::collections::HashMap;
use std::future::Future;

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderValue, IntoHeaderName};
use axum::http::request::Parts;
use axum::http::{Extensions, Method, StatusCode, Uri};
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::ResponseError;
use crate::http::handler::{AsyncResult, HandlerError, HandlerResult};

/// Mutable state of one request.
#[derive(Debug)]
pub struct Context {
    method: Method,
    uri: Uri,
    request_headers: HeaderMap,
    body: Bytes,
    query: Vec<(String, String)>,
    path_params: HashMap<String, String>,
    matched_path: Option<String>,
    extensions: Extensions,
    status: StatusCode,
    response_headers: HeaderMap,
    response_body: Bytes,
    pending: Option<AsyncResult>,
}

impl Context {
    /// Build a context from request parts and an already-buffered body.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        let query = parts
            .uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            method: parts.method,
            uri: parts.uri,
            request_headers: parts.headers,
            body,
            query,
            path_params: HashMap::new(),
            matched_path: None,
            extensions: parts.extensions,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: Bytes::new(),
            pending: None,
        }
    }

    // ----- request -----

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Request header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request_headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    /// Raw `Accept` header.
    pub fn accept(&self) -> Option<&str> {
        self.header(header::ACCEPT.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request body as UTF-8 text.
    pub fn body_str(&self) -> Result<&str, ResponseError> {
        std::str::from_utf8(&self.body).map_err(|e| {
            ResponseError::bad_request()
                .with_title("Request body is not valid UTF-8")
                .with_detail("error", e.to_string())
        })
    }

    /// Request body deserialized from JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, ResponseError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ResponseError::bad_request()
                .with_title("Request body is not valid JSON")
                .with_detail("error", e.to_string())
        })
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a query parameter, in request order.
    pub fn query_params(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Path parameter of the handler currently running.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    /// Pattern of the handler currently running.
    pub fn matched_path(&self) -> Option<&str> {
        self.matched_path.as_deref()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    // ----- response -----

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Replace the response body.
    pub fn result(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.response_body = body.into();
        self
    }

    pub fn result_bytes(&self) -> &Bytes {
        &self.response_body
    }

    /// Response body as text, if it is valid UTF-8.
    pub fn result_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.response_body).ok()
    }

    /// Serialize `value` as the JSON response body.
    pub fn json<T: Serialize>(&mut self, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value).map_err(HandlerError::unexpected)?;
        self.response_body = Bytes::from(body);
        self.set_content_type("application/json");
        Ok(())
    }

    /// Set an HTML response body.
    pub fn html(&mut self, html: impl Into<String>) -> &mut Self {
        self.response_body = Bytes::from(html.into());
        self.set_content_type("text/html; charset=utf-8")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.response_header(header::CONTENT_TYPE.as_str())
    }

    /// Set the response content type. Invalid header values are ignored.
    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                self.response_headers.insert(header::CONTENT_TYPE, value);
            }
            Err(_) => {
                tracing::warn!(content_type = %content_type, "Ignoring invalid content type");
            }
        }
        self
    }

    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) -> &mut Self {
        self.response_headers.insert(name, value);
        self
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    // ----- async results -----

    /// Complete the response later with the body produced by `future`.
    ///
    /// The future must not borrow the context; it is spawned on the runtime
    /// after the route handler returns and awaited exactly once.
    pub fn future<F, B>(&mut self, future: F) -> &mut Self
    where
        F: Future<Output = Result<B, HandlerError>> + Send + 'static,
        B: Into<Bytes>,
    {
        self.set_pending(AsyncResult::body(future))
    }

    /// Complete the response later with `future`'s value serialized as JSON.
    pub fn json_future<F, T>(&mut self, future: F) -> &mut Self
    where
        F: Future<Output = Result<T, HandlerError>> + Send + 'static,
        T: Serialize,
    {
        self.set_pending(AsyncResult::json(future))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn set_pending(&mut self, result: AsyncResult) -> &mut Self {
        if self.pending.replace(result).is_some() {
            tracing::debug!(path = %self.uri.path(), "Replacing previously registered async result");
        }
        self
    }

    pub(crate) fn take_pending(&mut self) -> Option<AsyncResult> {
        self.pending.take()
    }

    pub(crate) fn bind(&mut self, matched_path: &str, params: HashMap<String, String>) {
        self.matched_path = Some(matched_path.to_string());
        self.path_params = params;
    }

    /// Consume the context into the final HTTP response.
    pub(crate) fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.response_body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn context(uri: &str, body: &'static str) -> Context {
        let (parts, _) = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("Accept", "application/json")
            .body(())
            .unwrap()
            .into_parts();
        Context::from_parts(parts, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn test_query_params() {
        let ctx = context("/search?q=rust&tag=a&tag=b%20c", "");
        assert_eq!(ctx.query_param("q"), Some("rust"));
        assert_eq!(ctx.query_params("tag"), vec!["a", "b c"]);
        assert_eq!(ctx.query_param("missing"), None);
    }

    #[test]
    fn test_request_headers_case_insensitive() {
        let ctx = context("/", "");
        assert_eq!(ctx.header("accept"), Some("application/json"));
        assert_eq!(ctx.accept(), Some("application/json"));
    }

    #[test]
    fn test_body_json() {
        let ctx = context("/", r#"{"name":"kiln"}"#);
        let value: serde_json::Value = ctx.body_json().unwrap();
        assert_eq!(value["name"], "kiln");

        let ctx = context("/", "not json");
        let err = ctx.body_json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_response_mutation() {
        let mut ctx = context("/", "");
        assert_eq!(ctx.status(), StatusCode::OK);

        ctx.set_status(StatusCode::CREATED).result("done");
        ctx.set_header("X-Custom", HeaderValue::from_static("yes"));
        assert_eq!(ctx.result_str(), Some("done"));
        assert_eq!(ctx.response_header("x-custom"), Some("yes"));

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-custom"], "yes");
    }

    #[test]
    fn test_json_sets_content_type() {
        let mut ctx = context("/", "");
        ctx.json(&serde_json::json!({"ok": true})).unwrap();
        assert_eq!(ctx.content_type(), Some("application/json"));
        assert_eq!(ctx.result_str(), Some(r#"{"ok":true}"#));
    }

    #[test]
    fn test_pending_result_is_taken_once() {
        let mut ctx = context("/", "");
        ctx.future(async { Ok::<_, HandlerError>("later") });
        assert!(ctx.has_pending());
        assert!(ctx.take_pending().is_some());
        assert!(ctx.take_pending().is_none());
    }
}
