//! TestClient for integration testing without network binding
//!
//! Sends simulated requests through the same [`LayerStack`] the server
//! uses, so interceptors can be exercised without a socket.
//!
//! # Example
//!
//! ```rust,ignore
//! use reqtrack_core::{handler_fn, LayerStack, TestClient, TestRequest};
//!
//! #[tokio::test]
//! async fn test_hello() {
//!     let client = TestClient::new(handler_fn(|_req| async { "Hello" }), LayerStack::new());
//!     let response = client.request(TestRequest::get("/")).await;
//!     response.assert_status(http::StatusCode::OK);
//!     assert_eq!(response.text(), "Hello");
//! }
//! ```

use crate::middleware::{BoxedNext, LayerStack};
use crate::request::Request;
use crate::response::Response;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use std::net::SocketAddr;

/// Test client for integration testing without network binding
pub struct TestClient {
    handler: BoxedNext,
    layers: LayerStack,
}

impl TestClient {
    /// Create a new test client for `handler` wrapped in `layers`
    pub fn new(handler: BoxedNext, layers: LayerStack) -> Self {
        Self { handler, layers }
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    /// Send a request with full control
    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let uri: http::Uri = req.path.parse().unwrap_or_else(|_| http::Uri::from_static("/"));

        let mut http_req = http::Request::new(req.body.unwrap_or_default());
        *http_req.method_mut() = req.method;
        *http_req.uri_mut() = uri;
        *http_req.headers_mut() = req.headers;

        let mut request = Request::from_http(http_req);
        if let Some(addr) = req.remote_addr {
            request = request.with_remote_addr(addr);
        }

        let response = self.layers.execute(request, self.handler.clone()).await;
        TestResponse::from_response(response).await
    }
}

/// Test request builder
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    remote_addr: Option<SocketAddr>,
}

impl TestRequest {
    /// Create a new request with the given method and path
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
            remote_addr: None,
        }
    }

    /// Create a GET request
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append a header to the request
    ///
    /// Invalid names or values are ignored.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(val)) = (
            key.parse::<http::header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, val);
        }
        self
    }

    /// Set the request body as raw bytes
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Pretend the request came from `addr`
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

/// Test response with assertion helpers
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = body.collect().await.map(|b| b.to_bytes()).unwrap_or_default();

        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Get the response status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header as a string
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// Get the response body as bytes
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Get the response body as a string (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Assert that the response has the expected status code
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }
}
