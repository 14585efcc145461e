use super::expectation::{Expectation, MockResponse, Times};
use super::matcher::{query_pairs, RequestMatcher};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};

type GenericError = Box<dyn std::error::Error + Send + Sync>;
type Result<T> = std::result::Result<T, GenericError>;

/// A mock HTTP server
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    arrivals: Arc<Notify>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

struct ServerState {
    expectations: Vec<Expectation>,
    received: Vec<RecordedRequest>,
    unmatched_requests: Vec<RecordedRequest>,
}

/// A request as the mock server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: http::Method,
    pub uri: http::Uri,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    /// Request path without the query string
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// First value of a query parameter
    pub fn query_param(&self, key: &str) -> Option<String> {
        query_pairs(&self.uri)
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Body parsed as JSON, if it is JSON
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

fn lock(state: &Mutex<ServerState>) -> MutexGuard<'_, ServerState> {
    // A panicking test thread must not hide what the server recorded
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockServer {
    /// Start a new mock server on a random port
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");

        let state = Arc::new(Mutex::new(ServerState {
            expectations: Vec::new(),
            received: Vec::new(),
            unmatched_requests: Vec::new(),
        }));
        let arrivals = Arc::new(Notify::new());

        let state_clone = state.clone();
        let arrivals_clone = arrivals.clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut stop_future = shutdown_rx;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let state = state_clone.clone();
                                let arrivals = arrivals_clone.clone();

                                tokio::spawn(async move {
                                    let service = service_fn(move |req| {
                                        handle_request(req, state.clone(), arrivals.clone())
                                    });
                                    if let Err(err) = hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new())
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        tracing::debug!("Mock server connection error: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => tracing::warn!("Mock server accept error: {}", e),
                        }
                    }
                    _ = &mut stop_future => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            state,
            arrivals,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Every request received so far, in arrival order
    pub fn received_requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).received.clone()
    }

    /// Get requests that didn't match any expectation
    pub fn unmatched_requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).unmatched_requests.clone()
    }

    /// Wait until at least `count` requests have arrived or `timeout` elapses,
    /// then return everything received.
    pub async fn wait_for_requests(&self, count: usize, timeout: Duration) -> Vec<RecordedRequest> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.arrivals.notified();
            {
                let state = lock(&self.state);
                if state.received.len() >= count {
                    return state.received.clone();
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.received_requests();
            }
        }
    }

    /// Add an expectation
    pub fn expect(&self, matcher: RequestMatcher) -> ExpectationBuilder {
        ExpectationBuilder {
            server: self.state.clone(),
            expectation: Some(Expectation::new(matcher)),
        }
    }

    /// Verify that all expectations were met
    ///
    /// # Panics
    ///
    /// Panics with the first unmet expectation.
    pub fn verify(&self) {
        let state = lock(&self.state);
        for exp in &state.expectations {
            if let Err(message) = exp.check() {
                panic!("{}", message);
            }
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Registers its expectation with the server when dropped
pub struct ExpectationBuilder {
    server: Arc<Mutex<ServerState>>,
    expectation: Option<Expectation>,
}

impl ExpectationBuilder {
    pub fn respond_with(mut self, response: MockResponse) -> Self {
        if let Some(exp) = self.expectation.as_mut() {
            exp.response = response;
        }
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        if let Some(exp) = self.expectation.as_mut() {
            exp.times = Times::Exactly(n);
        }
        self
    }

    pub fn once(mut self) -> Self {
        if let Some(exp) = self.expectation.as_mut() {
            exp.times = Times::Once;
        }
        self
    }

    pub fn never(mut self) -> Self {
        if let Some(exp) = self.expectation.as_mut() {
            exp.times = Times::Exactly(0);
        }
        self
    }
}

impl Drop for ExpectationBuilder {
    fn drop(&mut self) {
        if let Some(exp) = self.expectation.take() {
            lock(&self.server).expectations.push(exp);
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<Mutex<ServerState>>,
    arrivals: Arc<Notify>,
) -> Result<Response<Full<Bytes>>> {
    let (parts, body) = req.into_parts();
    let body_bytes = body.collect().await?.to_bytes();

    let recorded = RecordedRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body: body_bytes,
    };

    let canned = {
        let mut state_guard = lock(&state);
        state_guard.received.push(recorded.clone());

        // Later expectations override earlier ones
        let matching_idx = state_guard
            .expectations
            .iter()
            .enumerate()
            .rev()
            .find(|(_, exp)| {
                exp.matcher
                    .matches(&recorded.method, &recorded.uri, &recorded.headers, &recorded.body)
            })
            .map(|(i, _)| i);

        match matching_idx {
            Some(idx) => {
                let exp = &mut state_guard.expectations[idx];
                exp.call_count += 1;
                Some(exp.response.clone())
            }
            None => {
                state_guard.unmatched_requests.push(recorded);
                None
            }
        }
    };
    arrivals.notify_waiters();

    let Some(canned) = canned else {
        return Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("No expectation matched")))?);
    };

    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response = Response::builder().status(canned.status);
    for (k, v) in &canned.headers {
        response = response.header(k, v);
    }
    Ok(response.body(Full::new(canned.body))?)
}
