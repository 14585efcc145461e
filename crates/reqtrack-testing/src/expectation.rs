use super::matcher::RequestMatcher;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::time::Duration;

/// An expectation for a request
#[derive(Debug, Clone)]
pub struct Expectation {
    pub(crate) matcher: RequestMatcher,
    pub(crate) response: MockResponse,
    pub(crate) times: Times,
    pub(crate) call_count: usize,
}

impl Expectation {
    /// Create a new expectation
    pub fn new(matcher: RequestMatcher) -> Self {
        Self {
            matcher,
            response: MockResponse::default(),
            times: Times::Any,
            call_count: 0,
        }
    }

    /// How many requests matched so far
    pub fn call_count(&self) -> usize {
        self.call_count
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        let n = self.call_count;
        let ok = match self.times {
            Times::Once => n == 1,
            Times::Exactly(expected) => n == expected,
            Times::AtLeast(min) => n >= min,
            Times::AtMost(max) => n <= max,
            Times::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(format!(
                "Expectation {:?} expected {:?} calls, got {}",
                self.matcher, self.times, n
            ))
        }
    }
}

/// Define how many times an expectation should be matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Times {
    Once,
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    Any,
}

/// A mocked response
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) delay: Option<Duration>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            delay: None,
        }
    }
}

impl MockResponse {
    /// `204 No Content`, which is what a collector normally answers
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a header; invalid names or values are ignored
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Hold the response back, to exercise client timeouts
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}
