//! Response capture.
//!
//! [`CapturedResponse`] mirrors what a handler wrote: the last status it
//! set and the body bytes in write order. Only the first
//! `max_capture_bytes` are kept; the byte count always covers everything.

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use reqtrack_core::Response;

/// Status and body observed for one in-flight request.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    status: StatusCode,
    body: BytesMut,
    bytes_written: usize,
    limit: usize,
}

impl CapturedResponse {
    /// Start a capture that keeps at most `limit` body bytes.
    ///
    /// The status starts out as `200 OK`, the status a handler gets when it
    /// never sets one.
    pub fn new(limit: usize) -> Self {
        Self {
            status: StatusCode::OK,
            body: BytesMut::new(),
            bytes_written: 0,
            limit,
        }
    }

    /// Record a status. The last call wins.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Record a body chunk and return its full length.
    pub fn write(&mut self, chunk: &[u8]) -> usize {
        let room = self.limit.saturating_sub(self.body.len());
        let kept = chunk.len().min(room);
        self.body.extend_from_slice(&chunk[..kept]);
        self.bytes_written += chunk.len();
        chunk.len()
    }

    /// Last recorded status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Captured body bytes (at most the configured limit).
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Total bytes written, including any past the limit.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Whether some of the body was not kept.
    pub fn is_truncated(&self) -> bool {
        self.bytes_written > self.body.len()
    }
}

/// Observe a finished response.
///
/// Returns a response with the same head and the same body bytes, plus
/// what was captured from it.
pub async fn capture_response(response: Response, limit: usize) -> (Response, CapturedResponse) {
    let (parts, body) = response.into_parts();
    let bytes: Bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };

    let mut captured = CapturedResponse::new(limit);
    captured.set_status(parts.status);
    captured.write(&bytes);

    (http::Response::from_parts(parts, Full::new(bytes)), captured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use reqtrack_core::IntoResponse;

    #[test]
    fn test_default_status_is_ok() {
        let captured = CapturedResponse::new(16);
        assert_eq!(captured.status(), StatusCode::OK);
        assert!(captured.body().is_empty());
        assert!(!captured.is_truncated());
    }

    #[test]
    fn test_last_status_wins() {
        let mut captured = CapturedResponse::new(16);
        captured.set_status(StatusCode::CREATED);
        captured.set_status(StatusCode::NOT_FOUND);
        assert_eq!(captured.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_writes_accumulate_in_order() {
        let mut captured = CapturedResponse::new(1024);
        assert_eq!(captured.write(b"Test "), 5);
        assert_eq!(captured.write(b"response"), 8);
        assert_eq!(captured.body(), b"Test response");
        assert_eq!(captured.bytes_written(), 13);
    }

    #[test]
    fn test_limit_truncates_but_counts() {
        let mut captured = CapturedResponse::new(4);
        assert_eq!(captured.write(b"abcdef"), 6);
        captured.write(b"gh");
        assert_eq!(captured.body(), b"abcd");
        assert_eq!(captured.bytes_written(), 8);
        assert!(captured.is_truncated());
    }

    #[tokio::test]
    async fn test_capture_response_is_transparent() {
        let response = (StatusCode::OK, "Test response").into_response();

        let (response, captured) = capture_response(response, 1024).await;

        assert_eq!(captured.status(), StatusCode::OK);
        assert_eq!(captured.body(), b"Test response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "Test response");
    }

    #[tokio::test]
    async fn test_capture_response_over_limit_keeps_full_body_for_client() {
        let payload = "x".repeat(100);
        let response = payload.clone().into_response();

        let (response, captured) = capture_response(response, 10).await;

        assert_eq!(captured.body().len(), 10);
        assert_eq!(captured.bytes_written(), 100);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, payload);
    }

    proptest! {
        #[test]
        fn prop_capture_is_prefix_of_concatenation(
            chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 0..8),
            limit in 0usize..128,
        ) {
            let mut captured = CapturedResponse::new(limit);
            let mut all = Vec::new();
            for chunk in &chunks {
                prop_assert_eq!(captured.write(chunk), chunk.len());
                all.extend_from_slice(chunk);
            }

            let kept = all.len().min(limit);
            prop_assert_eq!(captured.body(), &all[..kept]);
            prop_assert_eq!(captured.bytes_written(), all.len());
            prop_assert_eq!(captured.is_truncated(), all.len() > limit);
        }
    }
}
