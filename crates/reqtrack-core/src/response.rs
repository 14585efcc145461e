//! Response types for reqtrack
//!
//! Handlers return anything implementing [`IntoResponse`]; the chain only
//! ever moves fully buffered [`Response`] values around.
//!
//! | Type | Status | Content-Type |
//! |------|--------|--------------|
//! | `String` / `&'static str` | 200 | text/plain |
//! | `Bytes` | 200 | application/octet-stream |
//! | `()` | 200 | - |
//! | `StatusCode` | given | - |
//! | `(StatusCode, R)` | given | from `R` |

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Trait for types that can be converted into an HTTP response
pub trait IntoResponse {
    /// Convert self into a Response
    fn into_response(self) -> Response;
}

fn with_content_type(body: Bytes, content_type: &'static str) -> Response {
    let mut response = http::Response::new(Full::new(body));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        http::Response::new(Full::new(Bytes::new()))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        with_content_type(Bytes::from_static(self.as_bytes()), "text/plain; charset=utf-8")
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        with_content_type(Bytes::from(self), "text/plain; charset=utf-8")
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        with_content_type(self, "application/octet-stream")
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        let mut response = ().into_response();
        *response.status_mut() = self;
        response
    }
}

// (StatusCode, impl IntoResponse)
impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_str_response() {
        let response = "Test response".into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_of(response).await, "Test response");
    }

    #[tokio::test]
    async fn test_status_tuple_overrides_status() {
        let response = (StatusCode::CREATED, String::from("made")).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_of(response).await, "made");
    }

    #[tokio::test]
    async fn test_unit_and_status_have_empty_body() {
        assert!(body_of(().into_response()).await.is_empty());

        let response = StatusCode::NO_CONTENT.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_of(response).await.is_empty());
    }
}
