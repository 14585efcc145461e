//! # reqtrack core
//!
//! The host side of reqtrack: the request and response types handlers
//! see, the middleware chain interceptors plug into, the registry that
//! lets a host find an interceptor by name, and a small hyper server.
//!
//! Interceptors such as `reqtrack-analytics` depend on this crate and
//! register themselves with [`inventory`] so the host can build them
//! from configuration without naming their types.

pub mod interceptor;
pub mod middleware;
mod request;
mod response;
mod server;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use interceptor::{InterceptorError, InterceptorRegistration};
pub use middleware::{handler_fn, BoxedNext, LayerStack, MiddlewareLayer, ResponseFuture};
pub use request::Request;
pub use response::{IntoResponse, Response};
pub use server::Server;
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};

#[doc(hidden)]
pub use inventory;
