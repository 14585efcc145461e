//! Middleware infrastructure for reqtrack
//!
//! Interceptors implement [`MiddlewareLayer`] and are composed by a
//! [`LayerStack`]; the innermost step is an endpoint built with
//! [`handler_fn`].
//!
//! # Example
//!
//! ```rust,ignore
//! use reqtrack_core::{handler_fn, LayerStack, Server};
//!
//! let mut layers = LayerStack::new();
//! layers.push(reqtrack_core::interceptor::build("analytics", config)?);
//!
//! Server::new(handler_fn(|_req| async { "ok" }), layers)
//!     .run("127.0.0.1:8080")
//!     .await
//! ```

mod layer;

pub use layer::{handler_fn, BoxedNext, LayerStack, MiddlewareLayer, ResponseFuture};
