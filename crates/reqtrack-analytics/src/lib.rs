//! # reqtrack analytics
//!
//! An interceptor that observes each request/response cycle and reports a
//! summary event (path, method, status, latency, client identity) to a
//! GA4 Measurement Protocol style collector.
//!
//! The client gets the handler's response unchanged. Events are delivered
//! on detached tokio tasks with a bounded timeout; failures are logged
//! and otherwise ignored.
//!
//! ```rust,ignore
//! use reqtrack_analytics::{AnalyticsLayer, TrackingConfig};
//! use reqtrack_core::{handler_fn, LayerStack, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     reqtrack_analytics::load_dotenv();
//!     let config = TrackingConfig::from_env()?;
//!
//!     let mut layers = LayerStack::new();
//!     layers.push(Box::new(AnalyticsLayer::new(config)?));
//!
//!     Server::new(handler_fn(|_req| async { "ok" }), layers)
//!         .run("127.0.0.1:8080")
//!         .await
//! }
//! ```
//!
//! The layer is also registered with the host under the name `analytics`,
//! so `reqtrack_core::interceptor::build("analytics", section)` builds it
//! from a configuration section.

pub mod capture;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod event;
mod layer;

pub use capture::{capture_response, CapturedResponse};
pub use client::{client_id, client_ip};
pub use config::{load_dotenv, ConfigError, TrackingConfig};
pub use dispatch::{Collector, DispatchError, DispatchOutcome, Dispatcher, HttpCollector};
pub use event::{RequestEvent, RequestInfo, EVENT_NAME};
pub use layer::{AnalyticsLayer, INTERCEPTOR_NAME};
