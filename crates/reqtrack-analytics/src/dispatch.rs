//! Event dispatch.
//!
//! A [`Collector`] delivers one event. The [`Dispatcher`] runs each
//! delivery on its own tokio task with a bounded wait, logs how it ended,
//! and never reports back to the request that produced the event.

use crate::config::TrackingConfig;
use crate::event::RequestEvent;
use async_trait::async_trait;
use http::{header, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Error type for event delivery.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The event could not be encoded.
    #[error("failed to encode analytics event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The collector could not be reached.
    #[error("failed to send analytics event: {0}")]
    Transport(#[source] reqwest::Error),

    /// Delivery did not finish in time.
    #[error("analytics event not delivered within {0:?}")]
    Timeout(Duration),

    /// The collector answered with something other than 200 or 204.
    #[error("collector rejected analytics event with status {status}")]
    Rejected {
        /// Collector response status
        status: StatusCode,
        /// Collector response body
        body: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build collector client: {0}")]
    Client(#[source] reqwest::Error),
}

/// How a dispatch task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The collector accepted the event.
    Delivered,
    /// The event was dropped; the reason was logged.
    Failed,
}

/// Destination for request events.
#[async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Deliver one event.
    async fn send(&self, event: &RequestEvent) -> Result<(), DispatchError>;
}

/// Measurement Protocol collector reached over HTTP.
///
/// The inner `reqwest::Client` is built once and shared by every dispatch
/// task, so connections are pooled across requests.
#[derive(Clone)]
pub struct HttpCollector {
    client: reqwest::Client,
    endpoint_url: String,
    tracking_id: String,
    api_secret: String,
}

impl HttpCollector {
    /// Build a collector for a resolved configuration.
    pub fn new(config: &TrackingConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(DispatchError::Client)?;
        Ok(Self::with_client(client, config))
    }

    /// Use an existing client (its own timeout settings apply).
    pub fn with_client(client: reqwest::Client, config: &TrackingConfig) -> Self {
        Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
            tracking_id: config.tracking_id.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    /// Endpoint events are POSTed to, without the query string.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn send(&self, event: &RequestEvent) -> Result<(), DispatchError> {
        let body = event.to_json()?;

        let response = self
            .client
            .post(&self.endpoint_url)
            .query(&[
                ("measurement_id", self.tracking_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ])
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(DispatchError::Transport)?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DispatchError::Rejected { status, body })
    }
}

/// Spawns one detached delivery task per event.
#[derive(Clone)]
pub struct Dispatcher {
    collector: Arc<dyn Collector>,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher that gives each delivery at most `timeout`.
    pub fn new(collector: Arc<dyn Collector>, timeout: Duration) -> Self {
        Self { collector, timeout }
    }

    /// Submit an event for delivery.
    ///
    /// Returns immediately. The handle may be dropped; the task keeps
    /// running until delivery finishes or times out. Returns `None` when
    /// called outside a tokio runtime, in which case the event is dropped.
    pub fn submit(&self, event: RequestEvent) -> Option<JoinHandle<DispatchOutcome>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(path = %event.path, "No tokio runtime; analytics event dropped");
            return None;
        };

        let collector = self.collector.clone();
        let timeout = self.timeout;

        Some(runtime.spawn(async move { deliver(collector.as_ref(), &event, timeout).await }))
    }
}

/// Run one delivery and log its terminal state.
async fn deliver(collector: &dyn Collector, event: &RequestEvent, timeout: Duration) -> DispatchOutcome {
    let result = match tokio::time::timeout(timeout, collector.send(event)).await {
        Ok(result) => result,
        Err(_) => Err(DispatchError::Timeout(timeout)),
    };

    match result {
        Ok(()) => {
            debug!(path = %event.path, client_id = %event.client_id, "Analytics event delivered");
            DispatchOutcome::Delivered
        }
        Err(DispatchError::Rejected { status, body }) => {
            error!(status = status.as_u16(), response = %body, "Analytics request failed");
            DispatchOutcome::Failed
        }
        Err(err @ DispatchError::Serialization(_)) => {
            error!(error = %err, "Failed to marshal analytics data");
            DispatchOutcome::Failed
        }
        Err(err) => {
            error!(error = %err, "Failed to send analytics data");
            DispatchOutcome::Failed
        }
    }
}
