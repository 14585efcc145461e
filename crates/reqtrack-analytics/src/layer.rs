//! The analytics interceptor.

use crate::capture::capture_response;
use crate::config::TrackingConfig;
use crate::dispatch::{Collector, DispatchError, Dispatcher, HttpCollector};
use crate::event::RequestInfo;
use reqtrack_core::{BoxedNext, InterceptorError, MiddlewareLayer, Request, ResponseFuture};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;

/// Name the interceptor is registered under.
pub const INTERCEPTOR_NAME: &str = "analytics";

/// Middleware that reports every request/response cycle to a collector.
///
/// The response a client receives is exactly what the handler produced.
/// Delivery runs on a detached task, so collector latency and failures
/// never reach the request.
///
/// # Example
///
/// ```rust,ignore
/// use reqtrack_analytics::{AnalyticsLayer, TrackingConfig};
/// use reqtrack_core::LayerStack;
///
/// let mut layers = LayerStack::new();
/// layers.push(Box::new(AnalyticsLayer::new(
///     TrackingConfig::new("G-XXXXXXX").enabled(true).api_secret("secret"),
/// )?));
/// ```
#[derive(Clone)]
pub struct AnalyticsLayer {
    config: Arc<TrackingConfig>,
    dispatcher: Option<Dispatcher>,
}

impl AnalyticsLayer {
    /// Build a layer that sends events to the configured HTTP collector.
    ///
    /// No client is built while tracking is inactive.
    pub fn new(config: TrackingConfig) -> Result<Self, DispatchError> {
        let config = config.resolve();
        let dispatcher = if config.is_active() {
            let collector = HttpCollector::new(&config)?;
            Some(Dispatcher::new(Arc::new(collector), config.request_timeout()))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
        })
    }

    /// Build a layer that sends events to `collector`.
    pub fn with_collector(config: TrackingConfig, collector: Arc<dyn Collector>) -> Self {
        let config = config.resolve();
        let dispatcher = config
            .is_active()
            .then(|| Dispatcher::new(collector, config.request_timeout()));

        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }

    /// Resolved configuration.
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Whether requests through this layer are tracked.
    pub fn is_active(&self) -> bool {
        self.dispatcher.is_some()
    }
}

impl MiddlewareLayer for AnalyticsLayer {
    fn call(&self, req: Request, next: BoxedNext) -> ResponseFuture {
        let Some(dispatcher) = self.dispatcher.clone() else {
            return next(req);
        };
        let config = self.config.clone();

        Box::pin(async move {
            let info = RequestInfo::from_request(&req, &config.client_id_cookie);
            let start = Instant::now();

            let response = next(req).await;
            let elapsed = start.elapsed();

            let (response, captured) = capture_response(response, config.max_capture_bytes).await;
            let event = info.into_event(captured.status(), elapsed);

            info!(
                path = %event.path,
                method = %event.method,
                status = event.status_code,
                duration_ms = event.response_time_ms,
                response_bytes = captured.bytes_written(),
                "Analytics tracking sent"
            );
            dispatcher.submit(event);

            response
        })
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}

/// Registry factory: builds an [`AnalyticsLayer`] from a configuration section.
fn build_interceptor(config: serde_json::Value) -> Result<Box<dyn MiddlewareLayer>, InterceptorError> {
    let config = TrackingConfig::from_value(config)
        .map_err(|e| InterceptorError::invalid_config(INTERCEPTOR_NAME, e))?;
    let layer =
        AnalyticsLayer::new(config).map_err(|e| InterceptorError::invalid_config(INTERCEPTOR_NAME, e))?;
    Ok(Box::new(layer))
}

reqtrack_core::register_interceptor!(INTERCEPTOR_NAME, build_interceptor);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RequestEvent;
    use async_trait::async_trait;
    use http::StatusCode;
    use reqtrack_core::{handler_fn, LayerStack, TestClient, TestRequest};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct ChannelCollector(mpsc::UnboundedSender<RequestEvent>);

    #[async_trait]
    impl Collector for ChannelCollector {
        async fn send(&self, event: &RequestEvent) -> Result<(), DispatchError> {
            let _ = self.0.send(event.clone());
            Ok(())
        }
    }

    fn client_with(config: TrackingConfig, handler: BoxedNext) -> (TestClient, mpsc::UnboundedReceiver<RequestEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let layer = AnalyticsLayer::with_collector(config, Arc::new(ChannelCollector(tx)));
        let mut layers = LayerStack::new();
        layers.push(Box::new(layer));
        (TestClient::new(handler, layers), rx)
    }

    fn active() -> TrackingConfig {
        TrackingConfig::new("G-TEST123").enabled(true)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<RequestEvent>) -> RequestEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no event dispatched")
            .expect("collector dropped")
    }

    #[tokio::test]
    async fn test_inactive_layer_is_pass_through() {
        for config in [
            TrackingConfig::new("G-TEST123"),
            TrackingConfig::new("").enabled(true),
        ] {
            let (client, mut rx) = client_with(config, handler_fn(|_req| async { "Test response" }));

            let response = client.get("/test-path").await;
            response.assert_status(StatusCode::OK);
            assert_eq!(response.text(), "Test response");

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_event_describes_request() {
        let (client, mut rx) = client_with(active(), handler_fn(|_req| async { "Test response" }));

        let response = client
            .request(
                TestRequest::get("/test-path?x=1")
                    .header("cookie", "_ga=abc123")
                    .header("user-agent", "Test User Agent")
                    .header("x-forwarded-for", "1.2.3.4, 5.6.6.6"),
            )
            .await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.text(), "Test response");

        let event = next_event(&mut rx).await;
        assert_eq!(event.client_id, "abc123");
        assert_eq!(event.path, "/test-path");
        assert_eq!(event.method, "GET");
        assert_eq!(event.status_code, 200);
        assert_eq!(event.user_agent, "Test User Agent");
        assert_eq!(event.ip_address, "1.2.3.4");
    }

    #[tokio::test]
    async fn test_handler_status_is_reported_and_returned() {
        let (client, mut rx) = client_with(
            active(),
            handler_fn(|_req| async { (StatusCode::NOT_FOUND, "missing") }),
        );

        let response = client.get("/nope").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "missing");
        assert_eq!(next_event(&mut rx).await.status_code, 404);
    }

    #[tokio::test]
    async fn test_response_time_covers_handler() {
        let (client, mut rx) = client_with(
            active(),
            handler_fn(|_req| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "slow"
            }),
        );

        client.get("/slow").await;
        let event = next_event(&mut rx).await;
        assert!(event.response_time_ms >= 50, "got {}ms", event.response_time_ms);
        assert!(event.response_time_ms < 1000, "got {}ms", event.response_time_ms);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_time_covers_only_downstream() {
        let (client, mut rx) = client_with(
            active(),
            handler_fn(|_req| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "slow"
            }),
        );

        client
            .request(
                TestRequest::get("/slow")
                    .header("cookie", "a=1; b=2; _ga=GA1.1.42")
                    .header("x-forwarded-for", "1.2.3.4, 5.6.6.6"),
            )
            .await;
        let elapsed = next_event(&mut rx).await.response_time_ms;
        assert!((50..=51).contains(&elapsed), "got {elapsed}ms");
    }

    #[tokio::test]
    async fn test_request_body_still_reaches_handler() {
        let (client, mut rx) = client_with(
            active(),
            handler_fn(|req: Request| async move { req.body().cloned().unwrap_or_default() }),
        );

        let response = client.request(TestRequest::post("/echo").body("payload")).await;
        assert_eq!(response.text(), "payload");
        assert_eq!(next_event(&mut rx).await.method, "POST");
    }

    #[test]
    fn test_new_resolves_config() {
        let layer = AnalyticsLayer::new(TrackingConfig::new("G-1")).unwrap();
        assert!(!layer.is_active());
        assert_eq!(layer.config().endpoint_url, crate::config::DEFAULT_ENDPOINT_URL);
    }

    #[test]
    fn test_registered_by_name() {
        assert!(reqtrack_core::interceptor::registered_names().contains(&INTERCEPTOR_NAME));

        assert!(reqtrack_core::interceptor::build(INTERCEPTOR_NAME, serde_json::Value::Null).is_ok());

        let err = reqtrack_core::interceptor::build(
            INTERCEPTOR_NAME,
            serde_json::json!({ "enabled": "sometimes" }),
        )
        .err()
        .unwrap();
        assert!(matches!(err, InterceptorError::InvalidConfig { .. }));
    }
}
