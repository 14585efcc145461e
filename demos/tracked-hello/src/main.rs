//! Hello World behind the analytics interceptor
//!
//! Run with: cargo run -p tracked-hello
//!
//! Tracking is configured from `REQTRACK_ANALYTICS_*` variables (or a
//! `.env` file), e.g.:
//!
//! ```text
//! REQTRACK_ANALYTICS_TRACKING_ID=G-XXXXXXX
//! REQTRACK_ANALYTICS_ENABLED=true
//! REQTRACK_ANALYTICS_API_SECRET=secret
//! ```
//!
//! Then visit: http://127.0.0.1:8080

use http::{header, HeaderValue, StatusCode};
use reqtrack_analytics::{AnalyticsLayer, TrackingConfig};
use reqtrack_core::{handler_fn, IntoResponse, LayerStack, Request, Server};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct HelloResponse {
    message: String,
    path: String,
}

async fn hello(req: Request) -> reqtrack_core::Response {
    let body = HelloResponse {
        message: "Hello, World!".to_string(),
        path: req.path().to_string(),
    };

    match serde_json::to_string(&body) {
        Ok(json) => {
            let mut response = json.into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    reqtrack_analytics::load_dotenv();
    let config = TrackingConfig::from_env()?;
    if !config.is_active() {
        tracing::warn!("Analytics tracking is disabled; requests will not be reported");
    }

    let mut layers = LayerStack::new();
    layers.push(Box::new(AnalyticsLayer::new(config)?));

    Server::new(handler_fn(hello), layers).run("127.0.0.1:8080").await
}
