//! HTTP server implementation

use crate::middleware::{BoxedNext, LayerStack};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Minimal hyper server that runs every request through a [`LayerStack`].
pub struct Server {
    handler: BoxedNext,
    layers: Arc<LayerStack>,
}

impl Server {
    /// Create a server for `handler` wrapped in `layers`
    pub fn new(handler: BoxedNext, layers: LayerStack) -> Self {
        Self {
            handler,
            layers: Arc::new(layers),
        }
    }

    /// Bind `addr` and serve until the task is dropped
    pub async fn run(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(addr = %listener.local_addr()?, "reqtrack server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let handler = self.handler.clone();
            let layers = self.layers.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<Incoming>| {
                    let handler = handler.clone();
                    let layers = layers.clone();
                    async move {
                        let response = handle_request(handler, layers, req, remote_addr).await;
                        Ok::<_, Infallible>(response)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Connection error: {}", err);
                }
            });
        }
    }
}

/// Handle a single HTTP request
async fn handle_request(
    handler: BoxedNext,
    layers: Arc<LayerStack>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = std::time::Instant::now();

    // Read the body once; handlers get it back through `Request::body`
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(method = %method, path = %path, error = %err, "Failed to read request body");
            let response = (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
            log_request(&method, &path, response.status(), start);
            return response;
        }
    };

    let request = Request::new(parts, body, Some(remote_addr));
    let response = layers.execute(request, handler).await;

    log_request(&method, &path, response.status(), start);
    response
}

/// Log request completion
fn log_request(method: &http::Method, path: &str, status: StatusCode, start: std::time::Instant) {
    let elapsed = start.elapsed();

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    }
}
