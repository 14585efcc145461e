//! Middleware chain for reqtrack
//!
//! Every interceptor is a [`MiddlewareLayer`]: it gets the request and a
//! [`BoxedNext`] continuation, and decides when (and whether) to call it.

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by every step of the chain
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A boxed next function for middleware chains
pub type BoxedNext = Arc<dyn Fn(Request) -> ResponseFuture + Send + Sync>;

/// Trait for middleware that can be composed into a [`LayerStack`]
pub trait MiddlewareLayer: Send + Sync + 'static {
    /// Apply this middleware to a request, calling `next` to continue the chain
    fn call(&self, req: Request, next: BoxedNext) -> ResponseFuture;

    /// Clone this middleware into a boxed trait object
    fn clone_box(&self) -> Box<dyn MiddlewareLayer>;
}

impl Clone for Box<dyn MiddlewareLayer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Wrap an async handler as the innermost step of a chain.
///
/// ```rust,ignore
/// let endpoint = handler_fn(|req: Request| async move {
///     format!("hello from {}", req.path())
/// });
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> BoxedNext
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |req: Request| {
        let fut = f(req);
        Box::pin(async move { fut.await.into_response() }) as ResponseFuture
    })
}

/// A stack of middleware layers
#[derive(Clone, Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn MiddlewareLayer>>,
}

impl LayerStack {
    /// Create a new empty layer stack
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a middleware layer to the stack
    ///
    /// Layers run in the order they are added (first added is outermost).
    pub fn push(&mut self, layer: Box<dyn MiddlewareLayer>) {
        self.layers.push(layer);
    }

    /// Add a middleware layer to the beginning of the stack
    pub fn prepend(&mut self, layer: Box<dyn MiddlewareLayer>) {
        self.layers.insert(0, layer);
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Get the number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Execute the middleware stack with a final handler
    pub fn execute(&self, req: Request, handler: BoxedNext) -> ResponseFuture {
        if self.layers.is_empty() {
            return handler(req);
        }

        // Build inside out so layers[0] ends up outermost
        let mut next = handler;

        for layer in self.layers.iter().rev() {
            let layer = layer.clone_box();
            let current_next = next;
            next = Arc::new(move |req: Request| {
                let layer = layer.clone_box();
                let next = current_next.clone();
                Box::pin(async move { layer.call(req, next).await }) as ResponseFuture
            });
        }

        next(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn create_test_request(method: Method, path: &str) -> Request {
        let req = http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap();
        Request::from_http(req)
    }

    type Order = Arc<Mutex<Vec<(usize, &'static str)>>>;

    /// Records when it runs before and after the rest of the chain
    #[derive(Clone)]
    struct OrderTrackingMiddleware {
        id: usize,
        order: Order,
    }

    impl MiddlewareLayer for OrderTrackingMiddleware {
        fn call(&self, req: Request, next: BoxedNext) -> ResponseFuture {
            let id = self.id;
            let order = self.order.clone();

            Box::pin(async move {
                order.lock().unwrap().push((id, "pre"));
                let response = next(req).await;
                order.lock().unwrap().push((id, "post"));
                response
            })
        }

        fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
            Box::new(self.clone())
        }
    }

    /// Answers on its own without calling next
    #[derive(Clone)]
    struct ShortCircuitMiddleware {
        status: StatusCode,
    }

    impl MiddlewareLayer for ShortCircuitMiddleware {
        fn call(&self, _req: Request, _next: BoxedNext) -> ResponseFuture {
            let status = self.status;
            Box::pin(async move { status.into_response() })
        }

        fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
            Box::new(self.clone())
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_middleware_execution_order(num_layers in 1usize..10usize) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let order: Order = Arc::new(Mutex::new(Vec::new()));

                let mut stack = LayerStack::new();
                for id in 0..num_layers {
                    stack.push(Box::new(OrderTrackingMiddleware { id, order: order.clone() }));
                }

                let handler = handler_fn(|_req| async { "test" });
                let response = stack.execute(create_test_request(Method::GET, "/test"), handler).await;
                prop_assert_eq!(response.status(), StatusCode::OK);

                let execution_order = order.lock().unwrap();
                prop_assert_eq!(execution_order.len(), num_layers * 2);
                for i in 0..num_layers {
                    prop_assert_eq!(execution_order[i], (i, "pre"));
                    prop_assert_eq!(execution_order[num_layers + i], (num_layers - 1 - i, "post"));
                }
                Ok(())
            });
            result?;
        }
    }

    #[tokio::test]
    async fn test_empty_layer_stack_calls_handler_directly() {
        let stack = LayerStack::new();
        let handler = handler_fn(|_req| async { (StatusCode::ACCEPTED, "direct") });

        let response = stack
            .execute(create_test_request(Method::GET, "/test"), handler)
            .await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let mut stack = LayerStack::new();
        stack.push(Box::new(ShortCircuitMiddleware {
            status: StatusCode::UNAUTHORIZED,
        }));

        let handler_called = Arc::new(AtomicBool::new(false));
        let flag = handler_called.clone();
        let handler = handler_fn(move |_req| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                "handler"
            }
        });

        let response = stack
            .execute(create_test_request(Method::GET, "/test"), handler)
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!handler_called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_prepend_and_len() {
        let order: Order = Arc::new(Mutex::new(Vec::new()));
        let mut stack = LayerStack::new();
        assert!(stack.is_empty());

        stack.push(Box::new(OrderTrackingMiddleware { id: 1, order: order.clone() }));
        stack.prepend(Box::new(OrderTrackingMiddleware { id: 0, order }));

        assert_eq!(stack.len(), 2);
        assert!(!stack.is_empty());
    }
}
