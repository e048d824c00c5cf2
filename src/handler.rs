//! Route handlers and the endpoints that wrap them.
//!
//! Any `async fn(Request) -> impl IntoResponse` is a [`Handler`]. Types that
//! carry state can implement the trait themselves. When an app is built,
//! each route's handler is paired with its resolved middleware chain into an
//! [`Endpoint`], which is what the router stores:
//!
//! ```text
//! Route::get("example/data", example_data)   → Arc<dyn Handler>
//!        ↓ App::build
//! Endpoint { handler, middleware: [controller, scoped, route] }
//!        ↓ per request
//! before hooks → handler.respond(req) → after hooks (reversed)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::middleware::{self, Middleware};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The future a [`Handler`] returns: boxed so handlers of different types
/// share one signature, `Send` so tokio may poll it on any worker.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Produces one [`Response`] per [`Request`].
///
/// Implemented for every function with the signature
/// `async fn(Request) -> impl IntoResponse`. Implement it by hand for a
/// handler that owns state:
///
/// ```rust
/// use gantry::{BoxFuture, Handler, Request, Response, StatusCode};
/// use serde_json::json;
///
/// struct Greeting(&'static str);
///
/// impl Handler for Greeting {
///     fn respond(&self, _req: Request) -> BoxFuture {
///         let text = self.0;
///         Box::pin(async move { Response::new(StatusCode::OK, json!({ "message": text })) })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn respond(&self, req: Request) -> BoxFuture;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn respond(&self, req: Request) -> BoxFuture {
        let fut = self(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// A handler plus the controller/route middleware chain that wraps it.
/// App-wide middleware is applied by the dispatcher, outside the endpoint.
#[derive(Clone)]
pub(crate) struct Endpoint {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) middleware: Arc<[Middleware]>,
}

impl Endpoint {
    pub(crate) fn new(handler: Arc<dyn Handler>, middleware: Vec<Middleware>) -> Self {
        Self { handler, middleware: Arc::from(middleware) }
    }

    pub(crate) async fn call(&self, mut req: Request) -> Response {
        middleware::run_before(&self.middleware, &mut req);
        let mut res = self.handler.respond(req).await;
        middleware::run_after(&self.middleware, &mut res);
        res
    }
}
