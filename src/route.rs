//! Route declaration: a method and path pattern bound to a handler.

use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::handler::Handler;
use crate::middleware::Middleware;

/// A `(method, path pattern) → handler` binding plus route-scoped middleware.
///
/// Patterns use `{name}` for a single segment and `{*rest}` for a catch-all;
/// the captured values are read with [`Request::field`](crate::Request::field).
/// The leading slash is optional: `example/data` and `/example/data` are the
/// same route.
///
/// ```rust
/// use gantry::{Middleware, Request, Response, Route, StatusCode};
///
/// async fn hello(req: Request) -> Response {
///     let name = req.field("name").unwrap_or("stranger");
///     Response::new(StatusCode::OK, serde_json::json!({ "hello": name }))
/// }
///
/// let route = Route::get("hello/{name}", hello)
///     .middleware(Middleware::after(|res| { res.set_header("Test", "It's set"); }));
/// ```
pub struct Route {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) middleware: Vec<Middleware>,
}

impl Route {
    pub fn new(method: Method, path: &str, handler: impl Handler) -> Self {
        Self {
            method,
            path: normalize(path),
            handler: Arc::new(handler),
            middleware: Vec::new(),
        }
    }

    pub fn get(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::GET, path, handler)
    }

    pub fn post(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::POST, path, handler)
    }

    pub fn put(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::PUT, path, handler)
    }

    pub fn patch(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::PATCH, path, handler)
    }

    pub fn delete(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::DELETE, path, handler)
    }

    /// Appends middleware that applies to this route only.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn method(&self) -> &Method { &self.method }

    /// The normalized path pattern, always starting with `/`.
    pub fn path(&self) -> &str { &self.path }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// `example/data/` → `/example/data`, `` → `/`
pub(crate) fn normalize(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}
