//! Controllers: named groups of routes sharing middleware scope.

use http::Method;
use tracing::{debug, warn};

use crate::middleware::Middleware;
use crate::route::{Route, normalize};
use crate::handler::Endpoint;

/// A named group of [`Route`]s.
///
/// Middleware can be attached to every route of the controller
/// ([`add_middleware`](Controller::add_middleware)) or to the routes whose
/// pattern matches one of a list of names
/// ([`add_middleware_for`](Controller::add_middleware_for)). Both are
/// resolved when the owning [`App`](crate::App) is built, so registration
/// order between routes and middleware does not matter.
///
/// ```rust
/// use gantry::{Controller, Middleware, Request, Route};
///
/// async fn data(_req: Request) -> &'static str { "data" }
///
/// let mut controller = Controller::named("demo");
/// controller
///     .add_route(Route::get("example/data", data))
///     .add_middleware_for(&["example/data"], Middleware::after(|res| {
///         res.set_header("MultiRoute-Middleware", "Yes");
///     }));
/// ```
#[derive(Debug)]
pub struct Controller {
    name: String,
    routes: Vec<Route>,
    middleware: Vec<Middleware>,
    scoped: Vec<(Vec<String>, Middleware)>,
}

impl Controller {
    pub fn new() -> Self {
        Self::named("controller")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), routes: Vec::new(), middleware: Vec::new(), scoped: Vec::new() }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn routes(&self) -> &[Route] { &self.routes }

    pub fn add_route(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    /// Applies `middleware` to every route of this controller.
    pub fn add_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Applies `middleware` to the routes whose path pattern equals one of
    /// `names`. Names are compared as patterns, not as concrete URLs:
    /// `example/field/{name}` selects that route, `example/field/jane` does not.
    pub fn add_middleware_for<S: AsRef<str>>(
        &mut self,
        names: &[S],
        middleware: Middleware,
    ) -> &mut Self {
        let names = names.iter().map(|n| normalize(n.as_ref())).collect();
        self.scoped.push((names, middleware));
        self
    }

    /// Resolves every route's middleware chain:
    /// controller-wide, then named-route scoped, then the route's own.
    pub(crate) fn into_endpoints(self) -> Vec<(Method, String, Endpoint)> {
        let Self { name, routes, middleware, scoped } = self;

        for (names, _) in &scoped {
            for target in names {
                if !routes.iter().any(|r| &r.path == target) {
                    warn!(
                        controller = %name,
                        path = %target,
                        "scoped middleware matches no route",
                    );
                }
            }
        }

        routes
            .into_iter()
            .map(|route| {
                let chain: Vec<Middleware> = middleware
                    .iter()
                    .cloned()
                    .chain(
                        scoped
                            .iter()
                            .filter(|(names, _)| names.contains(&route.path))
                            .map(|(_, m)| m.clone()),
                    )
                    .chain(route.middleware)
                    .collect();

                debug!(
                    controller = %name,
                    method = %route.method,
                    path = %route.path,
                    middleware = chain.len(),
                    "route registered",
                );

                let endpoint = Endpoint::new(route.handler, chain);
                (route.method, route.path, endpoint)
            })
            .collect()
    }
}

impl Default for Controller {
    fn default() -> Self { Self::new() }
}
