//! The application: controllers, app-wide middleware and serializers.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::config::Config;
use crate::controller::Controller;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::middleware::Middleware;
use crate::rate_limit::{RateLimit, RateLimiter};
use crate::router::Router;
use crate::serializer::{Serializer, Serializers};
use crate::server::Server;

/// An application under construction.
///
/// ```rust,no_run
/// use gantry::{App, Controller};
///
/// #[tokio::main]
/// async fn main() -> Result<(), gantry::Error> {
///     let mut app = App::from_cli();
///     app.add_controller(Controller::new());
///     app.listen().await
/// }
/// ```
pub struct App {
    config: Config,
    middleware: Vec<Middleware>,
    controllers: Vec<Controller>,
    serializers: Serializers,
    rate_limit: Option<RateLimit>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let rate_limit = config.rate_limit();
        Self {
            config,
            middleware: Vec::new(),
            controllers: Vec::new(),
            serializers: Serializers::default(),
            rate_limit,
        }
    }

    /// Builds an app configured from command-line flags and the environment.
    /// Prints usage and exits the process on invalid flags.
    pub fn from_cli() -> Self {
        Self::new(Config::parse())
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn add_controller(&mut self, controller: Controller) -> &mut Self {
        self.controllers.push(controller);
        self
    }

    /// Applies `middleware` to every request, including ones that match no
    /// route.
    pub fn add_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Registers a serializer. One with the same media type as an existing
    /// serializer replaces it.
    pub fn add_serializer(&mut self, serializer: impl Serializer) -> &mut Self {
        self.serializers.insert(Arc::new(serializer));
        self
    }

    /// Limits each client IP to `limit`, replacing any limit taken from the
    /// config. Requests over the limit get `429` before routing.
    pub fn set_rate_limit(&mut self, limit: RateLimit) -> &mut Self {
        self.rate_limit = Some(limit);
        self
    }

    /// Compiles every controller into one routing table.
    ///
    /// Fails with [`Error::Route`] on a malformed pattern or on two routes
    /// claiming the same method and pattern, across all controllers.
    pub fn build(self) -> Result<Dispatcher, Error> {
        let Self { config, middleware, controllers, serializers, rate_limit } = self;

        let mut router = Router::default();
        let mut count = 0usize;
        for controller in controllers {
            for (method, path, endpoint) in controller.into_endpoints() {
                router.insert(method, &path, endpoint)?;
                count += 1;
            }
        }
        info!(routes = count, "routes compiled");
        if let Some(limit) = rate_limit {
            info!(per_second = limit.per_second, burst = limit.burst, "rate limiting enabled");
        }

        Ok(Dispatcher {
            router,
            middleware,
            serializers,
            max_body_bytes: config.max_body_bytes,
            rate_limiter: rate_limit.map(RateLimiter::new),
        })
    }

    /// Builds the app and serves it on the configured address until SIGTERM
    /// or Ctrl-C.
    pub async fn listen(self) -> Result<(), Error> {
        let addr = self.config.addr();
        let dispatcher = self.build()?;
        Server::bind(addr).serve(dispatcher).await
    }
}

impl Default for App {
    fn default() -> Self { Self::new(Config::default()) }
}
