//! # gantry
//!
//! A small controller-based HTTP framework. Routes are grouped into
//! controllers, and before/after middleware hooks attach to the whole app,
//! to a controller, to a named subset of its routes, or to a single route.
//!
//! - Radix-tree routing via [`matchit`], `{name}` path fields
//! - hyper HTTP/1.1 + HTTP/2 on tokio, graceful shutdown on SIGTERM / Ctrl-C
//! - Structured payloads encoded by a negotiated [`Serializer`](serializer::Serializer)
//!   (JSON by default, form-urlencoded built in)
//! - Per-client token-bucket rate limiting ([`RateLimit`])
//! - Run-time configuration from flags and environment ([`Config`])
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use gantry::{App, Controller, Middleware, Request, Response, Route, StatusCode};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gantry::Error> {
//!     let mut app = App::from_cli();
//!     gantry::logging::init(&app.config().log);
//!
//!     let mut users = Controller::named("users");
//!     users
//!         .add_route(Route::get("users/{id}", get_user))
//!         .add_middleware(Middleware::after(|res| {
//!             res.set_header("Cache-Control", "no-store");
//!         }));
//!
//!     app.add_controller(users);
//!     app.listen().await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     match req.field("id") {
//!         Some(id) => Response::new(StatusCode::OK, json!({ "id": id })),
//!         None => Response::error(StatusCode::BAD_REQUEST, "Missing `id`."),
//!     }
//! }
//! ```

mod app;
mod config;
mod controller;
mod dispatch;
mod error;
mod handler;
mod request;
mod response;
mod route;
mod router;
mod rate_limit;
mod server;

pub mod demo;
pub mod logging;
pub mod middleware;
pub mod serializer;

pub use app::App;
pub use config::Config;
pub use controller::Controller;
pub use dispatch::Dispatcher;
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use http::{Method, StatusCode};
pub use middleware::Middleware;
pub use rate_limit::RateLimit;
pub use request::Request;
pub use response::{IntoResponse, Payload, Response};
pub use route::Route;
pub use server::Server;
