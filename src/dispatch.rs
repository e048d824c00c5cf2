//! The compiled application: request in, response out.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

use bytes::Bytes;
use http::StatusCode;
use http::header::ACCEPT;
use http_body_util::Full;
use tracing::{Instrument, debug, info_span};

use crate::middleware::{self, Middleware};
use crate::rate_limit::RateLimiter;
use crate::request::Request;
use crate::response::Response;
use crate::route::normalize;
use crate::router::{Lookup, Router};
use crate::serializer::Serializers;

/// An immutable routing table plus app-wide middleware and serializers.
///
/// Produced by [`App::build`](crate::App::build). The server shares one
/// `Dispatcher` across all connections; tests can call
/// [`dispatch`](Dispatcher::dispatch) directly without a socket.
pub struct Dispatcher {
    pub(crate) router: Router,
    pub(crate) middleware: Vec<Middleware>,
    pub(crate) serializers: Serializers,
    pub(crate) max_body_bytes: usize,
    pub(crate) rate_limiter: Option<RateLimiter>,
}

impl Dispatcher {
    pub fn max_body_bytes(&self) -> usize { self.max_body_bytes }

    /// Routes one request and produces one response.
    ///
    /// Never fails: unknown paths become `404`, a known path under the wrong
    /// method becomes `405` with an `Allow` header.
    ///
    /// Requests turned away before routing, a client over its rate limit
    /// (`429`) or an oversized body (`413`), are answered without running
    /// any middleware. The rate limit is keyed on the [`SocketAddr`] the
    /// server stores in the request extensions; requests without one share
    /// a single bucket.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let path = normalize(parts.uri.path());
        let accept = parts.headers.get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let span = info_span!("request", method = %parts.method, path = %path);

        async move {
            let started = Instant::now();

            if let Some(limiter) = &self.rate_limiter {
                let client = parts.extensions.get::<SocketAddr>()
                    .map(SocketAddr::ip)
                    .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
                if !limiter.check(client) {
                    return self.reject(
                        Response::error(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded."),
                        accept.as_deref(),
                    );
                }
            }

            if body.len() > self.max_body_bytes {
                return self.reject(
                    Response::error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large."),
                    accept.as_deref(),
                );
            }

            let method = parts.method.clone();
            let mut request = Request::new(
                parts.method,
                path.clone(),
                parts.uri.query(),
                parts.headers,
                body,
                &self.serializers,
            );

            middleware::run_before(&self.middleware, &mut request);

            let mut response = match self.router.lookup(&method, &path) {
                Lookup::Found(endpoint, fields) => {
                    request.set_fields(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                    endpoint.call(request).await
                }
                Lookup::MethodNotAllowed(allowed) => {
                    let allow = allowed.iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    Response::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
                        .header("Allow", &allow)
                }
                Lookup::NotFound => Response::error(StatusCode::NOT_FOUND, "Not found."),
            };

            middleware::run_after(&self.middleware, &mut response);

            let res = self.encode(response, accept.as_deref());
            debug!(
                status = res.status().as_u16(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "request completed",
            );
            res
        }
        .instrument(span)
        .await
    }

    /// Answers a request refused before routing. No middleware runs.
    pub(crate) fn reject(
        &self,
        response: Response,
        accept: Option<&str>,
    ) -> http::Response<Full<Bytes>> {
        debug!(status = response.status_code().as_u16(), "request rejected before routing");
        self.encode(response, accept)
    }

    /// Encodes the payload with the serializer negotiated from `accept`.
    fn encode(&self, response: Response, accept: Option<&str>) -> http::Response<Full<Bytes>> {
        let codec = self.serializers.for_accept(accept);
        response.into_http(codec.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use http::Method;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use super::*;
    use crate::{App, Config, Controller, RateLimit, Route};

    async fn echo_name(req: Request) -> Response {
        let name = req.field("name").unwrap_or_default().to_owned();
        Response::new(StatusCode::OK, json!({ "name": name }))
            .header("Test", "handler")
    }

    fn get(uri: &str) -> http::Request<Bytes> {
        http::Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    async fn json_body(res: http::Response<Full<Bytes>>) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn hooks_run_app_controller_scoped_route_then_unwind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tap = |label: &'static str| {
            let before = Arc::clone(&log);
            let after = Arc::clone(&log);
            Middleware::before(move |_| before.lock().unwrap().push(format!("before:{label}")))
                .with_after(move |_| after.lock().unwrap().push(format!("after:{label}")))
        };

        let mut controller = Controller::new();
        controller
            .add_route(Route::get("hello/{name}", echo_name).middleware(tap("route")))
            .add_middleware_for(&["hello/{name}"], tap("scoped"))
            .add_middleware(tap("controller"));

        let mut app = App::new(Config::default());
        app.add_middleware(tap("app")).add_controller(controller);
        let dispatcher = app.build().unwrap();

        let res = dispatcher.dispatch(get("/hello/Jane")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            [
                "before:app", "before:controller", "before:scoped", "before:route",
                "after:route", "after:scoped", "after:controller", "after:app",
            ],
        );
    }

    #[tokio::test]
    async fn after_hooks_see_the_handler_response() {
        let mut controller = Controller::new();
        let hook = Middleware::after(|res| {
            res.set_header("Test", "hook");
        });
        controller.add_route(Route::get("hello/{name}", echo_name).middleware(hook));
        let mut app = App::new(Config::default());
        app.add_controller(controller);

        let res = app.build().unwrap().dispatch(get("/hello/Jane%20Doe")).await;
        assert_eq!(res.headers()["test"], "hook");
        assert_eq!(json_body(res).await, json!({ "name": "Jane Doe" }));
    }

    #[tokio::test]
    async fn unknown_path_is_404_and_still_wrapped_by_app_middleware() {
        let mut app = App::new(Config::default());
        app.add_middleware(Middleware::after(|res| { res.set_header("X-App", "1"); }));
        let dispatcher = app.build().unwrap();

        let res = dispatcher.dispatch(get("/missing")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()["x-app"], "1");
        assert_eq!(json_body(res).await, json!({ "error": "Not found." }));
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        let mut controller = Controller::new();
        controller
            .add_route(Route::post("items", echo_name))
            .add_route(Route::put("items", echo_name));
        let mut app = App::new(Config::default());
        app.add_controller(controller);

        let req = http::Request::builder()
            .method(Method::GET)
            .uri("/items/")
            .body(Bytes::new())
            .unwrap();
        let res = app.build().unwrap().dispatch(req).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()["allow"], "POST, PUT");
    }

    #[tokio::test]
    async fn app_before_hook_can_annotate_request_for_handler() {
        async fn whoami(req: Request) -> Response {
            let user = req.header("X-User").unwrap_or("anonymous").to_owned();
            Response::new(StatusCode::OK, json!({ "user": user }))
        }

        let mut controller = Controller::new();
        controller.add_route(Route::get("whoami", whoami));
        let mut app = App::new(Config::default());
        app.add_middleware(Middleware::before(|req| {
            req.headers_mut().insert("x-user", http::HeaderValue::from_static("jane"));
        }));
        app.add_controller(controller);

        let res = app.build().unwrap().dispatch(get("/whoami")).await;
        assert_eq!(json_body(res).await, json!({ "user": "jane" }));
    }

    #[tokio::test]
    async fn oversized_body_is_413_without_running_middleware() {
        let config = Config { max_body_bytes: 4, ..Config::default() };
        let mut app = App::new(config);
        app.add_middleware(
            Middleware::before(|_| panic!("before hook ran for a rejected request"))
                .with_after(|res| { res.set_header("X-App", "1"); }),
        );
        let dispatcher = app.build().unwrap();

        let req = http::Request::builder()
            .uri("/anything")
            .body(Bytes::from_static(b"too long"))
            .unwrap();
        let res = dispatcher.dispatch(req).await;
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(res.headers().get("x-app").is_none());
        assert_eq!(json_body(res).await, json!({ "error": "Request body too large." }));
    }

    #[tokio::test]
    async fn client_over_rate_limit_gets_429() {
        let mut controller = Controller::new();
        controller.add_route(Route::get("hello/{name}", echo_name));
        let mut app = App::new(Config::default());
        app.set_rate_limit(RateLimit { per_second: 1, burst: 2 }).add_controller(controller);
        let dispatcher = app.build().unwrap();

        let from = |ip: &str| {
            let mut req = get("/hello/jo");
            let addr: SocketAddr = format!("{ip}:5000").parse().unwrap();
            req.extensions_mut().insert(addr);
            req
        };

        assert_eq!(dispatcher.dispatch(from("10.0.0.1")).await.status(), StatusCode::OK);
        assert_eq!(dispatcher.dispatch(from("10.0.0.1")).await.status(), StatusCode::OK);
        let res = dispatcher.dispatch(from("10.0.0.1")).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_body(res).await, json!({ "error": "Rate limit exceeded." }));

        assert_eq!(dispatcher.dispatch(from("10.0.0.2")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn accept_header_selects_response_serializer() {
        let mut controller = Controller::new();
        controller.add_route(Route::get("hello/{name}", echo_name));
        let mut app = App::new(Config::default());
        app.add_controller(controller);

        let req = http::Request::builder()
            .uri("/hello/jo")
            .header(ACCEPT, "application/x-www-form-urlencoded")
            .body(Bytes::new())
            .unwrap();
        let res = app.build().unwrap().dispatch(req).await;
        assert_eq!(res.headers()["content-type"], "application/x-www-form-urlencoded");
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"name=jo");
    }
}
