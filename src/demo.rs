//! A getting-started controller exercising every part of the public API:
//! path fields, headers, downloads, body data, query parameters and
//! middleware at route, controller and named-route scope.
//!
//! Serve it with `cargo run --example demo`, then try the `curl` lines on
//! each handler.

use serde_json::json;

use crate::{Controller, Middleware, Payload, Request, Response, Route, StatusCode};

/// The demo controller with all six example routes registered.
pub fn controller() -> Controller {
    let mut controller = Controller::named("demo");

    // `{name}` is read back with `request.field("name")`.
    controller.add_route(Route::get("example/field/{name}", example_field));
    controller.add_route(Route::get("example/header", example_header));
    controller.add_route(Route::get("example/download", example_download));
    controller.add_route(Route::get("example/data", example_data));
    controller.add_route(Route::get("example/query", example_query));

    // Route-scoped: stamps a header on the way out of this route only.
    controller.add_route(
        Route::get("example/middleware", example_middleware).middleware(Middleware::after(|res| {
            res.set_header("Test", "It's set");
        })),
    );

    controller.add_middleware(Middleware::after(|res| {
        res.set_header("Controller-Middleware", "Yes");
    }));

    controller.add_middleware_for(
        &["example/data", "example/field/{name}"],
        Middleware::after(|res| {
            res.set_header("MultiRoute-Middleware", "Yes");
        }),
    );

    controller
}

/// curl http://localhost:8080/example/field/Jane
pub async fn example_field(request: Request) -> Response {
    let name = request.field("name").unwrap_or_default();
    Response::new(StatusCode::OK, json!({ "message": format!("Your name is {name}") }))
}

/// curl -v http://localhost:8080/example/header
pub async fn example_header(_request: Request) -> Response {
    Response::new(StatusCode::OK, json!({ "success": true }))
        .header("Test", "It Worked!")
}

/// Open http://localhost:8080/example/download in a browser.
pub async fn example_download(_request: Request) -> Response {
    Response::new(StatusCode::OK, Payload::raw("Hello, World!"))
        .download("hello_world.txt")
}

/// Reads `client.name` from the body.
///
/// ```text
/// curl -H'Content-Type: application/json' \
///      -d'{"client":{"name":"John Doe"}}' \
///      http://localhost:8080/example/data
/// ```
pub async fn example_data(request: Request) -> Response {
    match request.data("client.name") {
        Some(name) => Response::new(StatusCode::OK, json!({ "your_name_is": name })),
        None => Response::error(
            StatusCode::BAD_REQUEST,
            "Missing `client.name` data key/value pair.",
        ),
    }
}

/// curl 'http://localhost:8080/example/query?name=John%20Doe'
pub async fn example_query(request: Request) -> Response {
    match request.query("name") {
        Some(name) => Response::new(StatusCode::OK, json!({ "your_name_is": name })),
        None => Response::error(StatusCode::BAD_REQUEST, "Missing `name` query parameter."),
    }
}

/// curl -v http://localhost:8080/example/middleware
pub async fn example_middleware(_request: Request) -> Response {
    Response::new(
        StatusCode::OK,
        json!({ "message": "The middleware should have added the Test header" }),
    )
}
