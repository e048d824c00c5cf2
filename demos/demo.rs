//! The getting-started demo: one controller, six routes, middleware at
//! every scope.
//!
//! Run with:
//!   cargo run --example demo -- --port 8080 --log debug
//!
//! Try:
//!   curl http://localhost:8080/example/field/Jane
//!   curl -v http://localhost:8080/example/header
//!   curl -OJ http://localhost:8080/example/download
//!   curl -H'Content-Type: application/json' \
//!        -d'{"client":{"name":"John Doe"}}' \
//!        http://localhost:8080/example/data
//!   curl 'http://localhost:8080/example/query?name=John%20Doe'
//!   curl -v http://localhost:8080/example/middleware

use gantry::{App, demo};

#[tokio::main]
async fn main() -> Result<(), gantry::Error> {
    let mut app = App::from_cli();
    gantry::logging::init(&app.config().log);

    // Custom serializers and app-wide middleware go here.

    app.add_controller(demo::controller());
    app.listen().await
}
