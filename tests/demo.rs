use bytes::Bytes;
use gantry::{App, Config, Dispatcher, StatusCode, demo};
use http_body_util::{BodyExt, Full};
use serde_json::{Value, json};

fn dispatcher() -> Dispatcher {
    let mut app = App::new(Config::default());
    app.add_controller(demo::controller());
    app.build().expect("demo routes compile")
}

fn get(uri: &str) -> http::Request<Bytes> {
    http::Request::builder().uri(uri).body(Bytes::new()).unwrap()
}

fn get_with_body(uri: &str, content_type: &str, body: &'static str) -> http::Request<Bytes> {
    http::Request::builder()
        .uri(uri)
        .header("content-type", content_type)
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
}

async fn body_bytes(res: http::Response<Full<Bytes>>) -> Bytes {
    res.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(res: http::Response<Full<Bytes>>) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

fn header<'a>(res: &'a http::Response<Full<Bytes>>, name: &str) -> Option<&'a str> {
    res.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn field_route_echoes_path_segment() {
    let res = dispatcher().dispatch(get("/example/field/John%20Doe")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-type"), Some("application/json"));
    assert_eq!(body_json(res).await, json!({ "message": "Your name is John Doe" }));
}

#[tokio::test]
async fn header_route_sets_test_header() {
    let res = dispatcher().dispatch(get("/example/header")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "Test"), Some("It Worked!"));
    assert_eq!(body_json(res).await, json!({ "success": true }));
}

#[tokio::test]
async fn download_route_sends_raw_bytes_as_attachment() {
    let res = dispatcher().dispatch(get("/example/download")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        header(&res, "content-disposition"),
        Some("attachment; filename=\"hello_world.txt\""),
    );
    assert_eq!(header(&res, "content-type"), Some("application/octet-stream"));
    assert_eq!(&body_bytes(res).await[..], b"Hello, World!");
}

#[tokio::test]
async fn data_route_reads_client_name_from_json_body() {
    let body = r#"{"client":{"name":"John Doe"}}"#;
    let req = get_with_body("/example/data", "application/json", body);
    let res = dispatcher().dispatch(req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({ "your_name_is": "John Doe" }));
}

#[tokio::test]
async fn data_route_accepts_form_bodies_too() {
    let form = "application/x-www-form-urlencoded";
    let req = get_with_body("/example/data", form, "client.name=Jane+Roe");
    let res = dispatcher().dispatch(req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({ "your_name_is": "Jane Roe" }));
}

#[tokio::test]
async fn data_route_without_client_name_is_400() {
    for body in ["", r#"{"client":{}}"#, r#"{"client":{"name":null}}"#, "{not json"] {
        let req = get_with_body("/example/data", "application/json", body);
        let res = dispatcher().dispatch(req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(
            body_json(res).await,
            json!({ "error": "Missing `client.name` data key/value pair." }),
        );
    }
}

#[tokio::test]
async fn query_route_reads_name_parameter() {
    let res = dispatcher().dispatch(get("/example/query?name=John%20Doe")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({ "your_name_is": "John Doe" }));
}

#[tokio::test]
async fn query_route_without_name_is_400() {
    let res = dispatcher().dispatch(get("/example/query?other=1")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await, json!({ "error": "Missing `name` query parameter." }));
}

#[tokio::test]
async fn middleware_route_carries_route_and_controller_headers() {
    let res = dispatcher().dispatch(get("/example/middleware")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "Test"), Some("It's set"));
    assert_eq!(header(&res, "Controller-Middleware"), Some("Yes"));
    assert_eq!(header(&res, "MultiRoute-Middleware"), None);
    assert_eq!(
        body_json(res).await,
        json!({ "message": "The middleware should have added the Test header" }),
    );
}

#[tokio::test]
async fn multi_route_middleware_reaches_only_named_routes() {
    let d = dispatcher();

    for uri in ["/example/data", "/example/field/anyone"] {
        let res = d.dispatch(get(uri)).await;
        assert_eq!(header(&res, "MultiRoute-Middleware"), Some("Yes"), "{uri}");
        assert_eq!(header(&res, "Controller-Middleware"), Some("Yes"), "{uri}");
    }

    for uri in ["/example/header", "/example/download", "/example/query?name=x"] {
        let res = d.dispatch(get(uri)).await;
        assert_eq!(header(&res, "MultiRoute-Middleware"), None, "{uri}");
        assert_eq!(header(&res, "Controller-Middleware"), Some("Yes"), "{uri}");
    }
}

#[tokio::test]
async fn trailing_slash_is_ignored() {
    let res = dispatcher().dispatch(get("/example/header/")).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn demo_routes_are_get_only() {
    let req = http::Request::builder()
        .method("POST")
        .uri("/example/header")
        .body(Bytes::new())
        .unwrap();
    let res = dispatcher().dispatch(req).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header(&res, "allow"), Some("GET"));
}
