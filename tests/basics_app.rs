use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use basics_server::{
    basics_app,
    handlers::cors::{ALLOW_HEADERS, ALLOW_METHODS},
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn assert_blanket_cors(response: &axum::response::Response, context: &str) {
    let allow_headers: Vec<_> = response
        .headers()
        .get_all(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .iter()
        .collect();
    assert!(
        allow_headers.iter().any(|v| *v == ALLOW_HEADERS),
        "missing Access-Control-Allow-Headers on {context}: {allow_headers:?}"
    );

    let allow_methods: Vec<_> = response
        .headers()
        .get_all(header::ACCESS_CONTROL_ALLOW_METHODS)
        .iter()
        .collect();
    assert!(
        allow_methods.iter().any(|v| *v == ALLOW_METHODS),
        "missing Access-Control-Allow-Methods on {context}: {allow_methods:?}"
    );
}

#[tokio::test]
async fn root_returns_hello_world_json() {
    let response = basics_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_blanket_cors(&response, "GET /");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "message": "HELLO WORLD" }));
}

#[tokio::test]
async fn every_route_gets_the_blanket_headers() {
    let app = basics_app();
    let cases = [
        (Method::GET, "/health", StatusCode::OK),
        (Method::GET, "/plants", StatusCode::NOT_FOUND),
        (Method::DELETE, "/", StatusCode::METHOD_NOT_ALLOWED),
        (Method::PATCH, "/health", StatusCode::METHOD_NOT_ALLOWED),
    ];

    for (method, uri, status) in cases {
        let context = format!("{method} {uri}");
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), status, "unexpected status for {context}");
        assert_blanket_cors(&response, &context);
    }
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() {
    let response = basics_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn preflight_carries_the_blanket_headers() {
    let response = basics_app()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response.status().is_success(),
        "preflight failed with {}",
        response.status()
    );
    assert_blanket_cors(&response, "OPTIONS /");
}
