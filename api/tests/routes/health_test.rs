use crate::helpers::make_test_app;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};

#[tokio::test]
async fn health_check_returns_ok_json() {
    let t = make_test_app().await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = t.send(req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], "OK");
    assert_eq!(json["message"], "Health check passed");
}
