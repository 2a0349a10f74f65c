use crate::helpers::app::SECRET;
use crate::helpers::make_test_app;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use db::models::plagiarism_submission::SubmissionStatus;
use plagiarism::client::Method;
use plagiarism::webhook::sign;
use serde_json::{Value, json};

fn delivery(body: &Value, secret: Option<&str>, event: Option<&str>) -> Request<Body> {
    let raw = serde_json::to_vec(body).unwrap();
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/plagiarism/webhook")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("X-Plagiarism-Signature", sign(secret.as_bytes(), &raw));
    }
    if let Some(event) = event {
        builder = builder.header("X-Plagiarism-Event", event);
    }
    builder.body(Body::from(raw)).unwrap()
}

#[tokio::test]
async fn unsigned_delivery_is_unauthorized() {
    let t = make_test_app().await;
    let m = t.seed(SubmissionStatus::Requested, Some("remote-1")).await;
    let body = json!({
        "submission_id": "remote-1",
        "status": "COMPLETE",
        "overall_match_percentage": 80.0
    });

    let (status, json) = t.send(delivery(&body, None, Some("SIMILARITY_COMPLETE"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);

    let (status, _) = t
        .send(delivery(&body, Some("guessed"), Some("SIMILARITY_COMPLETE")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stored = t.state.lifecycle().find(m.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Requested);
    assert!(stored.overall_score.is_none());
}

#[tokio::test]
async fn signed_similarity_complete_stores_the_score() {
    let t = make_test_app().await;
    let m = t.seed(SubmissionStatus::Requested, Some("remote-1")).await;
    let body = json!({
        "submission_id": "remote-1",
        "status": "COMPLETE",
        "overall_match_percentage": 42.0
    });

    let (status, json) = t
        .send(delivery(&body, Some(SECRET), Some("SIMILARITY_COMPLETE")))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["submission_id"], m.id);
    assert_eq!(json["data"]["status"], "complete");

    let stored = t.state.lifecycle().find(m.id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Complete);
    assert_eq!(stored.overall_score, Some(42.0));
}

#[tokio::test]
async fn submission_complete_requests_a_report() {
    let t = make_test_app().await;
    let m = t.seed(SubmissionStatus::Uploaded, Some("remote-2")).await;
    t.client
        .reply(Method::Put, "/submissions/remote-2/similarity", 202, json!({}));
    let body = json!({"id": "remote-2", "status": "COMPLETE"});

    let (status, json) = t
        .send(delivery(&body, Some(SECRET), Some("SUBMISSION_COMPLETE")))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "requested");
    assert_eq!(t.client.count(Method::Put, "/submissions/remote-2/similarity"), 1);
}

#[tokio::test]
async fn unknown_events_are_acknowledged() {
    let t = make_test_app().await;
    let body = json!({"id": "remote-1", "status": "SUCCESS"});

    let (status, json) = t.send(delivery(&body, Some(SECRET), Some("PDF_STATUS"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn signed_garbage_is_a_bad_request() {
    let t = make_test_app().await;
    let raw = b"{not json".to_vec();
    let req = Request::builder()
        .method("POST")
        .uri("/api/plagiarism/webhook")
        .header("X-Plagiarism-Signature", sign(SECRET.as_bytes(), &raw))
        .header("X-Plagiarism-Event", "SIMILARITY_COMPLETE")
        .body(Body::from(raw))
        .unwrap();

    let (status, json) = t.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}
