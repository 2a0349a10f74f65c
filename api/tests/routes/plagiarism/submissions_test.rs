use crate::helpers::app::{MODULE, USER};
use crate::helpers::make_test_app;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use db::models::plagiarism_submission::SubmissionStatus;
use plagiarism::client::Method;
use serde_json::{Value, json};

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn file_submission() -> Value {
    json!({
        "owner_module_ref": MODULE,
        "user_ref": USER,
        "content_category": "assignment",
        "content": {
            "kind": "file",
            "content_identifier": "f3a9",
            "filename": "essay.docx"
        }
    })
}

#[tokio::test]
async fn queueing_the_same_file_twice_returns_one_submission() {
    let t = make_test_app().await;
    t.add_file("f3a9", "essay.docx", b"essay");

    let (status, first) = t
        .send(post_json("/api/plagiarism/submissions", &file_submission()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["message"], "Submission queued");
    assert_eq!(first["data"]["status"], "queued");
    assert_eq!(first["data"]["submitter_ref"], USER);
    assert_eq!(first["data"]["filename"], "essay.docx");

    let (status, second) = t
        .send(post_json("/api/plagiarism/submissions", &file_submission()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["id"], first["data"]["id"]);
}

#[tokio::test]
async fn malformed_submission_is_unprocessable() {
    let t = make_test_app().await;
    let body = json!({
        "owner_module_ref": MODULE,
        "content_category": "assignment",
        "content": { "kind": "file" }
    });

    let (status, _) = t.send(post_json("/api/plagiarism/submissions", &body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn submissions_can_be_looked_up() {
    let t = make_test_app().await;
    let m = t.seed(SubmissionStatus::Requested, Some("remote-9")).await;

    let (status, json) = t
        .send(get(&format!("/api/plagiarism/submissions/{}", m.id)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], m.id);
    assert_eq!(json["data"]["status"], "requested");
    assert_eq!(json["data"]["external_id"], "remote-9");

    let (status, json) = t.send(get("/api/plagiarism/submissions/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn only_failed_submissions_can_be_resubmitted() {
    let t = make_test_app().await;
    let queued = t.seed(SubmissionStatus::Queued, None).await;
    let failed = t.seed(SubmissionStatus::Error, Some("remote-3")).await;

    let (status, _) = t
        .send(post_empty(&format!(
            "/api/plagiarism/submissions/{}/resubmit",
            queued.id
        )))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = t
        .send(post_empty(&format!(
            "/api/plagiarism/submissions/{}/resubmit",
            failed.id
        )))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "queued");
    assert_eq!(json["data"]["send_attempts"], 0);

    let (status, _) = t
        .send(post_empty("/api/plagiarism/submissions/9999/resubmit"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn licence_acceptance_requeues_blocked_submissions() {
    let t = make_test_app().await;
    let blocked = t.seed(SubmissionStatus::EulaNotAccepted, Some("remote-4")).await;
    t.seed(SubmissionStatus::EulaNotAccepted, Some("remote-5")).await;
    let untouched = t.seed(SubmissionStatus::Uploaded, Some("remote-6")).await;

    let (status, json) = t
        .send(post_empty(&format!("/api/plagiarism/users/{USER}/eula")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["requeued"], 2);

    let lifecycle = t.state.lifecycle();
    assert_eq!(lifecycle.find(blocked.id).await.unwrap().status, SubmissionStatus::Queued);
    assert_eq!(
        lifecycle.find(untouched.id).await.unwrap().status,
        SubmissionStatus::Uploaded
    );

    let (_, json) = t
        .send(post_empty(&format!("/api/plagiarism/users/{USER}/eula")))
        .await;
    assert_eq!(json["data"]["requeued"], 0);
}

#[tokio::test]
async fn service_metadata_is_served_after_a_refresh() {
    let t = make_test_app().await;

    let (status, json) = t.send(get("/api/plagiarism/service")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Service metadata has not been fetched yet");

    t.client.reply(
        Method::Get,
        "/eula/latest",
        200,
        json!({"version": "v1beta", "url": "https://example.test/eula"}),
    );
    t.client.reply(
        Method::Get,
        "/features-enabled",
        200,
        json!({"similarity": {"generation_settings": true}}),
    );
    t.state
        .scheduler()
        .refresh_service_metadata(Utc::now().timestamp())
        .await
        .unwrap();

    let (status, json) = t.send(get("/api/plagiarism/service")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["eula_version"], "v1beta");
    assert_eq!(json["data"]["eula_url"], "https://example.test/eula");
    assert_eq!(json["data"]["features"]["similarity"]["generation_settings"], true);
}
