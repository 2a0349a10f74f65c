use super::{EVENT_HEADER, SIGNATURE_HEADER, error_response};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use plagiarism::lifecycle::{NewSubmission, SubmittedContent};
use plagiarism::webhook::WebhookDisposition;
use serde::Deserialize;
use serde_json::{Value, json};

/// POST /api/plagiarism/webhook
///
/// Receives a notification from the similarity service. The raw body is
/// authenticated with the `X-Plagiarism-Signature` header (hex HMAC-SHA256
/// under the registration secret) before anything in it is looked at. The
/// event type comes from `X-Plagiarism-Event`, or from the body's
/// `event_type` when the header is absent.
///
/// ### Responses
/// - `200 OK` (applied, or acknowledged and ignored for an unknown event or an
///   unknown or already-finished submission)
/// - `400 Bad Request` (signed body that is not valid JSON)
/// - `401 Unauthorized` (missing or invalid signature)
/// - `409 Conflict` (the submission moved on while the event was applied)
///
/// ```json
/// {
///   "success": true,
///   "data": { "submission_id": 12, "status": "complete" },
///   "message": "Webhook applied"
/// }
/// ```
pub async fn receive_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let event = headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok());

    match app_state
        .gateway()
        .handle(&body, signature, event, Utc::now().timestamp())
        .await
    {
        Ok(WebhookDisposition::Applied {
            submission_id,
            status,
        }) => ApiResponse::success(
            json!({ "submission_id": submission_id, "status": status.to_string() }),
            "Webhook applied",
        )
        .with_status(StatusCode::OK)
        .into_response(),
        Ok(WebhookDisposition::Ignored(reason)) => ApiResponse::success(Value::Null, reason)
            .with_status(StatusCode::OK)
            .into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPayload {
    File {
        content_identifier: String,
        filename: String,
    },
    Text {
        text: String,
        #[serde(default)]
        item_ref: Option<i64>,
    },
    QuizAnswer {
        text: String,
        item_ref: i64,
        answer_key: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct QueueSubmissionRequest {
    pub owner_module_ref: i64,
    pub user_ref: i64,
    #[serde(default)]
    pub group_ref: Option<i64>,
    /// Defaults to the user.
    #[serde(default)]
    pub submitter_ref: Option<i64>,
    pub content_category: String,
    pub content: ContentPayload,
}

impl From<QueueSubmissionRequest> for NewSubmission {
    fn from(req: QueueSubmissionRequest) -> Self {
        let content = match req.content {
            ContentPayload::File {
                content_identifier,
                filename,
            } => SubmittedContent::File {
                content_identifier,
                filename,
            },
            ContentPayload::Text { text, item_ref } => SubmittedContent::Text { text, item_ref },
            ContentPayload::QuizAnswer {
                text,
                item_ref,
                answer_key,
            } => SubmittedContent::QuizAnswer {
                text,
                item_ref,
                answer_key,
            },
        };
        NewSubmission {
            owner_module_ref: req.owner_module_ref,
            user_ref: req.user_ref,
            group_ref: req.group_ref,
            submitter_ref: req.submitter_ref.unwrap_or(req.user_ref),
            content_category: req.content_category,
            content,
        }
    }
}

/// POST /api/plagiarism/submissions
///
/// Starts tracking submitted content. Posting the same owner, user and
/// content again returns the submission already tracking it.
///
/// ### Request Body
/// ```json
/// {
///   "owner_module_ref": 10,
///   "user_ref": 7,
///   "content_category": "assignment",
///   "content": { "kind": "file", "content_identifier": "f3a9...", "filename": "essay.docx" }
/// }
/// ```
/// `content.kind` is one of `file`, `text` (`text`, optional `item_ref`) or
/// `quiz_answer` (`text`, `item_ref`, `answer_key`).
///
/// ### Responses
/// - `200 OK` with the queued (or already tracked) submission
/// - `422 Unprocessable Entity` for a malformed body
pub async fn queue_submission(
    State(app_state): State<AppState>,
    Json(req): Json<QueueSubmissionRequest>,
) -> Response {
    match app_state.lifecycle().queue_submission(req.into()).await {
        Ok(model) => ApiResponse::success(model, "Submission queued")
            .with_status(StatusCode::OK)
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /api/plagiarism/submissions/{submission_id}/resubmit
///
/// Puts a submission in `error` back in the queue with fresh retry budgets.
///
/// ### Responses
/// - `200 OK` with the re-queued submission
/// - `404 Not Found` if no such submission is tracked
/// - `409 Conflict` if the submission is not in `error`
pub async fn resubmit_submission(
    State(app_state): State<AppState>,
    Path(submission_id): Path<i64>,
) -> Response {
    match app_state.lifecycle().resubmit(submission_id).await {
        Ok(model) => ApiResponse::success(model, "Submission re-queued")
            .with_status(StatusCode::OK)
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /api/plagiarism/users/{user_id}/eula
///
/// Records that the user accepted the similarity service's licence and
/// re-queues every submission that was blocked on it.
///
/// ```json
/// { "success": true, "data": { "requeued": 2 }, "message": "Licence acceptance recorded" }
/// ```
pub async fn accept_eula(State(app_state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    match app_state
        .lifecycle()
        .requeue_after_eula_acceptance(user_id)
        .await
    {
        Ok(requeued) => ApiResponse::success(
            json!({ "requeued": requeued.len() }),
            "Licence acceptance recorded",
        )
        .with_status(StatusCode::OK)
        .into_response(),
        Err(err) => error_response(err),
    }
}
