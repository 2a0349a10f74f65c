//! `/api/plagiarism` routes.
//!
//! - `POST /webhook` → signed notifications from the similarity service
//! - `POST /submissions` → start tracking a piece of submitted content
//! - `GET /submissions/{submission_id}` → current state of one submission
//! - `POST /submissions/{submission_id}/resubmit` → operator retry out of `error`
//! - `POST /users/{user_id}/eula` → the user accepted the licence; requeue their work
//! - `GET /service` → cached licence version and enabled features

use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use plagiarism::PlagiarismError;

pub mod get;
pub mod post;

/// Hex HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-plagiarism-signature";
/// Event type of a webhook delivery.
pub const EVENT_HEADER: &str = "x-plagiarism-event";

pub fn plagiarism_routes() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(post::receive_webhook))
        .route("/submissions", post(post::queue_submission))
        .route("/submissions/{submission_id}", get(get::get_submission))
        .route(
            "/submissions/{submission_id}/resubmit",
            post(post::resubmit_submission),
        )
        .route("/users/{user_id}/eula", post(post::accept_eula))
        .route("/service", get(get::get_service_metadata))
}

/// Maps an engine error onto a status code and the standard envelope.
pub(crate) fn error_response(err: PlagiarismError) -> Response {
    let status = match &err {
        PlagiarismError::Signature => StatusCode::UNAUTHORIZED,
        PlagiarismError::Payload(_) => StatusCode::BAD_REQUEST,
        PlagiarismError::NotFound(_) => StatusCode::NOT_FOUND,
        PlagiarismError::InvalidTransition { .. } | PlagiarismError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        PlagiarismError::OwnerGone => StatusCode::GONE,
        PlagiarismError::ContentUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
        PlagiarismError::Client(_) => StatusCode::BAD_GATEWAY,
        PlagiarismError::Db(_) | PlagiarismError::Content(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "plagiarism request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "plagiarism request refused");
    }

    ApiResponse::<()>::error(err.to_string())
        .with_status(status)
        .into_response()
}
