use super::error_response;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /api/plagiarism/submissions/{submission_id}
///
/// Returns the stored submission row: status, external id, score, retry
/// counters and the error code of a failed submission.
///
/// ### Responses
/// - `200 OK` with the submission as `data`
/// - `404 Not Found` if no such submission is tracked
pub async fn get_submission(
    State(app_state): State<AppState>,
    Path(submission_id): Path<i64>,
) -> Response {
    match app_state.lifecycle().find(submission_id).await {
        Ok(model) => ApiResponse::success(model, "Submission retrieved")
            .with_status(StatusCode::OK)
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /api/plagiarism/service
///
/// Licence version, licence URL and enabled features last fetched from the
/// similarity service by the scheduler.
///
/// ### Responses
/// - `200 OK` with the cached metadata
/// - `404 Not Found` before the first successful refresh
pub async fn get_service_metadata(State(app_state): State<AppState>) -> Response {
    match app_state.scheduler().service_metadata().await {
        Some(metadata) => ApiResponse::success(metadata, "Service metadata retrieved")
            .with_status(StatusCode::OK)
            .into_response(),
        None => ApiResponse::<()>::error("Service metadata has not been fetched yet")
            .with_status(StatusCode::NOT_FOUND)
            .into_response(),
    }
}
