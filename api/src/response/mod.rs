use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// JSON envelope for every response the API sends:
///
/// ```json
/// {
///   "success": true,
///   "data": { "submission_id": 12, "status": "requested" },
///   "message": "Webhook applied"
/// }
/// ```
///
/// Error responses carry `success: false`, the default value of `T` as `data`
/// and a human-readable `message`.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Error response; `T` must be `Default` since there is no useful payload.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }

    /// Pairs the envelope with a status code.
    pub fn with_status(self, status: StatusCode) -> impl IntoResponse {
        (status, Json(self))
    }
}
