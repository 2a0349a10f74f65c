use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Latency bound for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Status checks that sit next to webhook handling.
    Short,
    /// Bulk calls such as content upload.
    Long,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Binary { bytes: Vec<u8>, filename: String },
}

/// One outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured API base URL, e.g. `/submissions`.
    pub endpoint: String,
    pub body: RequestBody,
    pub timeout: TimeoutClass,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>, timeout: TimeoutClass) -> Self {
        Self {
            method: Method::Get,
            endpoint: endpoint.into(),
            body: RequestBody::Empty,
            timeout,
        }
    }

    pub fn delete(endpoint: impl Into<String>, timeout: TimeoutClass) -> Self {
        Self {
            method: Method::Delete,
            endpoint: endpoint.into(),
            body: RequestBody::Empty,
            timeout,
        }
    }

    pub fn post_json(endpoint: impl Into<String>, body: Value, timeout: TimeoutClass) -> Self {
        Self {
            method: Method::Post,
            endpoint: endpoint.into(),
            body: RequestBody::Json(body),
            timeout,
        }
    }

    pub fn put_json(endpoint: impl Into<String>, body: Value, timeout: TimeoutClass) -> Self {
        Self {
            method: Method::Put,
            endpoint: endpoint.into(),
            body: RequestBody::Json(body),
            timeout,
        }
    }
}

/// Normalized response: the HTTP status and the decoded body, whatever the
/// status. Non-JSON bodies are carried as a JSON string, empty ones as `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub http_status: u16,
    pub body: Value,
}

impl Envelope {
    pub fn new(http_status: u16, body: Value) -> Self {
        Self { http_status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }
}

/// What business logic branches on after a call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success {
        status: u16,
        body: Value,
    },
    /// The service answered with a non-success status.
    ApplicationError {
        status: u16,
        code: String,
        message: Option<String>,
    },
    /// No response was obtained.
    TransportFailure(String),
}

// ─── Remote payloads ────────────────────────────────────────────────

/// Remote status codes shared by submissions and reports.
pub mod remote_status {
    pub const CREATED: &str = "CREATED";
    pub const PROCESSING: &str = "PROCESSING";
    pub const COMPLETE: &str = "COMPLETE";
    pub const ERROR: &str = "ERROR";
}

/// Application error codes the lifecycle reacts to.
pub mod error_code {
    pub const CANNOT_EXTRACT_TEXT: &str = "CANNOT_EXTRACT_TEXT";
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
    pub const UNSUPPORTED_CONTENT: &str = "UNSUPPORTED_CONTENT";
}

pub const HTTP_CREATED: u16 = 201;
pub const HTTP_ACCEPTED: u16 = 202;
pub const HTTP_EULA_NOT_ACCEPTED: u16 = 451;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateSubmissionRequest {
    pub owner: String,
    pub submitter: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub extract_text_only: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmissionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimilarityScore {
    #[serde(default)]
    pub submission_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub overall_match_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookRegistration {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub event_types: Vec<String>,
}

/// Service-wide information cached for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub eula_version: Option<String>,
    pub eula_url: Option<String>,
    pub features: Value,
    pub fetched_at: i64,
}

/// Event types the webhook registration subscribes to.
pub const WEBHOOK_EVENTS: [&str; 3] = [
    "SUBMISSION_COMPLETE",
    "SIMILARITY_COMPLETE",
    "SIMILARITY_UPDATED",
];
