use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

use super::ReportingClient;
use super::types::{
    ApiRequest, CallOutcome, CreateSubmissionRequest, Envelope, Method, RequestBody,
    TimeoutClass, WEBHOOK_EVENTS,
};
use crate::error::{ClientError, PlagiarismError};

/// Search repositories requested for every similarity report.
const SEARCH_REPOSITORIES: [&str; 5] = [
    "INTERNET",
    "SUBMITTED_WORK",
    "PUBLICATION",
    "CROSSREF",
    "CROSSREF_POSTED_CONTENT",
];

/// Typed calls against the similarity service.
#[derive(Clone)]
pub struct ReportingApi {
    client: Arc<dyn ReportingClient>,
}

impl ReportingApi {
    pub fn new(client: Arc<dyn ReportingClient>) -> Self {
        Self { client }
    }

    pub async fn call(&self, request: ApiRequest) -> CallOutcome {
        let endpoint = request.endpoint.clone();
        let outcome = classify(self.client.send(request).await);
        if let CallOutcome::TransportFailure(reason) = &outcome {
            tracing::warn!(
                endpoint = %endpoint,
                reason = %reason,
                "similarity service unreachable"
            );
        }
        outcome
    }

    pub async fn create_submission(&self, request: &CreateSubmissionRequest) -> CallOutcome {
        let body = match serde_json::to_value(request) {
            Ok(body) => body,
            Err(e) => return CallOutcome::TransportFailure(e.to_string()),
        };
        self.call(ApiRequest::post_json("/submissions", body, TimeoutClass::Long))
            .await
    }

    pub async fn upload_original(
        &self,
        external_id: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> CallOutcome {
        self.call(ApiRequest {
            method: Method::Put,
            endpoint: format!("/submissions/{external_id}/original"),
            body: RequestBody::Binary {
                bytes,
                filename: filename.to_string(),
            },
            timeout: TimeoutClass::Long,
        })
        .await
    }

    pub async fn request_report(&self, external_id: &str) -> CallOutcome {
        let body = json!({
            "generation_settings": {
                "search_repositories": SEARCH_REPOSITORIES,
                "auto_exclude_self_matching_scope": "ALL",
            },
        });
        self.call(ApiRequest::put_json(
            format!("/submissions/{external_id}/similarity"),
            body,
            TimeoutClass::Long,
        ))
        .await
    }

    pub async fn report_score(&self, external_id: &str) -> CallOutcome {
        self.call(ApiRequest::get(
            format!("/submissions/{external_id}/similarity"),
            TimeoutClass::Short,
        ))
        .await
    }

    pub async fn submission_info(&self, external_id: &str) -> CallOutcome {
        self.call(ApiRequest::get(
            format!("/submissions/{external_id}"),
            TimeoutClass::Short,
        ))
        .await
    }

    pub async fn list_webhooks(&self) -> CallOutcome {
        self.call(ApiRequest::get("/webhooks", TimeoutClass::Short))
            .await
    }

    pub async fn create_webhook(&self, url: &str, secret: &str) -> CallOutcome {
        let body = json!({
            "description": "Similarity report notifications",
            "url": url,
            "signing_secret": secret,
            "event_types": WEBHOOK_EVENTS,
            "allow_insecure": false,
        });
        self.call(ApiRequest::post_json("/webhooks", body, TimeoutClass::Short))
            .await
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> CallOutcome {
        self.call(ApiRequest::delete(
            format!("/webhooks/{webhook_id}"),
            TimeoutClass::Short,
        ))
        .await
    }

    pub async fn latest_eula_version(&self) -> CallOutcome {
        self.call(ApiRequest::get("/eula/latest", TimeoutClass::Short))
            .await
    }

    pub async fn enabled_features(&self) -> CallOutcome {
        self.call(ApiRequest::get("/features-enabled", TimeoutClass::Short))
            .await
    }

    pub async fn log_remote(&self, entry: Value) -> CallOutcome {
        self.call(ApiRequest::post_json("/logs", entry, TimeoutClass::Short))
            .await
    }
}

/// Folds a transport result into the outcome lifecycle code branches on.
pub fn classify(result: Result<Envelope, ClientError>) -> CallOutcome {
    match result {
        Ok(envelope) if envelope.is_success() => CallOutcome::Success {
            status: envelope.http_status,
            body: envelope.body,
        },
        Ok(envelope) => {
            let code = string_field(&envelope.body, &["code", "error_code", "status"])
                .unwrap_or_else(|| envelope.http_status.to_string());
            let message = string_field(&envelope.body, &["message", "debug_message"]);
            CallOutcome::ApplicationError {
                status: envelope.http_status,
                code,
                message,
            }
        }
        Err(err) => CallOutcome::TransportFailure(err.to_string()),
    }
}

fn string_field(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Decodes a success body into a typed payload.
pub fn decode<T: DeserializeOwned>(body: &Value) -> Result<T, PlagiarismError> {
    serde_json::from_value(body.clone()).map_err(|e| PlagiarismError::Payload(e.to_string()))
}
