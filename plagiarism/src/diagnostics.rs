//! Best-effort mirroring of failures to the service's remote log endpoint.

use db::models::plagiarism_submission::Model;
use serde_json::json;

use crate::client::{CallOutcome, ReportingApi};

#[derive(Clone)]
pub struct DiagnosticReporter {
    api: ReportingApi,
    enabled: bool,
    integration_version: String,
}

impl DiagnosticReporter {
    pub fn new(api: ReportingApi, enabled: bool, integration_version: impl Into<String>) -> Self {
        Self {
            api,
            enabled,
            integration_version: integration_version.into(),
        }
    }

    pub fn disabled(api: ReportingApi) -> Self {
        Self::new(api, false, "")
    }

    /// Records a submission that ended in a terminal failure.
    pub async fn submission_failed(&self, submission: &Model, message: &str) {
        tracing::error!(
            submission_id = submission.id,
            external_id = submission.external_id.as_deref().unwrap_or("-"),
            status = %submission.status,
            reason = message,
            "submission failed permanently"
        );
        self.send(json!({
            "level": "error",
            "integration_version": self.integration_version,
            "submission_id": submission.id,
            "external_id": submission.external_id,
            "status": submission.status.to_string(),
            "message": message,
        }))
        .await;
    }

    /// Records an unexpected error outside a submission's own transitions.
    pub async fn unexpected(&self, context: &str, error: &(dyn std::error::Error + Sync)) {
        tracing::error!(context, error = %error, "unexpected plagiarism error");
        self.send(json!({
            "level": "error",
            "integration_version": self.integration_version,
            "context": context,
            "message": error.to_string(),
        }))
        .await;
    }

    async fn send(&self, entry: serde_json::Value) {
        if !self.enabled {
            return;
        }
        match self.api.log_remote(entry).await {
            CallOutcome::Success { .. } => {}
            CallOutcome::ApplicationError { status, code, .. } => {
                tracing::warn!(status, code = %code, "remote log entry rejected");
            }
            CallOutcome::TransportFailure(reason) => {
                tracing::warn!(reason = %reason, "remote log entry not delivered");
            }
        }
    }
}
