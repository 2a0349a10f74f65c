//! Inbound notifications from the similarity service.
//!
//! A delivery is authenticated with an HMAC-SHA256 of the raw body and then
//! fed into the same lifecycle operations the scheduler uses.

use db::models::plagiarism_submission::{self, SubmissionStatus};
use db::models::plagiarism_webhook;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

use crate::client::SubmissionInfo;
use crate::client::types::remote_status;
use crate::error::PlagiarismError;
use crate::generation;
use crate::lifecycle::SubmissionLifecycleManager;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    SubmissionComplete,
    SimilarityComplete,
    SimilarityUpdated,
}

impl WebhookEvent {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUBMISSION_COMPLETE" => Some(WebhookEvent::SubmissionComplete),
            "SIMILARITY_COMPLETE" => Some(WebhookEvent::SimilarityComplete),
            "SIMILARITY_UPDATED" => Some(WebhookEvent::SimilarityUpdated),
            _ => None,
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WebhookEvent::SubmissionComplete => "SUBMISSION_COMPLETE",
            WebhookEvent::SimilarityComplete => "SIMILARITY_COMPLETE",
            WebhookEvent::SimilarityUpdated => "SIMILARITY_UPDATED",
        };
        write!(f, "{s}")
    }
}

/// What happened to an authenticated delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookDisposition {
    Applied {
        submission_id: i64,
        status: SubmissionStatus,
    },
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct Delivery {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    submission_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    overall_match_percentage: Option<f64>,
    #[serde(default)]
    event_type: Option<String>,
}

pub struct WebhookGateway {
    lifecycle: Arc<SubmissionLifecycleManager>,
    fallback_secret: Option<String>,
}

impl WebhookGateway {
    pub fn new(lifecycle: Arc<SubmissionLifecycleManager>) -> Self {
        let fallback_secret = lifecycle.config().webhook_secret.clone();
        Self {
            lifecycle,
            fallback_secret,
        }
    }

    /// Verifies and applies one delivery.
    ///
    /// Nothing is read from the body, let alone written, until the signature
    /// has been checked.
    pub async fn handle(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
        event_header: Option<&str>,
        now: i64,
    ) -> Result<WebhookDisposition, PlagiarismError> {
        let secret = self.secret().await?.ok_or(PlagiarismError::Signature)?;
        let signature = signature.ok_or(PlagiarismError::Signature)?;
        if !verify_signature(secret.as_bytes(), raw_body, signature) {
            tracing::warn!("webhook delivery with invalid signature rejected");
            return Err(PlagiarismError::Signature);
        }

        let delivery: Delivery = serde_json::from_slice(raw_body)
            .map_err(|e| PlagiarismError::Payload(e.to_string()))?;

        let event_name = event_header
            .map(str::to_string)
            .or_else(|| delivery.event_type.clone())
            .unwrap_or_default();
        let Some(event) = WebhookEvent::parse(&event_name) else {
            tracing::debug!(event = %event_name, "ignoring unhandled webhook event");
            return Ok(WebhookDisposition::Ignored(format!("unhandled event {event_name}")));
        };

        let external_id = match event {
            WebhookEvent::SubmissionComplete => {
                delivery.id.clone().or(delivery.submission_id.clone())
            }
            _ => delivery.submission_id.clone().or(delivery.id.clone()),
        }
        .ok_or_else(|| PlagiarismError::Payload("missing submission id".into()))?;

        let Some(model) =
            plagiarism_submission::Entity::find_by_external_id(self.lifecycle.db(), &external_id)
                .await?
        else {
            tracing::debug!(external_id = %external_id, "webhook for unknown submission");
            return Ok(WebhookDisposition::Ignored(format!("unknown submission {external_id}")));
        };

        tracing::info!(
            submission_id = model.id,
            external_id = %external_id,
            event = %event,
            "webhook received"
        );

        if model.status.is_terminal() {
            return Ok(WebhookDisposition::Ignored(format!(
                "submission {} is {}",
                model.id, model.status
            )));
        }

        let next = match event {
            WebhookEvent::SubmissionComplete => {
                // Polling got there first.
                if !matches!(
                    model.status,
                    SubmissionStatus::Uploaded | SubmissionStatus::Processing
                ) {
                    return Ok(WebhookDisposition::Ignored(format!(
                        "submission {} already {}",
                        model.id, model.status
                    )));
                }
                if delivery.status.as_deref() == Some(remote_status::COMPLETE)
                    && !generation::is_due(&model, now)
                {
                    return Ok(WebhookDisposition::Ignored(format!(
                        "report for submission {} not due until {}",
                        model.id, model.generation_time
                    )));
                }
                let info = SubmissionInfo {
                    id: Some(external_id),
                    status: delivery.status,
                    error_code: delivery.error_code,
                };
                self.lifecycle.apply_remote_info(&model, info, now).await?
            }
            WebhookEvent::SimilarityComplete | WebhookEvent::SimilarityUpdated => {
                if delivery.status.as_deref() != Some(remote_status::COMPLETE) {
                    return Ok(WebhookDisposition::Ignored(format!(
                        "similarity not complete for submission {}",
                        model.id
                    )));
                }
                self.lifecycle
                    .record_score(&model, delivery.overall_match_percentage, now)
                    .await?
            }
        };

        Ok(WebhookDisposition::Applied {
            submission_id: next.id,
            status: next.status,
        })
    }

    /// Secret of the stored registration, else the configured one.
    async fn secret(&self) -> Result<Option<String>, PlagiarismError> {
        let stored = plagiarism_webhook::Entity::current(self.lifecycle.db()).await?;
        Ok(stored.map(|w| w.secret).or_else(|| self.fallback_secret.clone()))
    }
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of a hex signature against the body's HMAC.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
