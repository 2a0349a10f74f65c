//! Periodic driver for the lifecycle.
//!
//! Each pass handles at most `batch_size` submissions, one after another.
//! Two passes of the same kind must not run concurrently; the status
//! compare-and-swap on every write keeps an accidental overlap from
//! regressing a submission but can still send one twice.

use db::models::plagiarism_submission::{self, Model, SubmissionStatus};
use db::models::plagiarism_webhook;
use rand::RngCore;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::client::types::WEBHOOK_EVENTS;
use crate::client::{CallOutcome, ServiceMetadata, WebhookRegistration, decode};
use crate::content::ModuleState;
use crate::error::{ClientError, PlagiarismError};
use crate::lifecycle::{CreateOutcome, SubmissionLifecycleManager, UploadOutcome};
use crate::retry::Phase;

const METADATA_MAX_AGE_SECONDS: i64 = 24 * 60 * 60;

/// Counts for one pass, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub selected: usize,
    pub advanced: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookHealth {
    Healthy { external_id: String },
    Registered { external_id: String },
}

pub struct BatchScheduler {
    lifecycle: Arc<SubmissionLifecycleManager>,
    metadata: RwLock<Option<ServiceMetadata>>,
}

impl BatchScheduler {
    pub fn new(lifecycle: Arc<SubmissionLifecycleManager>) -> Self {
        Self {
            lifecycle,
            metadata: RwLock::new(None),
        }
    }

    pub fn lifecycle(&self) -> &Arc<SubmissionLifecycleManager> {
        &self.lifecycle
    }

    /// Runs every periodic job once. Failures are logged, never propagated.
    pub async fn tick(&self, now: i64) {
        if let Err(e) = self.ensure_webhook().await {
            tracing::warn!(error = %e, "webhook check failed");
        }
        if self.metadata_is_stale(now).await {
            if let Err(e) = self.refresh_service_metadata(now).await {
                tracing::warn!(error = %e, "service metadata refresh failed");
            }
        }
        match self.run_send_phase(now).await {
            Ok(summary) => tracing::info!(?summary, "send phase finished"),
            Err(e) => self.unexpected("send phase", &e).await,
        }
        match self.run_report_phase(now).await {
            Ok(summary) => tracing::info!(?summary, "report phase finished"),
            Err(e) => self.unexpected("report phase", &e).await,
        }
    }

    // ─── Send phase ─────────────────────────────────────────────────

    /// Creates and uploads queued submissions.
    pub async fn run_send_phase(&self, now: i64) -> Result<PassSummary, PlagiarismError> {
        let config = self.lifecycle.config();
        let batch = plagiarism_submission::Entity::pending_send(
            self.lifecycle.db(),
            self.lifecycle.policy().max_attempts(Phase::Send),
            now,
            config.batch_size,
        )
        .await?;

        let mut summary = PassSummary {
            selected: batch.len(),
            ..PassSummary::default()
        };

        for model in batch {
            match self.send_one(&model, now).await {
                Ok(true) => summary.advanced += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    log_failure(&model, &e);
                }
            }
        }
        Ok(summary)
    }

    async fn send_one(&self, model: &Model, now: i64) -> Result<bool, PlagiarismError> {
        if self.lifecycle.module_state(model.owner_module_ref).await? == ModuleState::Gone {
            self.lifecycle.abort_owner_gone(model).await?;
            return Ok(true);
        }

        // Nothing is created remotely until the author finalises the draft.
        if self.lifecycle.defer_if_draft(model, now).await?.is_some() {
            return Ok(false);
        }

        let created = match self.lifecycle.create_remote(model, now).await? {
            CreateOutcome::Created(created) => created,
            CreateOutcome::EulaBlocked(_) | CreateOutcome::PermanentError(_) => return Ok(true),
        };

        match self.lifecycle.upload_content(&created, now).await? {
            UploadOutcome::Deferred(_) => Ok(false),
            UploadOutcome::Uploaded(_)
            | UploadOutcome::EmptyDeleted(_)
            | UploadOutcome::PermanentError(_) => Ok(true),
        }
    }

    // ─── Report phase ───────────────────────────────────────────────

    /// Requests reports and polls scores for submissions that are due.
    pub async fn run_report_phase(&self, now: i64) -> Result<PassSummary, PlagiarismError> {
        let config = self.lifecycle.config();
        let batch = plagiarism_submission::Entity::pending_report(
            self.lifecycle.db(),
            now,
            config.batch_size,
        )
        .await?;

        let mut summary = PassSummary {
            selected: batch.len(),
            ..PassSummary::default()
        };

        for model in batch {
            match self.report_one(&model, now).await {
                Ok(true) => summary.advanced += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    log_failure(&model, &e);
                }
            }
        }
        Ok(summary)
    }

    async fn report_one(&self, model: &Model, now: i64) -> Result<bool, PlagiarismError> {
        let settings = match self.lifecycle.module_state(model.owner_module_ref).await? {
            ModuleState::Active(settings) => settings,
            ModuleState::PendingDeletion(_) => return Ok(false),
            ModuleState::Gone => {
                self.lifecycle.abort_owner_gone(model).await?;
                return Ok(true);
            }
        };

        let config = self.lifecycle.config();
        match model.status {
            SubmissionStatus::Uploaded | SubmissionStatus::Processing => {
                let since = model.submitted_at.unwrap_or(0);
                if now < since + config.grace.uploaded(config.test_mode) {
                    return Ok(false);
                }
                self.lifecycle.check_info_then_maybe_request(model, now).await?;
            }
            SubmissionStatus::Requested => {
                let since = model.requested_at.unwrap_or(0);
                if now < since + config.grace.requested(config.test_mode) {
                    return Ok(false);
                }
                self.lifecycle.fetch_score(model, now).await?;
            }
            SubmissionStatus::Complete if model.to_generate => {
                // The report already covers everything up to the due date.
                let due_date = self.lifecycle.due_date(model, &settings).await?;
                let force_skip = due_date > 0 && model.requested_at.unwrap_or(0) >= due_date;
                self.lifecycle.request_generation(model, force_skip, now).await?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    // ─── Service housekeeping ───────────────────────────────────────

    /// Makes sure a working webhook registration exists, replacing one that is
    /// unknown to the service or points at the wrong callback URL.
    ///
    /// The stored registration is only replaced after the service has listed
    /// its webhooks; a failed listing leaves it in place.
    pub async fn ensure_webhook(&self) -> Result<WebhookHealth, PlagiarismError> {
        let db = self.lifecycle.db();
        let api = self.lifecycle.api();
        let callback = &self.lifecycle.config().webhook_url;

        if let Some(stored) = plagiarism_webhook::Entity::current(db).await? {
            let registrations: Vec<WebhookRegistration> = match api.list_webhooks().await {
                CallOutcome::Success { body, .. } => decode(&body)?,
                CallOutcome::ApplicationError { status, code, .. } => {
                    tracing::warn!(status, code = %code, "could not list webhooks");
                    return Err(ClientError::Rejected { status, code }.into());
                }
                CallOutcome::TransportFailure(reason) => {
                    return Err(ClientError::Transport(reason).into());
                }
            };

            match registrations.iter().find(|r| r.id == stored.external_id) {
                Some(remote) if remote.url == *callback && stored.url == *callback => {
                    return Ok(WebhookHealth::Healthy {
                        external_id: stored.external_id,
                    });
                }
                Some(remote) => {
                    tracing::info!(
                        webhook_id = %remote.id,
                        url = %remote.url,
                        "replacing misdirected webhook"
                    );
                    if let CallOutcome::ApplicationError { status, code, .. } =
                        api.delete_webhook(&remote.id).await
                    {
                        tracing::warn!(status, code = %code, "could not delete stale webhook");
                    }
                }
                None => {
                    tracing::info!(
                        webhook_id = %stored.external_id,
                        "stored webhook unknown to the service"
                    );
                }
            }
            plagiarism_webhook::Entity::clear(db).await?;
        }

        let secret = self
            .lifecycle
            .config()
            .webhook_secret
            .clone()
            .unwrap_or_else(generate_secret);

        match api.create_webhook(callback, &secret).await {
            CallOutcome::Success { body, .. } => {
                let external_id = body
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| PlagiarismError::Payload("webhook without id".into()))?;
                plagiarism_webhook::Entity::replace(db, external_id, callback, &secret).await?;
                tracing::info!(
                    webhook_id = %external_id,
                    events = ?WEBHOOK_EVENTS,
                    "webhook registered"
                );
                Ok(WebhookHealth::Registered {
                    external_id: external_id.to_string(),
                })
            }
            CallOutcome::ApplicationError {
                status,
                code,
                message,
            } => Err(PlagiarismError::Payload(format!(
                "webhook registration rejected ({status} {code}): {}",
                message.unwrap_or_default()
            ))),
            CallOutcome::TransportFailure(reason) => {
                Err(ClientError::Transport(reason).into())
            }
        }
    }

    /// Fetches the latest licence version and enabled features and caches them.
    pub async fn refresh_service_metadata(
        &self,
        now: i64,
    ) -> Result<ServiceMetadata, PlagiarismError> {
        let api = self.lifecycle.api();

        let eula = expect_success(api.latest_eula_version().await)?;
        let features = expect_success(api.enabled_features().await)?;

        let metadata = ServiceMetadata {
            eula_version: eula.get("version").and_then(Value::as_str).map(str::to_string),
            eula_url: eula.get("url").and_then(Value::as_str).map(str::to_string),
            features,
            fetched_at: now,
        };
        *self.metadata.write().await = Some(metadata.clone());
        tracing::debug!(eula_version = ?metadata.eula_version, "service metadata refreshed");
        Ok(metadata)
    }

    /// Last metadata fetched by [`Self::refresh_service_metadata`].
    pub async fn service_metadata(&self) -> Option<ServiceMetadata> {
        self.metadata.read().await.clone()
    }

    async fn metadata_is_stale(&self, now: i64) -> bool {
        match self.metadata.read().await.as_ref() {
            Some(metadata) => now - metadata.fetched_at >= METADATA_MAX_AGE_SECONDS,
            None => true,
        }
    }

    async fn unexpected(&self, context: &str, error: &PlagiarismError) {
        self.lifecycle.diagnostics().unexpected(context, error).await;
    }
}

fn expect_success(outcome: CallOutcome) -> Result<Value, PlagiarismError> {
    match outcome {
        CallOutcome::Success { body, .. } => Ok(body),
        CallOutcome::ApplicationError { status, code, .. } => Err(PlagiarismError::Payload(
            format!("service answered {status} {code}"),
        )),
        CallOutcome::TransportFailure(reason) => {
            Err(ClientError::Transport(reason).into())
        }
    }
}

fn generate_secret() -> String {
    let mut buf = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

fn log_failure(model: &Model, error: &PlagiarismError) {
    if error.is_permanent() {
        tracing::info!(submission_id = model.id, error = %error, "submission aborted");
    } else {
        tracing::warn!(submission_id = model.id, error = %error, "submission will be retried");
    }
}
