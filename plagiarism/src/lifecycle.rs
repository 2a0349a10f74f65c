//! Drives one submission through creation, upload, generation and scoring.
//!
//! Each public operation corresponds to one remote call site and may be
//! retried: a repeated call either repeats the remote request or observes that
//! it is no longer needed. Every state change is computed by
//! [`submission::apply`] and written with a status compare-and-swap.

use db::models::plagiarism_submission::{
    self, ContentType, Model, SubmissionStatus,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::Value;
use std::sync::Arc;
use util::config::PlagiarismConfig;

use crate::client::types::{error_code, remote_status, HTTP_EULA_NOT_ACCEPTED};
use crate::client::{
    CallOutcome, CreateSubmissionRequest, ReportingApi, SimilarityScore, SubmissionInfo, decode,
};
use crate::content::{
    ContentRegistry, ContentSource, HostPlatform, ItemLookup, ModuleSettings, ModuleState,
    content_hash, find_answer,
};
use crate::diagnostics::DiagnosticReporter;
use crate::error::{ClientError, PlagiarismError};
use crate::generation::{self, GenerationSchedule};
use crate::retry::{Phase, RetryPolicy, UNKNOWN_ERROR};
use crate::submission::{self, SubmissionEvent};

/// Content handed over by the host's event translation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmittedContent {
    File {
        content_identifier: String,
        filename: String,
    },
    Text {
        text: String,
        /// Looked up through the content source when unknown.
        item_ref: Option<i64>,
    },
    /// One answer among several belonging to the same item.
    QuizAnswer {
        text: String,
        item_ref: i64,
        answer_key: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub owner_module_ref: i64,
    pub user_ref: i64,
    pub group_ref: Option<i64>,
    pub submitter_ref: i64,
    pub content_category: String,
    pub content: SubmittedContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Model),
    EulaBlocked(Model),
    PermanentError(Model),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Uploaded(Model),
    EmptyDeleted(Model),
    /// The content is still a draft; nothing was sent and the row waits one send interval.
    Deferred(Model),
    PermanentError(Model),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Requested(Model),
    /// Generation bookkeeping advanced without a remote request.
    Skipped(Model),
    PermanentError(Model),
}

impl RequestOutcome {
    pub fn into_model(self) -> Model {
        match self {
            RequestOutcome::Requested(m)
            | RequestOutcome::Skipped(m)
            | RequestOutcome::PermanentError(m) => m,
        }
    }
}

/// What to do when the remote side reports a submission as fully received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnRemoteComplete {
    RequestGeneration,
    AwaitScore,
}

enum ResolvedContent {
    Ready { bytes: Vec<u8>, filename: String },
    Draft,
}

pub struct SubmissionLifecycleManager {
    db: DatabaseConnection,
    api: ReportingApi,
    host: Arc<dyn HostPlatform>,
    registry: ContentRegistry,
    config: Arc<PlagiarismConfig>,
    policy: RetryPolicy,
    diagnostics: DiagnosticReporter,
}

impl SubmissionLifecycleManager {
    pub fn new(
        db: DatabaseConnection,
        api: ReportingApi,
        host: Arc<dyn HostPlatform>,
        registry: ContentRegistry,
        config: Arc<PlagiarismConfig>,
    ) -> Self {
        let policy = RetryPolicy::new(&config.retry);
        let diagnostics = DiagnosticReporter::new(
            api.clone(),
            config.remote_logging,
            config.integration_version.clone(),
        );
        Self {
            db,
            api,
            host,
            registry,
            config,
            policy,
            diagnostics,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn api(&self) -> &ReportingApi {
        &self.api
    }

    pub fn config(&self) -> &PlagiarismConfig {
        &self.config
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn diagnostics(&self) -> &DiagnosticReporter {
        &self.diagnostics
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.registry
    }

    pub async fn find(&self, id: i64) -> Result<Model, PlagiarismError> {
        plagiarism_submission::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(PlagiarismError::NotFound(id))
    }

    pub async fn module_state(&self, module_ref: i64) -> Result<ModuleState, PlagiarismError> {
        self.host.module_state(module_ref).await
    }

    // ─── Intake and operator paths ──────────────────────────────────

    /// Starts tracking a piece of content, or returns the row already tracking it.
    pub async fn queue_submission(&self, new: NewSubmission) -> Result<Model, PlagiarismError> {
        let (content_type, content_identifier, item_ref, answer_key, filename) = match &new.content
        {
            SubmittedContent::File {
                content_identifier,
                filename,
            } => (
                ContentType::File,
                content_identifier.clone(),
                None,
                None,
                Some(filename.clone()),
            ),
            SubmittedContent::Text { text, item_ref } => {
                let item_ref = match item_ref {
                    Some(item_ref) => Some(*item_ref),
                    None => self.resolve_item_ref(&new, text).await?,
                };
                (ContentType::Text, content_hash(text), item_ref, None, None)
            }
            SubmittedContent::QuizAnswer {
                text,
                item_ref,
                answer_key,
            } => (
                ContentType::Text,
                content_hash(text),
                Some(*item_ref),
                Some(answer_key.clone()),
                None,
            ),
        };

        if let Some(existing) = plagiarism_submission::Entity::find_tracked(
            &self.db,
            new.owner_module_ref,
            new.user_ref,
            &content_identifier,
            answer_key.as_deref(),
        )
        .await?
        {
            tracing::debug!(submission_id = existing.id, "content already tracked");
            return Ok(existing);
        }

        let model = plagiarism_submission::Entity::create_queued(
            &self.db,
            plagiarism_submission::NewSubmission {
                owner_module_ref: new.owner_module_ref,
                user_ref: new.user_ref,
                group_ref: new.group_ref,
                submitter_ref: new.submitter_ref,
                content_identifier,
                content_item_ref: item_ref,
                content_type,
                content_category: new.content_category,
                quiz_answer_key: answer_key,
                filename,
            },
        )
        .await?;

        tracing::info!(
            submission_id = model.id,
            owner_module_ref = model.owner_module_ref,
            category = %model.content_category,
            "submission queued"
        );
        Ok(model)
    }

    /// Puts a user's licence-blocked submissions back in the queue once they
    /// have accepted the licence.
    pub async fn requeue_after_eula_acceptance(
        &self,
        user_ref: i64,
    ) -> Result<Vec<Model>, PlagiarismError> {
        let blocked = plagiarism_submission::Entity::list_by_user_and_status(
            &self.db,
            user_ref,
            SubmissionStatus::EulaNotAccepted,
        )
        .await?;

        let mut requeued = Vec::with_capacity(blocked.len());
        for model in blocked {
            requeued.push(self.transition(&model, SubmissionEvent::Requeued).await?);
        }
        Ok(requeued)
    }

    /// Operator retry of a submission in `error`.
    pub async fn resubmit(&self, id: i64) -> Result<Model, PlagiarismError> {
        let model = self.find(id).await?;
        self.transition(&model, SubmissionEvent::Resubmitted).await
    }

    /// Fails the submission permanently because its module no longer exists.
    pub async fn abort_owner_gone(&self, model: &Model) -> Result<Model, PlagiarismError> {
        self.transition(model, SubmissionEvent::OwnerGone).await
    }

    // ─── Remote call sites ──────────────────────────────────────────

    pub async fn create_remote(
        &self,
        model: &Model,
        now: i64,
    ) -> Result<CreateOutcome, PlagiarismError> {
        self.settings_or_abort(model).await?;

        if let Some(external_id) = &model.external_id {
            if model.status == SubmissionStatus::Created {
                return Ok(CreateOutcome::Created(model.clone()));
            }
            let event = SubmissionEvent::Created {
                external_id: external_id.clone(),
                at: now,
            };
            return Ok(CreateOutcome::Created(self.transition(model, event).await?));
        }

        let request = CreateSubmissionRequest {
            owner: model.user_ref.to_string(),
            submitter: model.submitter_ref.to_string(),
            title: title(model),
            group: model.group_ref.map(|g| g.to_string()),
            extract_text_only: false,
        };

        match self.api.create_submission(&request).await {
            CallOutcome::Success { body, .. } => match body.get("id").and_then(Value::as_str) {
                Some(external_id) => {
                    let event = SubmissionEvent::Created {
                        external_id: external_id.to_string(),
                        at: now,
                    };
                    Ok(CreateOutcome::Created(self.transition(model, event).await?))
                }
                None => {
                    let event = SubmissionEvent::CreateFailed {
                        code: error_code::INVALID_RESPONSE.to_string(),
                    };
                    Ok(CreateOutcome::PermanentError(self.transition(model, event).await?))
                }
            },
            CallOutcome::ApplicationError { status, .. } if status == HTTP_EULA_NOT_ACCEPTED => {
                let next = self
                    .transition(model, SubmissionEvent::EulaRejected { at: now })
                    .await?;
                if next.status == SubmissionStatus::Error {
                    Ok(CreateOutcome::PermanentError(next))
                } else {
                    Ok(CreateOutcome::EulaBlocked(next))
                }
            }
            CallOutcome::ApplicationError { code, .. } => {
                let next = self
                    .transition(model, SubmissionEvent::CreateFailed { code })
                    .await?;
                Ok(CreateOutcome::PermanentError(next))
            }
            CallOutcome::TransportFailure(reason) => {
                Err(self.transport_failed(model, Phase::Send, reason, now).await)
            }
        }
    }

    /// Pushes a draft text submission back by one send interval.
    ///
    /// Returns the deferred row, or `None` when the content can be sent now.
    pub async fn defer_if_draft(
        &self,
        model: &Model,
        now: i64,
    ) -> Result<Option<Model>, PlagiarismError> {
        if model.content_type != ContentType::Text {
            return Ok(None);
        }
        let (Some(source), Some(item_ref)) =
            (self.registry.get(&model.content_category), model.content_item_ref)
        else {
            return Ok(None);
        };
        if !source.is_draft(item_ref).await? {
            return Ok(None);
        }

        tracing::debug!(submission_id = model.id, "content is still a draft; deferring");
        let next = self
            .transition(model, SubmissionEvent::DraftDeferred { at: now })
            .await?;
        Ok(Some(next))
    }

    pub async fn upload_content(
        &self,
        model: &Model,
        now: i64,
    ) -> Result<UploadOutcome, PlagiarismError> {
        let settings = self.settings_or_abort(model).await?;

        let external_id = match (&model.external_id, model.status) {
            (Some(external_id), SubmissionStatus::Created) => external_id.clone(),
            _ => {
                return Err(PlagiarismError::InvalidTransition {
                    from: model.status,
                    event: "uploaded",
                });
            }
        };

        let source = self.registry.get(&model.content_category);
        if model.content_type == ContentType::Text && source.is_none() {
            tracing::warn!(
                submission_id = model.id,
                category = %model.content_category,
                "no content source registered"
            );
            let event = SubmissionEvent::UploadFailed {
                code: error_code::UNSUPPORTED_CONTENT.to_string(),
            };
            return Ok(UploadOutcome::PermanentError(self.transition(model, event).await?));
        }

        let (bytes, filename) = match self.resolve_content(model, source.as_deref()).await {
            Ok(ResolvedContent::Ready { bytes, filename }) => (bytes, filename),
            Ok(ResolvedContent::Draft) => {
                tracing::debug!(submission_id = model.id, "content is still a draft");
                let next = self
                    .transition(model, SubmissionEvent::DraftDeferred { at: now })
                    .await?;
                return Ok(UploadOutcome::Deferred(next));
            }
            Err(PlagiarismError::ContentUnavailable) => {
                let next = self.transition(model, SubmissionEvent::ContentMissing).await?;
                return Ok(UploadOutcome::EmptyDeleted(next));
            }
            Err(e) => return Err(e),
        };

        match self.api.upload_original(&external_id, bytes, &filename).await {
            CallOutcome::Success { .. } => {
                let due_date = self.due_date(model, &settings).await?;
                let schedule = generation::schedule(
                    settings.report_gen_mode,
                    SubmissionStatus::Uploaded,
                    due_date,
                    false,
                    now,
                );
                let next = self
                    .transition(model, SubmissionEvent::Uploaded { schedule })
                    .await?;
                Ok(UploadOutcome::Uploaded(next))
            }
            CallOutcome::ApplicationError { code, .. } => {
                let next = self
                    .transition(model, SubmissionEvent::UploadFailed { code })
                    .await?;
                Ok(UploadOutcome::PermanentError(next))
            }
            CallOutcome::TransportFailure(reason) => {
                Err(self.transport_failed(model, Phase::Send, reason, now).await)
            }
        }
    }

    /// Asks the remote service to generate a report.
    ///
    /// With `force_skip` the pending regeneration is marked done without a
    /// remote request.
    pub async fn request_generation(
        &self,
        model: &Model,
        force_skip: bool,
        now: i64,
    ) -> Result<RequestOutcome, PlagiarismError> {
        self.settings_or_abort(model).await?;

        if force_skip {
            let next = self
                .transition(model, SubmissionEvent::ForceSkip { at: now })
                .await?;
            return Ok(RequestOutcome::Skipped(next));
        }

        let external_id = require_external_id(model, "generation_requested")?;
        match self.api.request_report(&external_id).await {
            CallOutcome::Success { body, .. } => {
                let event = match body.get("error_code").and_then(Value::as_str) {
                    Some(code) => SubmissionEvent::GenerationRejected {
                        code: code.to_string(),
                    },
                    None => SubmissionEvent::GenerationRequested { at: now },
                };
                let next = self.transition(model, event).await?;
                if next.status == SubmissionStatus::Error {
                    Ok(RequestOutcome::PermanentError(next))
                } else {
                    Ok(RequestOutcome::Requested(next))
                }
            }
            CallOutcome::ApplicationError { code, .. } => {
                let next = self
                    .transition(model, SubmissionEvent::GenerationRejected { code })
                    .await?;
                Ok(RequestOutcome::PermanentError(next))
            }
            CallOutcome::TransportFailure(reason) => {
                Err(self.transport_failed(model, Phase::Report, reason, now).await)
            }
        }
    }

    /// Checks the remote submission status and requests generation once the
    /// upload has been fully processed.
    pub async fn check_info_then_maybe_request(
        &self,
        model: &Model,
        now: i64,
    ) -> Result<Model, PlagiarismError> {
        self.settings_or_abort(model).await?;
        let external_id = require_external_id(model, "remote_processing")?;
        self.query_info(model, &external_id, OnRemoteComplete::RequestGeneration, now)
            .await
    }

    /// Retrieves the similarity score. A report that is not ready is
    /// disambiguated with a submission-info check.
    pub async fn fetch_score(&self, model: &Model, now: i64) -> Result<Model, PlagiarismError> {
        let settings = self.settings_or_abort(model).await?;
        let external_id = require_external_id(model, "score_complete")?;

        match self.api.report_score(&external_id).await {
            CallOutcome::Success { body, .. } => {
                let score: SimilarityScore = decode(&body)?;
                if score.status.as_deref() == Some(remote_status::COMPLETE) {
                    return self
                        .store_score(model, &settings, score.overall_match_percentage, now)
                        .await;
                }
                tracing::debug!(
                    submission_id = model.id,
                    remote_status = score.status.as_deref().unwrap_or("-"),
                    "report not ready"
                );
            }
            CallOutcome::ApplicationError { status, code, .. } => {
                tracing::debug!(
                    submission_id = model.id,
                    status,
                    code = %code,
                    "score unavailable"
                );
            }
            CallOutcome::TransportFailure(reason) => {
                return Err(self.transport_failed(model, Phase::Report, reason, now).await);
            }
        }

        self.query_info(model, &external_id, OnRemoteComplete::AwaitScore, now)
            .await
    }

    /// Stores a completed score, e.g. one pushed by a webhook.
    pub async fn record_score(
        &self,
        model: &Model,
        score: Option<f64>,
        now: i64,
    ) -> Result<Model, PlagiarismError> {
        let settings = self.settings_or_abort(model).await?;
        self.store_score(model, &settings, score, now).await
    }

    /// Applies a submission status reported by the remote side (polled or pushed).
    pub async fn apply_remote_info(
        &self,
        model: &Model,
        info: SubmissionInfo,
        now: i64,
    ) -> Result<Model, PlagiarismError> {
        self.settings_or_abort(model).await?;
        self.react_to_info(model, info, OnRemoteComplete::RequestGeneration, now)
            .await
    }

    /// Earliest time generation may be requested, given the module's due date.
    pub async fn due_date(
        &self,
        model: &Model,
        settings: &ModuleSettings,
    ) -> Result<i64, PlagiarismError> {
        match self.registry.get(&model.content_category) {
            Some(source) => source.due_date(settings.module_instance_ref).await,
            None => Ok(0),
        }
    }

    // ─── Internals ──────────────────────────────────────────────────

    async fn store_score(
        &self,
        model: &Model,
        settings: &ModuleSettings,
        score: Option<f64>,
        now: i64,
    ) -> Result<Model, PlagiarismError> {
        let due_date = self.due_date(model, settings).await?;
        let schedule: GenerationSchedule = generation::schedule(
            settings.report_gen_mode,
            SubmissionStatus::Complete,
            due_date,
            true,
            now,
        );
        self.transition(model, SubmissionEvent::ScoreComplete { score, schedule })
            .await
    }

    async fn query_info(
        &self,
        model: &Model,
        external_id: &str,
        on_complete: OnRemoteComplete,
        now: i64,
    ) -> Result<Model, PlagiarismError> {
        match self.api.submission_info(external_id).await {
            CallOutcome::Success { body, .. } => {
                let info: SubmissionInfo = decode(&body)?;
                self.react_to_info(model, info, on_complete, now).await
            }
            CallOutcome::ApplicationError { code, .. } => {
                self.transition(model, SubmissionEvent::RemoteError { code })
                    .await
            }
            CallOutcome::TransportFailure(reason) => {
                Err(self.transport_failed(model, Phase::Report, reason, now).await)
            }
        }
    }

    async fn react_to_info(
        &self,
        model: &Model,
        info: SubmissionInfo,
        on_complete: OnRemoteComplete,
        now: i64,
    ) -> Result<Model, PlagiarismError> {
        match info.status.as_deref() {
            Some(remote_status::COMPLETE) => match on_complete {
                // The report phase picks the row up once its generation time comes.
                OnRemoteComplete::RequestGeneration if !generation::is_due(model, now) => {
                    tracing::debug!(
                        submission_id = model.id,
                        generation_time = model.generation_time,
                        "upload processed; report not due yet"
                    );
                    Ok(model.clone())
                }
                OnRemoteComplete::RequestGeneration => Ok(self
                    .request_generation(model, false, now)
                    .await?
                    .into_model()),
                OnRemoteComplete::AwaitScore => {
                    self.transition(model, SubmissionEvent::ScorePending { at: now })
                        .await
                }
            },
            Some(remote_status::CREATED) => {
                self.transition(model, SubmissionEvent::RemoteNotUploaded { at: now })
                    .await
            }
            Some(remote_status::ERROR) => {
                let code = info.error_code.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                self.transition(model, SubmissionEvent::RemoteError { code })
                    .await
            }
            _ => {
                self.transition(model, SubmissionEvent::RemoteProcessing { at: now })
                    .await
            }
        }
    }

    async fn resolve_item_ref(
        &self,
        new: &NewSubmission,
        text: &str,
    ) -> Result<Option<i64>, PlagiarismError> {
        let Some(source) = self.registry.get(&new.content_category) else {
            return Ok(None);
        };
        source
            .resolve_item_ref(&ItemLookup {
                owner_module_ref: new.owner_module_ref,
                user_ref: new.user_ref,
                text: text.to_string(),
            })
            .await
    }

    async fn resolve_content(
        &self,
        model: &Model,
        source: Option<&dyn ContentSource>,
    ) -> Result<ResolvedContent, PlagiarismError> {
        match model.content_type {
            ContentType::File => {
                let file = self
                    .host
                    .file(&model.content_identifier)
                    .await?
                    .filter(|f| !f.bytes.is_empty())
                    .ok_or(PlagiarismError::ContentUnavailable)?;
                Ok(ResolvedContent::Ready {
                    bytes: file.bytes,
                    filename: model.filename.clone().unwrap_or(file.filename),
                })
            }
            ContentType::Text => {
                let source = source.ok_or_else(|| {
                    PlagiarismError::Content(format!(
                        "no content source for {}",
                        model.content_category
                    ))
                })?;
                let item_ref = model
                    .content_item_ref
                    .ok_or(PlagiarismError::ContentUnavailable)?;

                if source.is_draft(item_ref).await? {
                    return Ok(ResolvedContent::Draft);
                }

                let text = match model.quiz_answer_key {
                    Some(_) => {
                        find_answer(source.answers(item_ref).await?, &model.content_identifier)
                    }
                    None => source.online_text(item_ref).await?,
                };
                match text {
                    Some(text) if !text.trim().is_empty() => Ok(ResolvedContent::Ready {
                        bytes: text.into_bytes(),
                        filename: model
                            .filename
                            .clone()
                            .unwrap_or_else(|| format!("onlinetext_{}.txt", model.id)),
                    }),
                    _ => Err(PlagiarismError::ContentUnavailable),
                }
            }
        }
    }

    /// Module settings, or a permanent failure if the module has been deleted.
    async fn settings_or_abort(&self, model: &Model) -> Result<ModuleSettings, PlagiarismError> {
        match self.host.module_state(model.owner_module_ref).await? {
            ModuleState::Active(settings) | ModuleState::PendingDeletion(settings) => Ok(settings),
            ModuleState::Gone => {
                if !model.status.is_terminal() {
                    self.abort_owner_gone(model).await?;
                }
                Err(PlagiarismError::OwnerGone)
            }
        }
    }

    /// Records a transport failure as a retry bump and returns the error for the caller.
    async fn transport_failed(
        &self,
        model: &Model,
        phase: Phase,
        reason: String,
        now: i64,
    ) -> PlagiarismError {
        let event = SubmissionEvent::TransportFailed {
            phase,
            at: now,
            message: reason.clone(),
        };
        if let Err(e) = self.transition(model, event).await {
            tracing::warn!(
                submission_id = model.id,
                error = %e,
                "could not record transport failure"
            );
        }
        PlagiarismError::Client(ClientError::Transport(reason))
    }

    /// Applies `event` and persists the result.
    ///
    /// If another writer moved the row first, the event is replayed once
    /// against the stored state; an event that no longer applies leaves the
    /// stored row untouched.
    async fn transition(
        &self,
        current: &Model,
        event: SubmissionEvent,
    ) -> Result<Model, PlagiarismError> {
        let next = submission::apply(current, &event, &self.policy)?;
        if plagiarism_submission::Entity::compare_and_swap(&self.db, current.status, &next).await? {
            self.after_transition(current, &next, &event).await;
            return Ok(next);
        }

        let fresh = self.find(current.id).await?;
        tracing::debug!(
            submission_id = current.id,
            expected = %current.status,
            found = %fresh.status,
            event = event.name(),
            "lost a status race; replaying"
        );
        let next = match submission::apply(&fresh, &event, &self.policy) {
            Ok(next) => next,
            Err(PlagiarismError::InvalidTransition { .. }) => return Ok(fresh),
            Err(e) => return Err(e),
        };
        if plagiarism_submission::Entity::compare_and_swap(&self.db, fresh.status, &next).await? {
            self.after_transition(&fresh, &next, &event).await;
            Ok(next)
        } else {
            Err(PlagiarismError::Conflict(current.id))
        }
    }

    async fn after_transition(&self, previous: &Model, next: &Model, event: &SubmissionEvent) {
        tracing::info!(
            submission_id = next.id,
            external_id = next.external_id.as_deref().unwrap_or("-"),
            event = event.name(),
            from = %previous.status,
            status = %next.status,
            send_attempts = next.send_attempts,
            report_attempts = next.report_attempts,
            "submission transition"
        );
        if next.status == SubmissionStatus::Error && previous.status != SubmissionStatus::Error {
            let message = next.error_message.as_deref().unwrap_or(UNKNOWN_ERROR);
            self.diagnostics.submission_failed(next, message).await;
        }
    }
}

fn require_external_id(model: &Model, event: &'static str) -> Result<String, PlagiarismError> {
    model
        .external_id
        .clone()
        .ok_or(PlagiarismError::InvalidTransition {
            from: model.status,
            event,
        })
}

fn title(model: &Model) -> String {
    match &model.filename {
        Some(filename) => filename.clone(),
        None => format!("Online text submission {}", model.id),
    }
}
