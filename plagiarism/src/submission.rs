//! Submission state machine.
//!
//! [`apply`] is the single place that computes a submission's next state. It is
//! pure: the lifecycle manager persists its result with a status
//! compare-and-swap, so every status change in the system passes through the
//! table below.
//!
//! | event                 | from                                        | to                    |
//! |-----------------------|---------------------------------------------|-----------------------|
//! | `Created`             | queued, created                             | created               |
//! | `EulaRejected`        | queued, created                             | eula_not_accepted     |
//! | `CreateFailed`        | queued, created                             | error                 |
//! | `Uploaded`            | created                                     | uploaded              |
//! | `ContentMissing`      | queued, created                             | empty_deleted         |
//! | `UploadFailed`        | created                                     | error                 |
//! | `DraftDeferred`       | queued, created                             | unchanged             |
//! | `GenerationRequested` | uploaded, processing, requested, complete   | requested             |
//! | `GenerationRejected`  | uploaded, processing, requested, complete   | error                 |
//! | `RemoteProcessing`    | uploaded, processing, requested             | processing            |
//! | `ScorePending`        | requested                                   | requested             |
//! | `RemoteNotUploaded`   | uploaded, processing, requested             | queued                |
//! | `RemoteError`         | uploaded, processing, requested, complete   | error                 |
//! | `ScoreComplete`       | uploaded, processing, requested, complete   | complete              |
//! | `ForceSkip`           | complete                                    | complete              |
//! | `TransportFailed`     | any non-terminal                            | unchanged             |
//! | `OwnerGone`           | any non-terminal                            | error                 |
//! | `Requeued`            | eula_not_accepted                           | queued                |
//! | `Resubmitted`         | error                                       | queued                |
//!
//! Every retry bump that reaches the phase maximum ends in `error`.

use db::models::plagiarism_submission::{Model, SubmissionStatus};

use crate::error::PlagiarismError;
use crate::generation::GenerationSchedule;
use crate::retry::{Phase, RetryPolicy, UNKNOWN_ERROR};

pub use db::models::plagiarism_submission::Model as Submission;

/// Stored when the owning module disappears mid-flight.
pub const OWNER_GONE: &str = "MODULE_DELETED";
/// Stored when a submitter keeps failing to accept the licence.
pub const EULA_NOT_ACCEPTED: &str = "EULA_NOT_ACCEPTED";

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionEvent {
    /// Remote creation succeeded.
    Created { external_id: String, at: i64 },
    /// Remote creation refused because the submitter has not accepted the licence.
    EulaRejected { at: i64 },
    CreateFailed { code: String },
    /// Content upload accepted; carries the initial generation schedule.
    Uploaded { schedule: GenerationSchedule },
    ContentMissing,
    UploadFailed { code: String },
    /// The content is still a draft; look again after one send interval.
    DraftDeferred { at: i64 },
    GenerationRequested { at: i64 },
    GenerationRejected { code: String },
    /// The remote side is still working on the upload.
    RemoteProcessing { at: i64 },
    /// The report is genuinely still being produced.
    ScorePending { at: i64 },
    /// The remote side never received the content; send it again.
    RemoteNotUploaded { at: i64 },
    RemoteError { code: String },
    ScoreComplete {
        score: Option<f64>,
        schedule: GenerationSchedule,
    },
    /// Regeneration slot passed without a new request being needed.
    ForceSkip { at: i64 },
    TransportFailed {
        phase: Phase,
        at: i64,
        message: String,
    },
    OwnerGone,
    /// The submitter accepted the licence.
    Requeued,
    /// Operator-initiated retry of a failed submission.
    Resubmitted,
}

impl SubmissionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionEvent::Created { .. } => "created",
            SubmissionEvent::EulaRejected { .. } => "eula_rejected",
            SubmissionEvent::CreateFailed { .. } => "create_failed",
            SubmissionEvent::Uploaded { .. } => "uploaded",
            SubmissionEvent::ContentMissing => "content_missing",
            SubmissionEvent::UploadFailed { .. } => "upload_failed",
            SubmissionEvent::DraftDeferred { .. } => "draft_deferred",
            SubmissionEvent::GenerationRequested { .. } => "generation_requested",
            SubmissionEvent::GenerationRejected { .. } => "generation_rejected",
            SubmissionEvent::RemoteProcessing { .. } => "remote_processing",
            SubmissionEvent::ScorePending { .. } => "score_pending",
            SubmissionEvent::RemoteNotUploaded { .. } => "remote_not_uploaded",
            SubmissionEvent::RemoteError { .. } => "remote_error",
            SubmissionEvent::ScoreComplete { .. } => "score_complete",
            SubmissionEvent::ForceSkip { .. } => "force_skip",
            SubmissionEvent::TransportFailed { .. } => "transport_failed",
            SubmissionEvent::OwnerGone => "owner_gone",
            SubmissionEvent::Requeued => "requeued",
            SubmissionEvent::Resubmitted => "resubmitted",
        }
    }

    fn allowed_from(&self, status: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        match self {
            SubmissionEvent::Created { .. }
            | SubmissionEvent::EulaRejected { .. }
            | SubmissionEvent::CreateFailed { .. }
            | SubmissionEvent::ContentMissing
            | SubmissionEvent::DraftDeferred { .. } => matches!(status, Queued | Created),
            SubmissionEvent::Uploaded { .. } | SubmissionEvent::UploadFailed { .. } => {
                status == Created
            }
            SubmissionEvent::GenerationRequested { .. }
            | SubmissionEvent::GenerationRejected { .. }
            | SubmissionEvent::RemoteError { .. }
            | SubmissionEvent::ScoreComplete { .. } => {
                matches!(status, Uploaded | Processing | Requested | Complete)
            }
            SubmissionEvent::RemoteProcessing { .. }
            | SubmissionEvent::RemoteNotUploaded { .. } => {
                matches!(status, Uploaded | Processing | Requested)
            }
            SubmissionEvent::ScorePending { .. } => status == Requested,
            SubmissionEvent::ForceSkip { .. } => status == Complete,
            SubmissionEvent::TransportFailed { .. } | SubmissionEvent::OwnerGone => {
                !status.is_terminal()
            }
            SubmissionEvent::Requeued => status == EulaNotAccepted,
            SubmissionEvent::Resubmitted => status == Error,
        }
    }
}

/// Computes the state that follows `event`.
pub fn apply(
    current: &Model,
    event: &SubmissionEvent,
    policy: &RetryPolicy,
) -> Result<Model, PlagiarismError> {
    if !event.allowed_from(current.status) {
        return Err(PlagiarismError::InvalidTransition {
            from: current.status,
            event: event.name(),
        });
    }

    let mut next = current.clone();
    let send_max = policy.max_attempts(Phase::Send);

    match event {
        SubmissionEvent::Created { external_id, at } => {
            // Set once; a re-queued submission keeps its original identity.
            if next.external_id.is_none() {
                next.external_id = Some(external_id.clone());
            }
            if next.submitted_at.is_none() {
                next.submitted_at = Some(*at);
            }
            next.status = SubmissionStatus::Created;
            next.error_message = None;
        }
        SubmissionEvent::EulaRejected { at } => {
            next.status = SubmissionStatus::EulaNotAccepted;
            bump(&mut next, policy, Phase::Send, *at, EULA_NOT_ACCEPTED);
        }
        SubmissionEvent::CreateFailed { code } | SubmissionEvent::UploadFailed { code } => {
            fail(&mut next, code);
            next.send_attempts = send_max;
        }
        SubmissionEvent::Uploaded { schedule } => {
            next.status = SubmissionStatus::Uploaded;
            next.send_attempts = 0;
            next.next_retry_not_before = 0;
            next.to_generate = schedule.to_generate;
            next.generation_time = schedule.generation_time;
        }
        SubmissionEvent::ContentMissing => {
            next.status = SubmissionStatus::EmptyDeleted;
            next.to_generate = false;
            next.send_attempts = send_max;
        }
        SubmissionEvent::DraftDeferred { at } => {
            // Waiting on the author is not a failure; the budget is untouched.
            next.next_retry_not_before = at + policy.wait(Phase::Send, 1);
        }
        SubmissionEvent::GenerationRequested { at } => {
            next.status = SubmissionStatus::Requested;
            next.requested_at = Some(*at);
            next.to_generate = false;
            next.error_message = None;
        }
        SubmissionEvent::GenerationRejected { code } | SubmissionEvent::RemoteError { code } => {
            fail(&mut next, code);
        }
        SubmissionEvent::RemoteProcessing { at } => {
            next.status = SubmissionStatus::Processing;
            next.to_generate = true;
            bump(&mut next, policy, Phase::Report, *at, UNKNOWN_ERROR);
        }
        SubmissionEvent::ScorePending { at } => {
            bump(&mut next, policy, Phase::Report, *at, UNKNOWN_ERROR);
        }
        SubmissionEvent::RemoteNotUploaded { at } => {
            next.status = SubmissionStatus::Queued;
            next.to_generate = false;
            next.send_attempts = 0;
            bump(&mut next, policy, Phase::Report, *at, UNKNOWN_ERROR);
        }
        SubmissionEvent::ScoreComplete { score, schedule } => {
            next.status = SubmissionStatus::Complete;
            if score.is_some() {
                next.overall_score = *score;
            }
            next.error_message = None;
            next.report_attempts = 0;
            next.next_retry_not_before = 0;
            next.to_generate = schedule.to_generate;
            next.generation_time = schedule.generation_time;
        }
        SubmissionEvent::ForceSkip { at } => {
            next.to_generate = false;
            next.generation_time = *at;
        }
        SubmissionEvent::TransportFailed { phase, at, message } => {
            bump(&mut next, policy, *phase, *at, message);
        }
        SubmissionEvent::OwnerGone => {
            fail(&mut next, OWNER_GONE);
            let phase = phase_of(current.status);
            set_attempts(&mut next, phase, policy.max_attempts(phase));
        }
        SubmissionEvent::Requeued => {
            next.status = SubmissionStatus::Queued;
            next.send_attempts = 0;
            next.next_retry_not_before = 0;
            next.error_message = None;
        }
        SubmissionEvent::Resubmitted => {
            next.status = SubmissionStatus::Queued;
            next.send_attempts = 0;
            next.report_attempts = 0;
            next.next_retry_not_before = 0;
            next.to_generate = false;
            next.error_message = None;
        }
    }

    Ok(next)
}

/// Retry-budget phase a status belongs to.
pub fn phase_of(status: SubmissionStatus) -> Phase {
    match status {
        SubmissionStatus::Queued
        | SubmissionStatus::Created
        | SubmissionStatus::EulaNotAccepted => Phase::Send,
        _ => Phase::Report,
    }
}

pub fn attempts_in(model: &Model, phase: Phase) -> i32 {
    match phase {
        Phase::Send => model.send_attempts,
        Phase::Report => model.report_attempts,
    }
}

fn set_attempts(model: &mut Model, phase: Phase, attempts: i32) {
    match phase {
        Phase::Send => model.send_attempts = attempts,
        Phase::Report => model.report_attempts = attempts,
    }
}

fn fail(model: &mut Model, code: &str) {
    model.status = SubmissionStatus::Error;
    model.to_generate = false;
    model.error_message = Some(code.to_string());
}

fn bump(model: &mut Model, policy: &RetryPolicy, phase: Phase, now: i64, exhausted_message: &str) {
    let backoff = policy.record_failure(phase, attempts_in(model, phase), now);
    set_attempts(model, phase, backoff.attempts);
    model.next_retry_not_before = model.next_retry_not_before.max(backoff.next_retry_not_before);
    if backoff.exhausted {
        fail(model, exhausted_message);
    }
}
