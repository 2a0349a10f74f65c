use db::models::plagiarism_submission::SubmissionStatus;
use sea_orm::DbErr;
use thiserror::Error;

/// Failure to obtain any response from the remote service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network, DNS, TLS or timeout failure.
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    /// The service answered with an error envelope where no recovery exists.
    #[error("service answered {status} {code}")]
    Rejected { status: u16, code: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ClientError::InvalidRequest(err.to_string())
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum PlagiarismError {
    #[error(transparent)]
    Db(#[from] DbErr),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("transition {event} is not allowed from {from}")]
    InvalidTransition {
        from: SubmissionStatus,
        event: &'static str,
    },

    /// The owning module was deleted while the submission was in flight.
    #[error("owning module no longer exists")]
    OwnerGone,

    #[error("content is no longer available")]
    ContentUnavailable,

    #[error("content source error: {0}")]
    Content(String),

    #[error("submission {0} not found")]
    NotFound(i64),

    /// Another writer moved the row while this one was working on it.
    #[error("submission {0} was modified concurrently")]
    Conflict(i64),

    #[error("webhook signature rejected")]
    Signature,

    #[error("malformed payload: {0}")]
    Payload(String),
}

impl PlagiarismError {
    /// Errors that retrying the same operation cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            PlagiarismError::OwnerGone
                | PlagiarismError::ContentUnavailable
                | PlagiarismError::InvalidTransition { .. }
                | PlagiarismError::NotFound(_)
                | PlagiarismError::Signature
                | PlagiarismError::Payload(_)
        )
    }
}
