//! Submission lifecycle engine for the external similarity service.
//!
//! Submissions move from `queued` to a retrieved report (or a permanent failure)
//! through [`lifecycle::SubmissionLifecycleManager`]. [`scheduler::BatchScheduler`]
//! drives that manager periodically and [`webhook::WebhookGateway`] is the
//! push-notification fast path onto the same transitions.

pub mod client;
pub mod content;
pub mod diagnostics;
pub mod error;
pub mod generation;
pub mod lifecycle;
pub mod retry;
pub mod scheduler;
pub mod submission;
pub mod webhook;

pub use error::{ClientError, PlagiarismError};
pub use lifecycle::SubmissionLifecycleManager;
pub use scheduler::BatchScheduler;
pub use webhook::WebhookGateway;
