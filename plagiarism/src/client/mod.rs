//! Outbound contract with the similarity service.
//!
//! [`ReportingClient`] is the transport seam: it turns an [`ApiRequest`] into an
//! [`Envelope`] or a [`ClientError`] when no response could be obtained.
//! [`ReportingApi`] is the typed façade the lifecycle uses; it folds both into a
//! [`CallOutcome`] so callers branch on data.

mod api;
mod http;
pub mod types;

use async_trait::async_trait;

use crate::error::ClientError;

pub use api::{ReportingApi, classify, decode};
pub use http::HttpReportingClient;
pub use types::{
    ApiRequest, CallOutcome, CreateSubmissionRequest, Envelope, Method, RequestBody,
    ServiceMetadata, SimilarityScore, SubmissionInfo, TimeoutClass, WebhookRegistration,
};

#[async_trait]
pub trait ReportingClient: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Envelope, ClientError>;
}
