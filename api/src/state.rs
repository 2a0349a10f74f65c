//! Application state shared across Axum route handlers.
//!
//! Everything in here is built once at startup from the loaded configuration
//! and cloned cheaply into each request.

use plagiarism::{BatchScheduler, SubmissionLifecycleManager, WebhookGateway};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    lifecycle: Arc<SubmissionLifecycleManager>,
    gateway: Arc<WebhookGateway>,
    scheduler: Arc<BatchScheduler>,
}

impl AppState {
    /// Wires the gateway and the scheduler onto one lifecycle manager.
    pub fn new(lifecycle: Arc<SubmissionLifecycleManager>) -> Self {
        Self {
            db: lifecycle.db().clone(),
            gateway: Arc::new(WebhookGateway::new(lifecycle.clone())),
            scheduler: Arc::new(BatchScheduler::new(lifecycle.clone())),
            lifecycle,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn lifecycle(&self) -> &SubmissionLifecycleManager {
        &self.lifecycle
    }

    pub fn gateway(&self) -> &WebhookGateway {
        &self.gateway
    }

    /// Returns a cloned handle to the scheduler, for spawning its loop.
    pub fn scheduler_clone(&self) -> Arc<BatchScheduler> {
        self.scheduler.clone()
    }

    pub fn scheduler(&self) -> &BatchScheduler {
        &self.scheduler
    }
}
