//! HTTP route entry point for `/api/...`.
//!
//! - `/health` → liveness probe
//! - `/plagiarism` → webhook receiver, submission intake and operator actions
//!
//! Authentication is left to whatever fronts this service; the webhook route
//! authenticates its caller by signature.

use crate::routes::{health::health_routes, plagiarism::plagiarism_routes};
use crate::state::AppState;
use axum::Router;

pub mod health;
pub mod plagiarism;

/// Builds the `/api` router with its state applied.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/plagiarism", plagiarism_routes())
        .with_state(app_state)
}
