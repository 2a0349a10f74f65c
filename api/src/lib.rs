//! HTTP surface, host adapters and process wiring for the plagiarism integration.

pub mod host;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
