pub mod app;
pub mod client;

pub use app::{TestApp, make_test_app};
pub use client::ScriptedClient;
