//! Host-side collaborators: where submitted content and module settings come from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PlagiarismError;
use crate::generation::ReportGenerationMode;

/// Parameters for finding the item a piece of text was submitted as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLookup {
    pub owner_module_ref: i64,
    pub user_ref: i64,
    pub text: String,
}

/// Knows how to read one category of content (assignment, forum post, quiz
/// answer, workshop submission, ...).
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Text of an item; `None` if it no longer exists.
    async fn online_text(&self, item_ref: i64) -> Result<Option<String>, PlagiarismError>;

    /// The item holding this text for this owner. Calling it twice with the
    /// same lookup gives the same answer.
    async fn resolve_item_ref(&self, lookup: &ItemLookup) -> Result<Option<i64>, PlagiarismError>;

    /// Due date of a module instance in epoch seconds, 0 when there is none.
    async fn due_date(&self, module_instance_ref: i64) -> Result<i64, PlagiarismError>;

    async fn is_draft(&self, item_ref: i64) -> Result<bool, PlagiarismError>;

    /// Every answer of a multi-answer item, in order.
    async fn answers(&self, _item_ref: i64) -> Result<Vec<String>, PlagiarismError> {
        Ok(Vec::new())
    }
}

/// Content sources keyed by category, fixed at startup.
#[derive(Clone, Default)]
pub struct ContentRegistry {
    sources: HashMap<String, Arc<dyn ContentSource>>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, category: impl Into<String>, source: Arc<dyn ContentSource>) -> Self {
        self.sources.insert(category.into(), source);
        self
    }

    pub fn get(&self, category: &str) -> Option<Arc<dyn ContentSource>> {
        self.sources.get(category).cloned()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

/// Per-module plagiarism settings owned by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSettings {
    #[serde(default)]
    pub report_gen_mode: ReportGenerationMode,
    /// Instance whose due date drives due-date generation.
    pub module_instance_ref: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleState {
    Active(ModuleSettings),
    /// The host is tearing the module down; report work should wait.
    PendingDeletion(ModuleSettings),
    Gone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// The learning platform itself.
#[async_trait]
pub trait HostPlatform: Send + Sync {
    async fn module_state(&self, module_ref: i64) -> Result<ModuleState, PlagiarismError>;

    /// The stored file behind a file submission's content identifier.
    async fn file(&self, content_identifier: &str) -> Result<Option<StoredFile>, PlagiarismError>;
}

/// Hex SHA-256 of submitted text, used as its content identifier.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// The answer whose hash equals `content_identifier`.
///
/// Two identical answers hash the same; the first one wins.
pub fn find_answer(answers: Vec<String>, content_identifier: &str) -> Option<String> {
    answers
        .into_iter()
        .find(|answer| content_hash(answer) == content_identifier)
}
