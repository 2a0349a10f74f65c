use async_trait::async_trait;
use plagiarism::PlagiarismError;
use plagiarism::content::{ContentSource, ItemLookup};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use util::paths::{content_dir, content_instance_path, content_item_path};

use super::{io_error, read_json};

/// One stored content item, e.g. an online-text answer or a forum post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub owner_module_ref: i64,
    pub user_ref: i64,
    #[serde(default)]
    pub text: Option<String>,
    /// Answers of a multi-answer item, in order.
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub draft: bool,
}

/// A module instance; only its due date matters here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    #[serde(default)]
    pub due_date: i64,
}

/// Content of one category, read from `{root}/content/{category}`.
#[derive(Debug, Clone)]
pub struct FsContentSource {
    root: PathBuf,
    category: String,
}

impl FsContentSource {
    pub fn new(root: impl Into<PathBuf>, category: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            category: category.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    async fn item(&self, item_ref: i64) -> Result<Option<ContentItem>, PlagiarismError> {
        read_json(&content_item_path(&self.root, &self.category, item_ref)).await
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    async fn online_text(&self, item_ref: i64) -> Result<Option<String>, PlagiarismError> {
        Ok(self.item(item_ref).await?.and_then(|item| item.text))
    }

    /// Lowest-numbered item of this owner and user whose text (or one of whose
    /// answers) equals the submitted text.
    async fn resolve_item_ref(&self, lookup: &ItemLookup) -> Result<Option<i64>, PlagiarismError> {
        let dir = content_dir(&self.root, &self.category);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut refs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            if let Some(item_ref) = parse_item_ref(&entry.file_name().to_string_lossy()) {
                refs.push(item_ref);
            }
        }
        refs.sort_unstable();

        for item_ref in refs {
            let Some(item) = self.item(item_ref).await? else {
                continue;
            };
            let owned = item.owner_module_ref == lookup.owner_module_ref
                && item.user_ref == lookup.user_ref;
            let matches = item.text.as_deref() == Some(lookup.text.as_str())
                || item.answers.iter().any(|a| *a == lookup.text);
            if owned && matches {
                return Ok(Some(item_ref));
            }
        }
        Ok(None)
    }

    async fn due_date(&self, module_instance_ref: i64) -> Result<i64, PlagiarismError> {
        let path = content_instance_path(&self.root, &self.category, module_instance_ref);
        Ok(read_json::<InstanceRecord>(&path)
            .await?
            .map(|r| r.due_date)
            .unwrap_or(0))
    }

    async fn is_draft(&self, item_ref: i64) -> Result<bool, PlagiarismError> {
        Ok(self.item(item_ref).await?.is_some_and(|item| item.draft))
    }

    async fn answers(&self, item_ref: i64) -> Result<Vec<String>, PlagiarismError> {
        Ok(self
            .item(item_ref)
            .await?
            .map(|item| item.answers)
            .unwrap_or_default())
    }
}

/// `item_12.json` -> 12
fn parse_item_ref(file_name: &str) -> Option<i64> {
    file_name
        .strip_prefix("item_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}
