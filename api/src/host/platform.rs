use async_trait::async_trait;
use plagiarism::PlagiarismError;
use plagiarism::content::{HostPlatform, ModuleSettings, ModuleState, StoredFile};
use plagiarism::generation::ReportGenerationMode;
use std::io;
use std::path::PathBuf;
use util::paths::{module_deletion_marker, module_dir, module_settings_path, submission_file_dir};

use super::{io_error, read_json};

/// Modules and uploaded files under the storage root.
#[derive(Debug, Clone)]
pub struct FsHost {
    root: PathBuf,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl HostPlatform for FsHost {
    /// A missing module folder means the module is gone. A folder without a
    /// settings file gets immediate generation against its own instance.
    async fn module_state(&self, module_ref: i64) -> Result<ModuleState, PlagiarismError> {
        let dir = module_dir(&self.root, module_ref);
        if !tokio::fs::try_exists(&dir).await.map_err(|e| io_error(&dir, e))? {
            return Ok(ModuleState::Gone);
        }

        let settings = read_json::<ModuleSettings>(&module_settings_path(&self.root, module_ref))
            .await?
            .unwrap_or(ModuleSettings {
                report_gen_mode: ReportGenerationMode::default(),
                module_instance_ref: module_ref,
            });

        let marker = module_deletion_marker(&self.root, module_ref);
        if tokio::fs::try_exists(&marker).await.map_err(|e| io_error(&marker, e))? {
            Ok(ModuleState::PendingDeletion(settings))
        } else {
            Ok(ModuleState::Active(settings))
        }
    }

    /// The first regular file in the content identifier's folder.
    async fn file(&self, content_identifier: &str) -> Result<Option<StoredFile>, PlagiarismError> {
        // Identifiers come from the database; never let one escape the root.
        if content_identifier.is_empty()
            || content_identifier.contains(['/', '\\'])
            || content_identifier.starts_with('.')
        {
            return Ok(None);
        }

        let dir = submission_file_dir(&self.root, content_identifier);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let file_type = entry.file_type().await.map_err(|e| io_error(&entry.path(), e))?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let Some(path) = files.into_iter().next() else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(&path).await.map_err(|e| io_error(&path, e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| content_identifier.to_string());

        Ok(Some(StoredFile { filename, bytes }))
    }
}
