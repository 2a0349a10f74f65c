//! Stand-alone host adapters backed by the storage root.
//!
//! The layout (see `util::paths`) is written by whatever owns modules and
//! content; this process only reads it.
//!
//! ```text
//! {root}/module_{id}/plagiarism.json        module settings
//! {root}/module_{id}/.pending_deletion      teardown marker
//! {root}/files/{content_identifier}/<file>  uploaded files
//! {root}/content/{category}/item_{ref}.json
//! {root}/content/{category}/instance_{ref}.json
//! ```

mod content;
mod platform;

pub use content::{ContentItem, FsContentSource, InstanceRecord};
pub use platform::FsHost;

use plagiarism::PlagiarismError;
use std::io;
use std::path::Path;

/// Reads a file, mapping "not there" to `None`.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PlagiarismError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, PlagiarismError> {
    match read_optional(path).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| PlagiarismError::Content(format!("{}: {e}", path.display()))),
        None => Ok(None),
    }
}

fn io_error(path: &Path, err: io::Error) -> PlagiarismError {
    PlagiarismError::Content(format!("{}: {err}", path.display()))
}
