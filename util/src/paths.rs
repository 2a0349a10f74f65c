use std::{fs, io, path::{Path, PathBuf}};

/// Create a directory (and all parents) if it doesn't exist, and return the path.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let p = path.as_ref();
    fs::create_dir_all(p)?;
    Ok(p.to_path_buf())
}

/// Ensure the parent directory of a *file path* exists (no-op if none).
pub fn ensure_parent_dir<P: AsRef<Path>>(file_path: P) -> io::Result<()> {
    if let Some(parent) = file_path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Absolute storage root. A relative `root` is resolved against current_dir().
pub fn storage_root(root: &str) -> PathBuf {
    let p = PathBuf::from(root);
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(p)
    }
}

/// A single module folder: {root}/module_{module_id}
pub fn module_dir(root: &Path, module_id: i64) -> PathBuf {
    root.join(format!("module_{module_id}"))
}

/// Plagiarism settings for a module: {root}/module_{id}/plagiarism.json
pub fn module_settings_path(root: &Path, module_id: i64) -> PathBuf {
    module_dir(root, module_id).join("plagiarism.json")
}

/// Marker left by the host while a module is being torn down.
pub fn module_deletion_marker(root: &Path, module_id: i64) -> PathBuf {
    module_dir(root, module_id).join(".pending_deletion")
}

// ─── Submitted content ──────────────────────────────────────────────

/// Folder holding one uploaded file: {root}/files/{content_identifier}/
pub fn submission_file_dir(root: &Path, content_identifier: &str) -> PathBuf {
    root.join("files").join(content_identifier)
}

/// Per-category content records: {root}/content/{category}
pub fn content_dir(root: &Path, category: &str) -> PathBuf {
    root.join("content").join(category)
}

/// One content item: {root}/content/{category}/item_{item_ref}.json
pub fn content_item_path(root: &Path, category: &str, item_ref: i64) -> PathBuf {
    content_dir(root, category).join(format!("item_{item_ref}.json"))
}

/// Module instance record (due date): {root}/content/{category}/instance_{ref}.json
pub fn content_instance_path(root: &Path, category: &str, instance_ref: i64) -> PathBuf {
    content_dir(root, category).join(format!("instance_{instance_ref}.json"))
}
