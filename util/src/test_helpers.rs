use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a unique temporary storage root for a test. The directory is
/// removed when the returned `TempDir` is dropped, so keep it in scope for as
/// long as the files are needed.
pub fn setup_test_storage_root() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let abs = tmp
        .path()
        .canonicalize()
        .unwrap_or_else(|_| tmp.path().to_path_buf());
    (tmp, abs)
}
