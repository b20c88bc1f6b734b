//! Small filesystem helpers shared by the engine.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// A unique temp-file sibling for `path`, used for write-then-rename.
///
/// The UUID suffix avoids conflicts between concurrent writers of the same
/// final path.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let temp_name = format!(".tmp.{}", Uuid::new_v4());
    path.with_file_name(
        path.file_name()
            .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
            .unwrap_or(temp_name),
    )
}

/// Create the parent directory tree of `path` if missing.
pub(crate) async fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Write `data` to `path` atomically: temp file, flush to disk, rename.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    ensure_parent(path).await?;
    let temp_path = temp_sibling(path);
    let result = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await
    }
    .await;
    if result.is_err() {
        let _ = fs::remove_file(&temp_path).await;
    }
    result
}

/// Remove a file, treating "not found" as success.
pub(crate) async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
