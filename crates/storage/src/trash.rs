//! Soft deletion: per-repository trash, restore, and purge.
//!
//! Deleted artifacts move (with their sidecars, preserving relative path)
//! under `<repoRoot>/.trash/<relativePath>` and stay reversible until purged.
//! The `.index` tree is never touched by any operation here.

use crate::error::{StorageError, StorageResult};
use crate::fsutil;
use crate::paths::RepositoryRoot;
use crate::resolver::PathResolver;
use depot_core::Repository;
use tokio::fs;
use tracing::{debug, instrument};

/// Delete an artifact, routing through the trash according to repository
/// policy.
///
/// - `force` with `allows_force_deletion` bypasses the trash entirely.
/// - Otherwise a trash-enabled repository soft-deletes; force is advisory
///   and degrades to a trash move when the repository forbids true deletion.
/// - A trash-disabled repository deletes permanently.
#[instrument(skip(root, repository), fields(repository = %root.key()))]
pub async fn delete(
    root: &RepositoryRoot,
    repository: &Repository,
    relative: &str,
    force: bool,
) -> StorageResult<()> {
    if force && repository.allows_force_deletion {
        permanent_delete(root, relative).await
    } else if repository.trash_enabled {
        move_to_trash(root, relative).await
    } else {
        permanent_delete(root, relative).await
    }
}

/// Move an artifact and all of its sidecar files into the trash.
///
/// The `.trash` tree is created lazily; afterwards the live path no longer
/// exists.
#[instrument(skip(root), fields(repository = %root.key()))]
pub async fn move_to_trash(root: &RepositoryRoot, relative: &str) -> StorageResult<()> {
    let live = root.resolve(relative)?;
    let trashed = root.trash_path(relative)?;

    fsutil::ensure_parent(trashed.absolute()).await?;
    fs::rename(live.absolute(), trashed.absolute()).await?;

    for (_, sidecar) in live.sidecars() {
        if fs::try_exists(sidecar.absolute()).await? {
            let trashed_sidecar = root.trash_path(sidecar.relative())?;
            fs::rename(sidecar.absolute(), trashed_sidecar.absolute()).await?;
        }
    }
    debug!(%live, "moved artifact to trash");
    Ok(())
}

/// Restore a previously trashed artifact (and its sidecars) to its live
/// location.
#[instrument(skip(root), fields(repository = %root.key()))]
pub async fn restore(root: &RepositoryRoot, relative: &str) -> StorageResult<()> {
    let live = root.resolve(relative)?;
    let trashed = root.trash_path(relative)?;

    fsutil::ensure_parent(live.absolute()).await?;
    fs::rename(trashed.absolute(), live.absolute()).await?;

    for (_, sidecar) in live.sidecars() {
        let trashed_sidecar = root.trash_path(sidecar.relative())?;
        if fs::try_exists(trashed_sidecar.absolute()).await? {
            fs::rename(trashed_sidecar.absolute(), sidecar.absolute()).await?;
        }
    }
    debug!(%live, "restored artifact from trash");
    Ok(())
}

/// Delete an artifact and its sidecars without touching the trash.
#[instrument(skip(root), fields(repository = %root.key()))]
pub async fn permanent_delete(root: &RepositoryRoot, relative: &str) -> StorageResult<()> {
    let live = root.resolve(relative)?;
    if !fsutil::remove_if_exists(live.absolute()).await? {
        return Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("artifact not found: {live}"),
        )));
    }
    crate::checksums::remove_sidecars(&live).await?;
    debug!(%live, "permanently deleted artifact");
    Ok(())
}

/// Delete all contents of one repository's trash, keeping the `.trash`
/// directory itself.
#[instrument(skip(root), fields(repository = %root.key()))]
pub async fn purge(root: &RepositoryRoot) -> StorageResult<()> {
    let trash_dir = root.trash_dir();
    if !fs::try_exists(&trash_dir).await? {
        return Ok(());
    }
    let mut entries = fs::read_dir(&trash_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            fs::remove_dir_all(entry.path()).await?;
        } else {
            fs::remove_file(entry.path()).await?;
        }
    }
    debug!(repository = %root.key(), "purged trash");
    Ok(())
}

/// Purge the trash of every repository in a storage.
pub async fn purge_all(resolver: &PathResolver, storage_id: &str) -> StorageResult<()> {
    let repository_ids: Vec<String> = resolver
        .config()
        .storage(storage_id)
        .ok_or_else(|| StorageError::UnknownRepository {
            storage_id: storage_id.to_string(),
            repository_id: "*".to_string(),
        })?
        .repositories
        .keys()
        .cloned()
        .collect();

    for repository_id in repository_ids {
        let root = resolver.resolve_root(storage_id, &repository_id).await?;
        purge(&root).await?;
    }
    Ok(())
}
