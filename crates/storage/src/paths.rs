//! Physical repository paths with traversal protection.
//!
//! A [`RepositoryPath`] is always derived from a repository root plus a
//! validated relative path, never from an arbitrary absolute path.

use crate::error::{StorageError, StorageResult};
use depot_core::ChecksumAlgorithm;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Directory holding soft-deleted artifacts within a repository root.
pub const TRASH_DIR: &str = ".trash";

/// Directory reserved for index data; opaque to this engine and never touched
/// by trash or delete operations.
pub const INDEX_DIR: &str = ".index";

/// Identity of a repository across the whole configuration graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryKey {
    pub storage_id: String,
    pub repository_id: String,
}

impl RepositoryKey {
    pub fn new(storage_id: impl Into<String>, repository_id: impl Into<String>) -> Self {
        Self {
            storage_id: storage_id.into(),
            repository_id: repository_id.into(),
        }
    }
}

impl fmt::Display for RepositoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.storage_id, self.repository_id)
    }
}

/// The physical root of one repository.
#[derive(Clone, Debug)]
pub struct RepositoryRoot {
    key: RepositoryKey,
    root: PathBuf,
}

impl RepositoryRoot {
    pub(crate) fn new(key: RepositoryKey, root: PathBuf) -> Self {
        Self { key, root }
    }

    pub fn key(&self) -> &RepositoryKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Derive a path strictly under this root from a relative path.
    ///
    /// Rejects absolute paths and any path whose components would normalize
    /// outside the root (`..`, drive prefixes, root components). Reserved
    /// directories cannot be addressed directly either.
    pub fn resolve(&self, relative: &str) -> StorageResult<RepositoryPath> {
        validate_relative_path(relative)?;
        Ok(RepositoryPath {
            root: self.clone(),
            relative: relative.to_string(),
            absolute: self.root.join(relative),
        })
    }

    /// The trash location mirroring `relative` under this root.
    pub(crate) fn trash_path(&self, relative: &str) -> StorageResult<RepositoryPath> {
        validate_relative_path(relative)?;
        let trash_relative = format!("{TRASH_DIR}/{relative}");
        Ok(RepositoryPath {
            root: self.clone(),
            absolute: self.root.join(&trash_relative),
            relative: trash_relative,
        })
    }

    /// Absolute path of the trash directory itself.
    pub fn trash_dir(&self) -> PathBuf {
        self.root.join(TRASH_DIR)
    }

    /// Absolute path of the opaque index directory.
    pub fn index_dir(&self) -> PathBuf {
        self.root.join(INDEX_DIR)
    }
}

fn validate_relative_path(relative: &str) -> StorageResult<()> {
    if relative.is_empty() {
        return Err(StorageError::PathTraversal("<empty>".to_string()));
    }
    if relative.starts_with('/') || relative.starts_with('\\') || relative.contains("..") {
        return Err(StorageError::PathTraversal(relative.to_string()));
    }
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(StorageError::PathTraversal(relative.to_string())),
        }
    }
    // The trash and index trees are managed by the engine, not addressable
    // as artifact paths.
    let first = relative.split('/').next().unwrap_or(relative);
    if first == TRASH_DIR || first == INDEX_DIR {
        return Err(StorageError::PathTraversal(relative.to_string()));
    }
    Ok(())
}

/// A filesystem location scoped to one repository's root.
#[derive(Clone, Debug)]
pub struct RepositoryPath {
    root: RepositoryRoot,
    relative: String,
    absolute: PathBuf,
}

impl RepositoryPath {
    pub fn repository_key(&self) -> &RepositoryKey {
        self.root.key()
    }

    pub fn root(&self) -> &RepositoryRoot {
        &self.root
    }

    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// The checksum sidecar path for this artifact and algorithm.
    pub fn sidecar(&self, algorithm: ChecksumAlgorithm) -> RepositoryPath {
        let relative = format!("{}.{}", self.relative, algorithm.extension());
        RepositoryPath {
            root: self.root.clone(),
            absolute: self.root.path().join(&relative),
            relative,
        }
    }

    /// All sidecar paths for this artifact.
    pub fn sidecars(&self) -> impl Iterator<Item = (ChecksumAlgorithm, RepositoryPath)> + '_ {
        ChecksumAlgorithm::ALL
            .into_iter()
            .map(|alg| (alg, self.sidecar(alg)))
    }
}

impl fmt::Display for RepositoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.root.key(), self.relative)
    }
}
