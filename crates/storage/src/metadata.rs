//! Metadata merging after deploys.
//!
//! Merges are read-modify-write over shared documents, so updates to one
//! document are serialized through a per-document lock; deploys touching
//! different documents proceed in parallel.

use crate::error::StorageResult;
use crate::fsutil;
use crate::paths::{RepositoryPath, RepositoryRoot};
use dashmap::DashMap;
use depot_core::layout::maven::METADATA_FILE_NAME;
use depot_core::metadata::{format_timestamp, plugin_prefix};
use depot_core::{ArtifactCoordinate, ArtifactMetadata, MavenCoordinate, PluginEntry, SnapshotRecord};
use std::sync::Arc;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Reconciles layout metadata documents after a deploy.
pub struct MetadataMerger {
    /// Single-writer discipline per metadata document.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Default for MetadataMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataMerger {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Merge metadata for a successful deploy of `coordinate`, stamped now.
    pub async fn merge_deploy(
        &self,
        root: &RepositoryRoot,
        coordinate: &ArtifactCoordinate,
    ) -> StorageResult<()> {
        self.merge_deploy_at(root, coordinate, OffsetDateTime::now_utc())
            .await
    }

    /// Merge metadata for a successful deploy at an explicit instant.
    ///
    /// Idempotent: re-running the merge for an already-recorded deploy does
    /// not duplicate version or snapshot entries.
    #[instrument(skip(self, root, coordinate), fields(repository = %root.key(), coordinate = %coordinate))]
    pub async fn merge_deploy_at(
        &self,
        root: &RepositoryRoot,
        coordinate: &ArtifactCoordinate,
        at: OffsetDateTime,
    ) -> StorageResult<()> {
        // Only the Maven layout maintains versioning metadata.
        let ArtifactCoordinate::Maven(c) = coordinate else {
            return Ok(());
        };

        if c.is_snapshot() {
            self.merge_version_level(root, c, at).await?;
        }
        self.merge_artifact_level(root, c, at).await?;
        Ok(())
    }

    /// Version-level merge: snapshot timestamp/buildNumber bookkeeping and
    /// the per-classifier/extension snapshot-version entries.
    async fn merge_version_level(
        &self,
        root: &RepositoryRoot,
        c: &MavenCoordinate,
        at: OffsetDateTime,
    ) -> StorageResult<()> {
        let doc_path = version_document_path(root, c)?;
        let _guard = self.lock_for(&doc_path).await;

        let mut doc = load(&doc_path)
            .await?
            .unwrap_or_else(|| ArtifactMetadata::version_level(&c.group_id, &c.artifact_id, &c.version));

        let timestamp = snapshot_timestamp(at);
        let snapshot = match &doc.versioning.snapshot {
            // Re-merge of the same deploy keeps its build number.
            Some(existing) if existing.timestamp == timestamp => existing.clone(),
            Some(existing) => SnapshotRecord {
                timestamp,
                build_number: existing.build_number + 1,
            },
            None => SnapshotRecord {
                timestamp,
                build_number: 1,
            },
        };

        doc.record_snapshot_deploy(c.classifier.as_deref(), &c.extension, snapshot, at);
        store(&doc_path, &doc).await?;
        debug!(path = %doc_path, "merged version-level metadata");
        Ok(())
    }

    /// Artifact-level merge: version list, latest/release pointers, and
    /// plugin prefix registration for plugin artifacts.
    async fn merge_artifact_level(
        &self,
        root: &RepositoryRoot,
        c: &MavenCoordinate,
        at: OffsetDateTime,
    ) -> StorageResult<()> {
        let doc_path = artifact_document_path(root, c)?;
        let _guard = self.lock_for(&doc_path).await;

        let mut doc = load(&doc_path)
            .await?
            .unwrap_or_else(|| ArtifactMetadata::artifact_level(&c.group_id, &c.artifact_id));

        doc.record_version(&c.version, c.is_snapshot(), at);
        if is_plugin(c) {
            doc.register_plugin(PluginEntry {
                prefix: plugin_prefix(&c.artifact_id),
                artifact_id: c.artifact_id.clone(),
                name: None,
            });
        }
        store(&doc_path, &doc).await?;
        debug!(path = %doc_path, "merged artifact-level metadata");
        Ok(())
    }

    async fn lock_for(&self, doc_path: &RepositoryPath) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(doc_path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

/// Location of the artifact-level document: `<group>/<artifact>/<doc>`.
pub fn artifact_document_path(
    root: &RepositoryRoot,
    c: &MavenCoordinate,
) -> StorageResult<RepositoryPath> {
    root.resolve(&format!(
        "{}/{}/{}",
        c.group_id.replace('.', "/"),
        c.artifact_id,
        METADATA_FILE_NAME
    ))
}

/// Location of the version-level document: `<group>/<artifact>/<version>/<doc>`.
pub fn version_document_path(
    root: &RepositoryRoot,
    c: &MavenCoordinate,
) -> StorageResult<RepositoryPath> {
    root.resolve(&format!(
        "{}/{}/{}/{}",
        c.group_id.replace('.', "/"),
        c.artifact_id,
        c.version,
        METADATA_FILE_NAME
    ))
}

/// Read a metadata document, `None` when absent.
pub async fn load(path: &RepositoryPath) -> StorageResult<Option<ArtifactMetadata>> {
    match fs::read_to_string(path.absolute()).await {
        Ok(json) => Ok(Some(ArtifactMetadata::from_json(&json)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn store(path: &RepositoryPath, doc: &ArtifactMetadata) -> StorageResult<()> {
    let json = doc.to_json()?;
    fsutil::write_atomic(path.absolute(), json.as_bytes()).await?;
    Ok(())
}

/// Snapshot timestamps use the dotted `yyyyMMdd.HHmmss` form.
fn snapshot_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year][month][day].[hour][minute][second]");
    at.format(&format).unwrap_or_else(|_| format_timestamp(at))
}

/// Build-tool plugin detection by packaging or naming convention.
fn is_plugin(c: &MavenCoordinate) -> bool {
    c.extension == "maven-plugin"
        || (c.artifact_id.starts_with("maven-") && c.artifact_id.ends_with("-plugin"))
        || c.artifact_id.ends_with("-maven-plugin")
}
