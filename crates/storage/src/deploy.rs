//! Deployment orchestration: write bytes, checksums, sidecars, metadata.

use crate::error::{StorageError, StorageResult};
use crate::fsutil;
use crate::metadata::MetadataMerger;
use crate::paths::RepositoryPath;
use crate::resolver::PathResolver;
use bytes::Bytes;
use depot_core::{
    layout_provider, ArtifactCoordinate, ChecksumSet, MultiDigester, Repository, RepositoryKind,
    VersionPolicy,
};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// A boxed stream of artifact content bytes.
pub type ContentStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Pluggable pre-deploy policy check.
///
/// Validators are external collaborators; the coordinator calls them before
/// accepting a deploy but does not implement their rules.
pub trait DeploymentValidator: Send + Sync {
    /// Accept or reject a deploy; `already_deployed` reports whether the
    /// target path currently holds an artifact.
    fn validate(
        &self,
        repository: &Repository,
        coordinate: &ArtifactCoordinate,
        already_deployed: bool,
    ) -> Result<(), String>;
}

/// Rejects artifacts whose snapshot-ness the repository policy refuses.
pub struct VersionPolicyValidator;

impl DeploymentValidator for VersionPolicyValidator {
    fn validate(
        &self,
        repository: &Repository,
        coordinate: &ArtifactCoordinate,
        _already_deployed: bool,
    ) -> Result<(), String> {
        let is_snapshot = match coordinate {
            ArtifactCoordinate::Maven(c) => c.is_snapshot(),
            ArtifactCoordinate::Raw(_) => false,
        };
        if repository.policy.accepts(is_snapshot) {
            Ok(())
        } else {
            Err(format!(
                "repository '{}' with {:?} policy does not accept '{}'",
                repository.id, repository.policy, coordinate
            ))
        }
    }
}

/// Rejects re-deployment of an existing release artifact to a
/// release-policy repository.
pub struct ReleaseRedeploymentValidator;

impl DeploymentValidator for ReleaseRedeploymentValidator {
    fn validate(
        &self,
        repository: &Repository,
        coordinate: &ArtifactCoordinate,
        already_deployed: bool,
    ) -> Result<(), String> {
        let is_release = match coordinate {
            ArtifactCoordinate::Maven(c) => !c.is_snapshot(),
            ArtifactCoordinate::Raw(_) => false,
        };
        if already_deployed && is_release && repository.policy == VersionPolicy::Release {
            Err(format!("release artifact '{coordinate}' is already deployed"))
        } else {
            Ok(())
        }
    }
}

/// Result of a successful deploy.
#[derive(Debug)]
pub struct DeployOutcome {
    pub path: RepositoryPath,
    pub checksums: ChecksumSet,
}

/// Top-level deploy orchestration.
///
/// Sequence: resolve the target path through the layout, run validators,
/// stream bytes to a temp file while digesting, move into place, write
/// checksum sidecars, then merge metadata. A failure partway removes the
/// partial artifact and sidecars; no half-deployed artifact is ever left
/// resolvable.
pub struct ArtifactDeploymentCoordinator {
    resolver: Arc<PathResolver>,
    merger: Arc<MetadataMerger>,
    validators: Vec<Box<dyn DeploymentValidator>>,
}

impl ArtifactDeploymentCoordinator {
    /// Coordinator with the default validator chain.
    pub fn new(resolver: Arc<PathResolver>, merger: Arc<MetadataMerger>) -> Self {
        Self::with_validators(
            resolver,
            merger,
            vec![
                Box::new(VersionPolicyValidator),
                Box::new(ReleaseRedeploymentValidator),
            ],
        )
    }

    pub fn with_validators(
        resolver: Arc<PathResolver>,
        merger: Arc<MetadataMerger>,
        validators: Vec<Box<dyn DeploymentValidator>>,
    ) -> Self {
        Self {
            resolver,
            merger,
            validators,
        }
    }

    /// Deploy an artifact from a content stream, stamped now.
    pub async fn deploy(
        &self,
        storage_id: &str,
        repository_id: &str,
        coordinate: &ArtifactCoordinate,
        content: ContentStream,
    ) -> StorageResult<DeployOutcome> {
        self.deploy_at(
            storage_id,
            repository_id,
            coordinate,
            content,
            OffsetDateTime::now_utc(),
        )
        .await
    }

    /// Deploy a complete in-memory artifact.
    pub async fn deploy_bytes(
        &self,
        storage_id: &str,
        repository_id: &str,
        coordinate: &ArtifactCoordinate,
        content: Bytes,
    ) -> StorageResult<DeployOutcome> {
        let stream: ContentStream = Box::pin(futures::stream::once(async move { Ok(content) }));
        self.deploy(storage_id, repository_id, coordinate, stream)
            .await
    }

    /// Deploy at an explicit instant (metadata timestamps become
    /// deterministic).
    #[instrument(skip(self, content, coordinate), fields(coordinate = %coordinate))]
    pub async fn deploy_at(
        &self,
        storage_id: &str,
        repository_id: &str,
        coordinate: &ArtifactCoordinate,
        mut content: ContentStream,
        at: OffsetDateTime,
    ) -> StorageResult<DeployOutcome> {
        let (_, repository) = self.resolver.repository(storage_id, repository_id)?;
        if !matches!(repository.kind, RepositoryKind::Hosted) {
            return Err(StorageError::DeploymentRejected(format!(
                "repository '{repository_id}' is not a hosted repository"
            )));
        }

        let layout = layout_provider(&repository.layout)?;
        let relative = layout.to_relative_path(coordinate)?;
        let root = self.resolver.resolve_root(storage_id, repository_id).await?;
        let path = root.resolve(&relative)?;

        let already_deployed = fs::try_exists(path.absolute()).await?;
        for validator in &self.validators {
            validator
                .validate(repository, coordinate, already_deployed)
                .map_err(StorageError::DeploymentRejected)?;
        }

        // Stream to a temp sibling while digesting; the artifact becomes
        // visible only after a complete, flushed write.
        fsutil::ensure_parent(path.absolute()).await?;
        let temp_path = fsutil::temp_sibling(path.absolute());
        let written: StorageResult<ChecksumSet> = async {
            let mut file = fs::File::create(&temp_path).await?;
            let mut digester = MultiDigester::all();
            while let Some(chunk) = content.next().await {
                let chunk = chunk?;
                digester.update(&chunk);
                file.write_all(&chunk).await?;
            }
            file.sync_all().await?;
            Ok(digester.finalize())
        }
        .await;

        let checksums = match written {
            Ok(checksums) => checksums,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::PartialWrite(format!(
                    "deploy of '{coordinate}' failed mid-write: {e}"
                )));
            }
        };

        fs::rename(&temp_path, path.absolute()).await?;

        if let Err(e) = crate::checksums::write_sidecars(&path, &checksums).await {
            // Roll back to the pre-deploy state rather than leave an
            // artifact with partial sidecars.
            let _ = fs::remove_file(path.absolute()).await;
            let _ = crate::checksums::remove_sidecars(&path).await;
            return Err(StorageError::PartialWrite(format!(
                "sidecar write for '{coordinate}' failed: {e}"
            )));
        }

        self.merger.merge_deploy_at(&root, coordinate, at).await?;
        debug!(%path, "deployed artifact");
        Ok(DeployOutcome { path, checksums })
    }
}
