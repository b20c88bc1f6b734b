//! Repository resolution and layered artifact storage engine for depot.
//!
//! This crate provides:
//! - Path resolution with traversal protection and on-demand root creation
//! - Hosted / proxy / group dispatch over an immutable configuration snapshot
//! - Remote-fetch-and-cache for proxy repositories with single-flight fetches
//! - Cycle-safe group fan-out, first match wins
//! - Checksum sidecar maintenance and integrity verification
//! - Soft deletion into a per-repository trash, restore, and purge
//! - Deployment orchestration with metadata merging

pub mod checksums;
pub mod deploy;
pub mod error;
mod fsutil;
mod group;
pub mod metadata;
pub mod paths;
pub mod proxy;
pub mod remote;
pub mod resolver;
pub mod trash;

pub use deploy::{
    ArtifactDeploymentCoordinator, ContentStream, DeployOutcome, DeploymentValidator,
    ReleaseRedeploymentValidator, VersionPolicyValidator,
};
pub use error::{StorageError, StorageResult};
pub use metadata::MetadataMerger;
pub use paths::{RepositoryKey, RepositoryPath, RepositoryRoot, INDEX_DIR, TRASH_DIR};
pub use proxy::ProxyConnector;
pub use remote::{HttpRemoteRepository, RemoteByteStream, RemoteRepository};
pub use resolver::{PathResolver, RemoteFactory};
