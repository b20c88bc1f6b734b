//! Domain types for the depot artifact repository engine.
//!
//! This crate holds everything that is pure data and pure computation:
//! - Artifact coordinates and the layout providers that map them to paths
//! - Checksum algorithms, incremental multi-digesting, and checksum sets
//! - Versioning metadata documents and their merge rules
//! - The Storage -> Repository configuration snapshot consulted at resolve time
//!
//! All I/O (filesystem, network, locking) lives in `depot-storage`.

pub mod checksum;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod layout;
pub mod metadata;

pub use checksum::{ChecksumAlgorithm, ChecksumSet, MultiDigester};
pub use config::{
    ConfigSnapshot, GroupMember, RemoteConfig, Repository, RepositoryKind, Storage, VersionPolicy,
};
pub use coordinate::{ArtifactCoordinate, MavenCoordinate, RawCoordinate};
pub use error::{Error, Result};
pub use layout::{layout_provider, LayoutProvider, MAVEN2_ALIAS, RAW_ALIAS};
pub use metadata::{ArtifactMetadata, PluginEntry, SnapshotRecord, SnapshotVersion, Versioning};
