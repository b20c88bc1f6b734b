//! The Storage -> Repository configuration graph.
//!
//! Configuration is produced externally and handed to the engine as an
//! immutable [`ConfigSnapshot`] per request; administration changes produce a
//! new snapshot rather than mutating one in place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Release/snapshot acceptance policy of a repository.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    Release,
    Snapshot,
    #[default]
    Mixed,
}

impl VersionPolicy {
    /// Whether an artifact with the given snapshot-ness is accepted.
    pub fn accepts(self, is_snapshot: bool) -> bool {
        match self {
            VersionPolicy::Release => !is_snapshot,
            VersionPolicy::Snapshot => is_snapshot,
            VersionPolicy::Mixed => true,
        }
    }
}

/// Remote repository descriptor for proxy repositories.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote repository.
    pub url: String,
    /// Remote call timeout in seconds.
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
    /// Verify checksums published by the remote before caching (default: true).
    #[serde(default = "default_verify_checksums")]
    pub verify_checksums: bool,
}

fn default_remote_timeout_secs() -> u64 {
    30
}

fn default_verify_checksums() -> bool {
    true
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_remote_timeout_secs(),
            verify_checksums: default_verify_checksums(),
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Reference to a member repository of a group.
///
/// `storage_id` defaults to the group's own storage when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<String>,
    pub repository_id: String,
}

impl GroupMember {
    pub fn local(repository_id: impl Into<String>) -> Self {
        Self {
            storage_id: None,
            repository_id: repository_id.into(),
        }
    }

    pub fn in_storage(storage_id: impl Into<String>, repository_id: impl Into<String>) -> Self {
        Self {
            storage_id: Some(storage_id.into()),
            repository_id: repository_id.into(),
        }
    }
}

/// Repository type, a closed set: hosted, proxy, or group.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepositoryKind {
    /// Locally authoritative, no remote backing.
    Hosted,
    /// Backed by a remote repository, caching fetched content locally.
    Proxy { remote: RemoteConfig },
    /// Virtual repository aggregating an ordered list of members.
    Group { members: Vec<GroupMember> },
}

/// One repository within a storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    /// Layout alias, resolved through `layout_provider`.
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(flatten)]
    pub kind: RepositoryKind,
    #[serde(default)]
    pub policy: VersionPolicy,
    /// Soft-delete into `.trash` instead of removing (default: false).
    #[serde(default)]
    pub trash_enabled: bool,
    /// Permit force deletion to bypass the trash (default: false).
    #[serde(default)]
    pub allows_force_deletion: bool,
}

fn default_layout() -> String {
    crate::layout::MAVEN2_ALIAS.to_string()
}

impl Repository {
    pub fn hosted(id: impl Into<String>) -> Self {
        Self::new(id, RepositoryKind::Hosted)
    }

    pub fn proxy(id: impl Into<String>, remote: RemoteConfig) -> Self {
        Self::new(id, RepositoryKind::Proxy { remote })
    }

    pub fn group(id: impl Into<String>, members: Vec<GroupMember>) -> Self {
        Self::new(id, RepositoryKind::Group { members })
    }

    fn new(id: impl Into<String>, kind: RepositoryKind) -> Self {
        Self {
            id: id.into(),
            layout: default_layout(),
            kind,
            policy: VersionPolicy::default(),
            trash_enabled: false,
            allows_force_deletion: false,
        }
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_trash(mut self, enabled: bool) -> Self {
        self.trash_enabled = enabled;
        self
    }

    pub fn with_force_deletion(mut self, allowed: bool) -> Self {
        self.allows_force_deletion = allowed;
        self
    }
}

/// A named top-level namespace owning a basedir and a set of repositories.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Storage {
    pub id: String,
    pub basedir: PathBuf,
    #[serde(default)]
    pub repositories: BTreeMap<String, Repository>,
}

impl Storage {
    pub fn new(id: impl Into<String>, basedir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            basedir: basedir.into(),
            repositories: BTreeMap::new(),
        }
    }

    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.repositories.insert(repository.id.clone(), repository);
        self
    }
}

/// Immutable view of the whole configuration graph, consulted read-only by
/// the engine.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(default)]
    pub storages: BTreeMap<String, Storage>,
}

impl ConfigSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storages.insert(storage.id.clone(), storage);
        self
    }

    /// Look up a storage by id.
    pub fn storage(&self, storage_id: &str) -> Option<&Storage> {
        self.storages.get(storage_id)
    }

    /// Look up a repository by (storageId, repositoryId).
    pub fn repository(&self, storage_id: &str, repository_id: &str) -> Option<&Repository> {
        self.storages
            .get(storage_id)?
            .repositories
            .get(repository_id)
    }

    /// Resolve a group member reference relative to the storage that owns the
    /// group.
    pub fn member<'a>(
        &'a self,
        owning_storage_id: &str,
        member: &GroupMember,
    ) -> Option<(&'a Storage, &'a Repository)> {
        let storage_id = member.storage_id.as_deref().unwrap_or(owning_storage_id);
        let storage = self.storages.get(storage_id)?;
        let repository = storage.repositories.get(&member.repository_id)?;
        Some((storage, repository))
    }

    /// Validate the configuration graph.
    ///
    /// Rejects repositories whose map key disagrees with their id, unknown
    /// layout aliases, groups with empty or dangling member lists, and group
    /// membership cycles.
    pub fn validate(&self) -> crate::Result<()> {
        for (storage_id, storage) in &self.storages {
            for (key, repository) in &storage.repositories {
                if key != &repository.id {
                    return Err(crate::Error::InvalidConfiguration(format!(
                        "repository '{}' registered under key '{}' in storage '{}'",
                        repository.id, key, storage_id
                    )));
                }
                crate::layout::layout_provider(&repository.layout)?;

                if let RepositoryKind::Group { members } = &repository.kind {
                    if members.is_empty() {
                        return Err(crate::Error::InvalidConfiguration(format!(
                            "group '{}:{}' has no members",
                            storage_id, repository.id
                        )));
                    }
                    for member in members {
                        if self.member(storage_id, member).is_none() {
                            return Err(crate::Error::InvalidConfiguration(format!(
                                "group '{}:{}' references unknown member '{}:{}'",
                                storage_id,
                                repository.id,
                                member.storage_id.as_deref().unwrap_or(storage_id),
                                member.repository_id
                            )));
                        }
                    }
                    let mut visited = BTreeSet::new();
                    self.check_cycles(storage_id, repository, &mut visited)?;
                }
            }
        }
        Ok(())
    }

    fn check_cycles(
        &self,
        storage_id: &str,
        repository: &Repository,
        visited: &mut BTreeSet<(String, String)>,
    ) -> crate::Result<()> {
        let key = (storage_id.to_string(), repository.id.clone());
        if !visited.insert(key) {
            return Err(crate::Error::CyclicGroupDefinition(format!(
                "{}:{}",
                storage_id, repository.id
            )));
        }
        if let RepositoryKind::Group { members } = &repository.kind {
            for member in members {
                let member_storage_id = member.storage_id.as_deref().unwrap_or(storage_id);
                if let Some((storage, member_repository)) = self.member(storage_id, member) {
                    debug_assert_eq!(storage.id, member_storage_id);
                    self.check_cycles(member_storage_id, member_repository, visited)?;
                }
            }
        }
        visited.remove(&(storage_id.to_string(), repository.id.clone()));
        Ok(())
    }
}
