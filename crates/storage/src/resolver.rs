//! Path resolution: classify the target repository and dispatch.
//!
//! A resolution request enters here with a (storageId, repositoryId, path)
//! triple. Hosted repositories resolve directly against the local tree,
//! proxy repositories go through their [`ProxyConnector`], and group
//! repositories fan out across their members.

use crate::error::{StorageError, StorageResult};
use crate::group;
use crate::paths::{RepositoryKey, RepositoryPath, RepositoryRoot, INDEX_DIR, TRASH_DIR};
use crate::proxy::ProxyConnector;
use crate::remote::{HttpRemoteRepository, RemoteRepository};
use dashmap::{DashMap, DashSet};
use depot_core::{
    layout_provider, ArtifactCoordinate, ConfigSnapshot, RemoteConfig, Repository, RepositoryKind,
    Storage,
};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Factory for the remote side of proxy repositories; tests substitute
/// in-memory remotes here.
pub type RemoteFactory =
    Box<dyn Fn(&RepositoryKey, &RemoteConfig) -> StorageResult<Arc<dyn RemoteRepository>> + Send + Sync>;

/// Resolves logical artifact references to physical repository paths.
pub struct PathResolver {
    config: Arc<ConfigSnapshot>,
    remote_factory: RemoteFactory,
    /// Exclusive per-repository initialization sections.
    init_locks: DashMap<RepositoryKey, Arc<Mutex<()>>>,
    /// Repositories whose directory tree is known to exist.
    initialized: DashSet<RepositoryKey>,
    /// One connector (and thus one single-flight table) per proxy repository.
    connectors: DashMap<RepositoryKey, Arc<ProxyConnector>>,
}

impl PathResolver {
    /// Create a resolver over an immutable configuration snapshot, using
    /// HTTP remotes for proxy repositories.
    pub fn new(config: Arc<ConfigSnapshot>) -> Self {
        Self::with_remote_factory(
            config,
            Box::new(|_, remote| {
                Ok(Arc::new(HttpRemoteRepository::new(remote)?) as Arc<dyn RemoteRepository>)
            }),
        )
    }

    /// Create a resolver with a custom remote factory.
    pub fn with_remote_factory(config: Arc<ConfigSnapshot>, remote_factory: RemoteFactory) -> Self {
        Self {
            config,
            remote_factory,
            init_locks: DashMap::new(),
            initialized: DashSet::new(),
            connectors: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ConfigSnapshot {
        &self.config
    }

    /// Look up a repository, surfacing unknown references as errors.
    pub fn repository(
        &self,
        storage_id: &str,
        repository_id: &str,
    ) -> StorageResult<(&Storage, &Repository)> {
        let storage = self
            .config
            .storage(storage_id)
            .ok_or_else(|| StorageError::UnknownRepository {
                storage_id: storage_id.to_string(),
                repository_id: repository_id.to_string(),
            })?;
        let repository =
            storage
                .repositories
                .get(repository_id)
                .ok_or_else(|| StorageError::UnknownRepository {
                    storage_id: storage_id.to_string(),
                    repository_id: repository_id.to_string(),
                })?;
        Ok((storage, repository))
    }

    /// The physical root of a repository, creating the directory tree on
    /// demand.
    ///
    /// Idempotent and concurrency-safe: a single creator initializes the
    /// tree, concurrent callers wait or observe the already-initialized root.
    #[instrument(skip(self))]
    pub async fn resolve_root(
        &self,
        storage_id: &str,
        repository_id: &str,
    ) -> StorageResult<RepositoryRoot> {
        let (storage, repository) = self.repository(storage_id, repository_id)?;
        let key = RepositoryKey::new(storage_id, repository_id);
        let root = RepositoryRoot::new(key.clone(), storage.basedir.join(&repository.id));

        if self.initialized.contains(&key) {
            return Ok(root);
        }

        let lock = self
            .init_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if !self.initialized.contains(&key) {
            fs::create_dir_all(root.path()).await?;
            debug!(repository = %key, path = ?root.path(), "initialized repository root");
            self.initialized.insert(key);
        }
        Ok(root)
    }

    /// Resolve a relative path against a repository, dispatching by type.
    ///
    /// `Ok(None)` is the "absent" outcome: no hosted file, remote 404, or no
    /// group member with a copy.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        storage_id: &str,
        repository_id: &str,
        relative: &str,
    ) -> StorageResult<Option<RepositoryPath>> {
        let (_, repository) = self.repository(storage_id, repository_id)?;
        let mut visited = BTreeSet::new();
        self.resolve_repository(storage_id, repository, relative, &mut visited)
            .await
    }

    /// Resolve a coordinate by mapping it through the repository's layout.
    pub async fn resolve_coordinate(
        &self,
        storage_id: &str,
        repository_id: &str,
        coordinate: &ArtifactCoordinate,
    ) -> StorageResult<Option<RepositoryPath>> {
        let (_, repository) = self.repository(storage_id, repository_id)?;
        let layout = layout_provider(&repository.layout)?;
        let relative = layout.to_relative_path(coordinate)?;
        self.resolve(storage_id, repository_id, &relative).await
    }

    /// Type-dispatched resolution; recursion point for group members.
    pub(crate) fn resolve_repository<'a>(
        &'a self,
        storage_id: &'a str,
        repository: &'a Repository,
        relative: &'a str,
        visited: &'a mut BTreeSet<RepositoryKey>,
    ) -> Pin<Box<dyn Future<Output = StorageResult<Option<RepositoryPath>>> + Send + 'a>> {
        Box::pin(async move {
            match &repository.kind {
                RepositoryKind::Hosted => {
                    let root = self.resolve_root(storage_id, &repository.id).await?;
                    let path = root.resolve(relative)?;
                    if fs::try_exists(path.absolute()).await? {
                        Ok(Some(path))
                    } else {
                        Ok(None)
                    }
                }
                RepositoryKind::Proxy { remote } => {
                    let root = self.resolve_root(storage_id, &repository.id).await?;
                    let key = RepositoryKey::new(storage_id, &repository.id);
                    let connector = self.connector(&key, remote)?;
                    connector.resolve(&root, relative).await
                }
                RepositoryKind::Group { members } => {
                    group::resolve(self, storage_id, repository, members, relative, visited).await
                }
            }
        })
    }

    fn connector(
        &self,
        key: &RepositoryKey,
        remote: &RemoteConfig,
    ) -> StorageResult<Arc<ProxyConnector>> {
        if let Some(connector) = self.connectors.get(key) {
            return Ok(connector.clone());
        }
        let remote_repository = (self.remote_factory)(key, remote)?;
        let connector = Arc::new(ProxyConnector::new(
            remote_repository,
            remote.verify_checksums,
        ));
        Ok(self
            .connectors
            .entry(key.clone())
            .or_insert(connector)
            .clone())
    }

    /// List the relative paths stored under `prefix` in a repository.
    ///
    /// Hosted and proxy repositories list their local tree (for a proxy this
    /// is the cache; nothing is fetched). Groups aggregate member listings,
    /// de-duplicated by relative path with the first member in order winning.
    #[instrument(skip(self))]
    pub async fn browse(
        &self,
        storage_id: &str,
        repository_id: &str,
        prefix: &str,
    ) -> StorageResult<Vec<String>> {
        let (_, repository) = self.repository(storage_id, repository_id)?;
        let mut visited = BTreeSet::new();
        self.browse_repository(storage_id, repository, prefix, &mut visited)
            .await
    }

    pub(crate) fn browse_repository<'a>(
        &'a self,
        storage_id: &'a str,
        repository: &'a Repository,
        prefix: &'a str,
        visited: &'a mut BTreeSet<RepositoryKey>,
    ) -> Pin<Box<dyn Future<Output = StorageResult<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            match &repository.kind {
                RepositoryKind::Hosted | RepositoryKind::Proxy { .. } => {
                    let root = self.resolve_root(storage_id, &repository.id).await?;
                    list_local(&root, prefix).await
                }
                RepositoryKind::Group { members } => {
                    group::browse(self, storage_id, repository, members, prefix, visited).await
                }
            }
        })
    }
}

/// Walk a repository's local tree, yielding sorted relative paths under
/// `prefix`. Reserved directories and in-flight temp files are skipped.
async fn list_local(root: &RepositoryRoot, prefix: &str) -> StorageResult<Vec<String>> {
    let base = if prefix.is_empty() {
        root.path().to_path_buf()
    } else {
        root.resolve(prefix)?.absolute().to_path_buf()
    };

    let mut results = Vec::new();
    if !fs::try_exists(&base).await? {
        return Ok(results);
    }

    let mut stack = vec![base];
    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name == TRASH_DIR || name == INDEX_DIR || name.contains(".tmp.") {
                continue;
            }
            // file_type() does not follow symlinks, keeping the walk inside
            // the repository root.
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                if let Ok(rel) = path.strip_prefix(root.path()) {
                    results.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
    }

    results.sort();
    Ok(results)
}
