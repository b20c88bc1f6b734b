use super::mocks::MockRemote;
use depot_core::{ConfigSnapshot, Repository, Storage};
use depot_storage::remote::RemoteRepository;
use depot_storage::resolver::PathResolver;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// The storage id used by every fixture.
pub const STORAGE_ID: &str = "storage0";

/// Install a test subscriber once; later calls are no-ops.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A one-storage snapshot rooted in a temp directory.
pub fn snapshot(temp: &TempDir, repositories: Vec<Repository>) -> Arc<ConfigSnapshot> {
    let mut storage = Storage::new(STORAGE_ID, temp.path().join(STORAGE_ID));
    for repository in repositories {
        storage = storage.with_repository(repository);
    }
    let snapshot = ConfigSnapshot::new().with_storage(storage);
    snapshot.validate().expect("fixture configuration is valid");
    Arc::new(snapshot)
}

/// Like [`snapshot`], but skipping validation; for deliberately broken
/// graphs (e.g. membership cycles) that must still fail safely at resolve
/// time.
#[allow(dead_code)]
pub fn snapshot_unchecked(temp: &TempDir, repositories: Vec<Repository>) -> Arc<ConfigSnapshot> {
    let mut storage = Storage::new(STORAGE_ID, temp.path().join(STORAGE_ID));
    for repository in repositories {
        storage = storage.with_repository(repository);
    }
    Arc::new(ConfigSnapshot::new().with_storage(storage))
}

/// A resolver whose proxy repositories are wired to mock remotes by
/// repository id.
pub fn resolver_with_remotes(
    config: Arc<ConfigSnapshot>,
    remotes: HashMap<String, Arc<MockRemote>>,
) -> Arc<PathResolver> {
    init_tracing();
    Arc::new(PathResolver::with_remote_factory(
        config,
        Box::new(move |key, _remote| {
            let mock = remotes
                .get(&key.repository_id)
                .unwrap_or_else(|| panic!("no mock remote for repository '{key}'"))
                .clone();
            Ok(mock as Arc<dyn RemoteRepository>)
        }),
    ))
}

/// A resolver for configurations without proxy repositories.
#[allow(dead_code)]
pub fn resolver_for(config: Arc<ConfigSnapshot>) -> Arc<PathResolver> {
    resolver_with_remotes(config, HashMap::new())
}

/// Place a file directly into a hosted repository's tree.
#[allow(dead_code)]
pub async fn write_hosted_artifact(
    resolver: &PathResolver,
    repository_id: &str,
    relative: &str,
    content: &[u8],
) {
    let root = resolver
        .resolve_root(STORAGE_ID, repository_id)
        .await
        .unwrap();
    let path = root.resolve(relative).unwrap();
    if let Some(parent) = path.absolute().parent() {
        tokio::fs::create_dir_all(parent).await.unwrap();
    }
    tokio::fs::write(path.absolute(), content).await.unwrap();
}
