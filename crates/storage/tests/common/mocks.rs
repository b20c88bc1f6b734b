use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use depot_core::{ChecksumAlgorithm, MultiDigester};
use depot_storage::error::{StorageError, StorageResult};
use depot_storage::remote::{RemoteByteStream, RemoteRepository};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

/// In-memory remote repository standing in for an HTTP remote.
///
/// Publishes a SHA-256 checksum for every stored object unless overridden,
/// counts fetches for single-flight assertions, and can be switched to an
/// unreachable state.
pub struct MockRemote {
    objects: DashMap<String, Bytes>,
    published_checksums: DashMap<(String, ChecksumAlgorithm), String>,
    auto_checksums: AtomicBool,
    unreachable: AtomicBool,
    fetch_delay_ms: AtomicU64,
    fetch_count: AtomicUsize,
}

#[allow(dead_code)]
impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: DashMap::new(),
            published_checksums: DashMap::new(),
            auto_checksums: AtomicBool::new(true),
            unreachable: AtomicBool::new(false),
            fetch_delay_ms: AtomicU64::new(0),
            fetch_count: AtomicUsize::new(0),
        })
    }

    pub fn insert(&self, path: &str, content: impl Into<Bytes>) {
        self.objects.insert(path.to_string(), content.into());
    }

    /// Override the checksum published for one path and algorithm.
    pub fn publish_checksum(&self, path: &str, algorithm: ChecksumAlgorithm, hex: &str) {
        self.published_checksums
            .insert((path.to_string(), algorithm), hex.to_string());
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Stop publishing automatic checksums, simulating a remote with no
    /// checksum sidecars.
    pub fn set_publishes_checksums(&self, publishes: bool) {
        self.auto_checksums.store(publishes, Ordering::SeqCst);
    }

    /// Delay every fetch, widening race windows in concurrency tests.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.fetch_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    fn check_reachable(&self, what: &str) -> StorageResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StorageError::RemoteFetch {
                url: format!("mock://{what}"),
                reason: "remote unreachable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteRepository for MockRemote {
    async fn fetch(&self, relative_path: &str) -> StorageResult<Option<RemoteByteStream>> {
        self.check_reachable(relative_path)?;
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let Some(content) = self.objects.get(relative_path).map(|c| c.clone()) else {
            return Ok(None);
        };
        let stream: RemoteByteStream = Box::pin(futures::stream::once(async move { Ok(content) }));
        Ok(Some(stream))
    }

    async fn fetch_checksum(
        &self,
        relative_path: &str,
        algorithm: ChecksumAlgorithm,
    ) -> StorageResult<Option<String>> {
        self.check_reachable(relative_path)?;

        if let Some(hex) = self
            .published_checksums
            .get(&(relative_path.to_string(), algorithm))
        {
            return Ok(Some(hex.clone()));
        }
        if !self.auto_checksums.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let Some(content) = self.objects.get(relative_path) else {
            return Ok(None);
        };
        let mut digester = MultiDigester::new(&[algorithm]);
        digester.update(&content);
        let set = digester.finalize();
        Ok(set.get(algorithm).map(str::to_string))
    }
}
