//! Remote-fetch-and-cache handling for proxy repositories.
//!
//! Per (repository, relativePath) the connector moves through
//! `NotCached -> Fetching -> Cached | FetchFailed`. A cached artifact is
//! served from local storage; a miss triggers a single remote fetch that
//! streams to a temp file while digesting, verifies any checksum the remote
//! published, and only then moves into place. Failed or partial downloads
//! never become visible as cached content.

use crate::checksums;
use crate::error::{StorageError, StorageResult};
use crate::fsutil;
use crate::paths::{RepositoryPath, RepositoryRoot};
use crate::remote::RemoteRepository;
use dashmap::DashMap;
use depot_core::{ChecksumAlgorithm, ChecksumSet, MultiDigester};
use futures::StreamExt;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Checksums a remote may publish, tried strongest-first.
const REMOTE_CHECKSUM_PREFERENCE: [ChecksumAlgorithm; 2] =
    [ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Sha1];

/// Fetch-and-cache connector for one proxy repository.
pub struct ProxyConnector {
    remote: Arc<dyn RemoteRepository>,
    verify_checksums: bool,
    /// One lock per relative path: at most one in-flight remote fetch per
    /// key, concurrent resolvers await it instead of duplicating the request.
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl ProxyConnector {
    pub fn new(remote: Arc<dyn RemoteRepository>, verify_checksums: bool) -> Self {
        Self {
            remote,
            verify_checksums,
            in_flight: DashMap::new(),
        }
    }

    /// Resolve a relative path against this proxy repository.
    ///
    /// Serves the local copy when cached, otherwise fetches from the remote.
    /// `Ok(None)` means the remote reports the artifact absent.
    #[instrument(skip(self, root), fields(repository = %root.key()))]
    pub async fn resolve(
        &self,
        root: &RepositoryRoot,
        relative: &str,
    ) -> StorageResult<Option<RepositoryPath>> {
        let path = root.resolve(relative)?;
        if fs::try_exists(path.absolute()).await? {
            return Ok(Some(path));
        }

        let lock = self
            .in_flight
            .entry(relative.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // A concurrent resolver may have completed the fetch while we waited.
        let outcome = if fs::try_exists(path.absolute()).await? {
            Ok(Some(path))
        } else {
            self.fetch_into(&path, relative).await
        };

        drop(_guard);
        self.in_flight
            .remove_if(relative, |_, lock| Arc::strong_count(lock) <= 1);
        outcome
    }

    async fn fetch_into(
        &self,
        path: &RepositoryPath,
        relative: &str,
    ) -> StorageResult<Option<RepositoryPath>> {
        let Some(mut stream) = self.remote.fetch(relative).await? else {
            debug!(%path, "remote reports artifact absent");
            return Ok(None);
        };

        fsutil::ensure_parent(path.absolute()).await?;
        let temp_path = fsutil::temp_sibling(path.absolute());

        let streamed: StorageResult<ChecksumSet> = async {
            let mut file = fs::File::create(&temp_path).await?;
            let mut digester = MultiDigester::all();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                digester.update(&chunk);
                file.write_all(&chunk).await?;
            }
            file.sync_all().await?;
            Ok(digester.finalize())
        }
        .await;

        let checksums = match streamed {
            Ok(checksums) => checksums,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        if self.verify_checksums {
            if let Err(e) = self.verify_remote_checksum(path, relative, &checksums).await {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        }

        fs::rename(&temp_path, path.absolute()).await?;
        checksums::write_sidecars(path, &checksums).await?;
        debug!(%path, "cached proxied artifact");
        Ok(Some(path.clone()))
    }

    /// Compare streamed digests against the first checksum the remote
    /// publishes, strongest algorithm first. A remote that publishes none is
    /// accepted as-is.
    async fn verify_remote_checksum(
        &self,
        path: &RepositoryPath,
        relative: &str,
        actual: &ChecksumSet,
    ) -> StorageResult<()> {
        for algorithm in REMOTE_CHECKSUM_PREFERENCE {
            let published = match self.remote.fetch_checksum(relative, algorithm).await {
                Ok(published) => published,
                Err(e) => {
                    // A missing or unreachable checksum endpoint does not
                    // invalidate a fully streamed artifact.
                    warn!(%path, %algorithm, error = %e, "could not fetch remote checksum");
                    continue;
                }
            };
            if let Some(expected) = published {
                let actual_hex = actual.get(algorithm).unwrap_or_default();
                if actual_hex != expected {
                    return Err(StorageError::ChecksumMismatch {
                        path: path.to_string(),
                        algorithm: algorithm.to_string(),
                        expected,
                        actual: actual_hex.to_string(),
                    });
                }
                return Ok(());
            }
        }
        Ok(())
    }
}
