//! The remote repository seam used by proxy repositories.
//!
//! `HttpRemoteRepository` is the production implementation; tests substitute
//! an in-memory remote through the same trait.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use depot_core::{ChecksumAlgorithm, RemoteConfig};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// A boxed stream of bytes fetched from a remote repository.
pub type RemoteByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Read access to the remote side of a proxy repository.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Fetch an artifact by relative path.
    ///
    /// `Ok(None)` means the remote positively reports the artifact absent;
    /// unreachable remotes and non-success responses are `RemoteFetch` errors.
    async fn fetch(&self, relative_path: &str) -> StorageResult<Option<RemoteByteStream>>;

    /// Fetch a checksum the remote published for an artifact, if any.
    async fn fetch_checksum(
        &self,
        relative_path: &str,
        algorithm: ChecksumAlgorithm,
    ) -> StorageResult<Option<String>>;
}

/// HTTP implementation over `reqwest`, honoring the remote's configured
/// timeout for every call.
pub struct HttpRemoteRepository {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRemoteRepository {
    pub fn new(remote: &RemoteConfig) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(remote.timeout())
            .build()
            .map_err(|e| StorageError::RemoteFetch {
                url: remote.url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: remote.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, relative_path: &str) -> String {
        format!("{}/{}", self.base_url, relative_path)
    }

    async fn get(&self, url: &str) -> StorageResult<Option<reqwest::Response>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::RemoteFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StorageError::RemoteFetch {
                url: url.to_string(),
                reason: format!("unexpected status {}", response.status()),
            });
        }
        Ok(Some(response))
    }
}

#[async_trait]
impl RemoteRepository for HttpRemoteRepository {
    async fn fetch(&self, relative_path: &str) -> StorageResult<Option<RemoteByteStream>> {
        let url = self.url(relative_path);
        let Some(response) = self.get(&url).await? else {
            return Ok(None);
        };

        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| StorageError::RemoteFetch {
                url: url.clone(),
                reason: e.to_string(),
            })
        });
        Ok(Some(Box::pin(stream)))
    }

    async fn fetch_checksum(
        &self,
        relative_path: &str,
        algorithm: ChecksumAlgorithm,
    ) -> StorageResult<Option<String>> {
        let url = self.url(&format!("{relative_path}.{}", algorithm.extension()));
        let Some(response) = self.get(&url).await? else {
            return Ok(None);
        };
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::RemoteFetch {
                url,
                reason: e.to_string(),
            })?;
        // Some remotes publish "<hex>  <filename>"; keep the digest only.
        let hex = body.split_whitespace().next().unwrap_or("").to_lowercase();
        if hex.is_empty() {
            return Ok(None);
        }
        Ok(Some(hex))
    }
}
