//! Checksum sidecar I/O and artifact integrity verification.
//!
//! Digests are computed incrementally by callers as bytes are streamed (see
//! `depot_core::MultiDigester`); this module persists them as one sidecar
//! file per algorithm and re-verifies artifacts against their sidecars.
//!
//! Ordering contract: the artifact file is written and flushed before any
//! sidecar referencing it becomes visible, so "sidecar exists" implies
//! "artifact exists and matches".

use crate::error::{StorageError, StorageResult};
use crate::fsutil;
use crate::paths::RepositoryPath;
use depot_core::{ChecksumSet, MultiDigester};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::instrument;

/// Read buffer size for re-hashing artifacts (64 KiB).
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Write one sidecar file per algorithm in `checksums`.
///
/// Sidecar content is the lowercase hex digest with no trailing metadata.
/// Each sidecar is written atomically.
#[instrument(skip(checksums), fields(path = %path))]
pub async fn write_sidecars(path: &RepositoryPath, checksums: &ChecksumSet) -> StorageResult<()> {
    for (algorithm, hex) in checksums.iter() {
        let sidecar = path.sidecar(algorithm);
        fsutil::write_atomic(sidecar.absolute(), hex.as_bytes()).await?;
    }
    Ok(())
}

/// Read every present sidecar of `path` into a checksum set.
pub async fn read_sidecars(path: &RepositoryPath) -> StorageResult<ChecksumSet> {
    let mut set = ChecksumSet::new();
    for (algorithm, sidecar) in path.sidecars() {
        match fs::read_to_string(sidecar.absolute()).await {
            Ok(content) => set.insert(algorithm, content.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }
    }
    Ok(set)
}

/// Remove every sidecar of `path` that exists.
pub async fn remove_sidecars(path: &RepositoryPath) -> StorageResult<()> {
    for (_, sidecar) in path.sidecars() {
        fsutil::remove_if_exists(sidecar.absolute()).await?;
    }
    Ok(())
}

/// Re-hash the artifact bytes on disk.
pub async fn compute_file(path: &RepositoryPath) -> StorageResult<ChecksumSet> {
    let mut file = fs::File::open(path.absolute()).await?;
    let mut digester = MultiDigester::all();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        digester.update(&buf[..n]);
    }
    Ok(digester.finalize())
}

/// Verify the artifact at `path` against its checksum sidecars.
///
/// A present sidecar that disagrees with a full re-hash is a corruption
/// error. Absent sidecars are not an error; an artifact with no sidecars
/// verifies vacuously.
#[instrument(fields(path = %path))]
pub async fn verify(path: &RepositoryPath) -> StorageResult<()> {
    let expected = read_sidecars(path).await?;
    if expected.is_empty() {
        return Ok(());
    }
    let actual = compute_file(path).await?;
    actual.verify_against(&expected).map_err(|e| match e {
        depot_core::Error::ChecksumMismatch {
            algorithm,
            expected,
            actual,
        } => StorageError::ChecksumMismatch {
            path: path.to_string(),
            algorithm,
            expected,
            actual,
        },
        other => StorageError::Core(other),
    })
}
