//! Checksum algorithms, incremental digesting, and checksum sets.

use digest::DynDigest;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;

/// A checksum algorithm supported for artifact sidecar files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    /// All algorithms, in sidecar-extension order.
    pub const ALL: [ChecksumAlgorithm; 3] = [
        ChecksumAlgorithm::Md5,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Sha256,
    ];

    /// Sidecar file extension for this algorithm (without the leading dot).
    pub fn extension(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha256 => "sha256",
        }
    }

    /// Look up an algorithm by its sidecar extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "md5" => Some(ChecksumAlgorithm::Md5),
            "sha1" => Some(ChecksumAlgorithm::Sha1),
            "sha256" => Some(ChecksumAlgorithm::Sha256),
            _ => None,
        }
    }

    /// Whether `path` names a checksum sidecar for any supported algorithm.
    pub fn is_checksum_path(path: &str) -> bool {
        path.rsplit('.')
            .next()
            .is_some_and(|ext| Self::from_extension(ext).is_some())
    }

    fn new_digest(self) -> Box<dyn DynDigest + Send> {
        match self {
            ChecksumAlgorithm::Md5 => Box::new(Md5::default()),
            ChecksumAlgorithm::Sha1 => Box::new(Sha1::default()),
            ChecksumAlgorithm::Sha256 => Box::new(Sha256::default()),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Mapping from algorithm to lowercase hex digest for one artifact file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumSet(BTreeMap<ChecksumAlgorithm, String>);

impl ChecksumSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, algorithm: ChecksumAlgorithm, hex: String) {
        self.0.insert(algorithm, hex);
    }

    pub fn get(&self, algorithm: ChecksumAlgorithm) -> Option<&str> {
        self.0.get(&algorithm).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChecksumAlgorithm, &str)> {
        self.0.iter().map(|(alg, hex)| (*alg, hex.as_str()))
    }

    /// Verify another set against this one, algorithm by algorithm.
    ///
    /// Only algorithms present in both sets are compared. Returns the first
    /// mismatch as a `ChecksumMismatch` error.
    pub fn verify_against(&self, expected: &ChecksumSet) -> crate::Result<()> {
        for (algorithm, expected_hex) in expected.iter() {
            if let Some(actual_hex) = self.get(algorithm) {
                if actual_hex != expected_hex {
                    return Err(crate::Error::ChecksumMismatch {
                        algorithm: algorithm.to_string(),
                        expected: expected_hex.to_string(),
                        actual: actual_hex.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<(ChecksumAlgorithm, String)> for ChecksumSet {
    fn from_iter<I: IntoIterator<Item = (ChecksumAlgorithm, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Incremental digester computing several algorithms over one pass of bytes.
///
/// Digest computation happens as the bytes are streamed, never as a second
/// read of the artifact file.
pub struct MultiDigester {
    digests: Vec<(ChecksumAlgorithm, Box<dyn DynDigest + Send>)>,
}

impl MultiDigester {
    /// Create a digester for the given algorithms.
    pub fn new(algorithms: &[ChecksumAlgorithm]) -> Self {
        Self {
            digests: algorithms
                .iter()
                .map(|alg| (*alg, alg.new_digest()))
                .collect(),
        }
    }

    /// Digester over every supported algorithm.
    pub fn all() -> Self {
        Self::new(&ChecksumAlgorithm::ALL)
    }

    /// Update every digest with a chunk of data.
    pub fn update(&mut self, data: &[u8]) {
        for (_, digest) in &mut self.digests {
            digest.update(data);
        }
    }

    /// Finalize all digests into a checksum set of lowercase hex strings.
    pub fn finalize(self) -> ChecksumSet {
        self.digests
            .into_iter()
            .map(|(alg, digest)| {
                let bytes = digest.finalize();
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                (alg, hex)
            })
            .collect()
    }
}

impl fmt::Debug for MultiDigester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let algorithms: Vec<_> = self.digests.iter().map(|(alg, _)| *alg).collect();
        f.debug_struct("MultiDigester")
            .field("algorithms", &algorithms)
            .finish()
    }
}
