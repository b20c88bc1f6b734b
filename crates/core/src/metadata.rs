//! Versioning metadata documents and their merge rules.
//!
//! The documents here are the layout-level aggregation maintained next to
//! deployed artifacts (version lists, latest/release pointers, snapshot
//! bookkeeping, plugin prefixes). Merging is pure; reading and writing the
//! documents with single-writer discipline is the storage engine's job.

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

/// Timestamp/buildNumber record of the most recent snapshot deploy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: String,
    pub build_number: u32,
}

/// One deployed snapshot file within a snapshot version, keyed by
/// classifier + extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    pub extension: String,
    /// The timestamped version value, e.g. `1.0-20260824.101500-3`.
    pub value: String,
    pub updated: String,
}

/// A registered build-tool plugin prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub prefix: String,
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Version bookkeeping shared by artifact-level and version-level documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshot_versions: Vec<SnapshotVersion>,
    #[serde(default)]
    pub last_updated: String,
}

/// A layout metadata document, scoped at artifact or version level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub group_id: String,
    pub artifact_id: String,
    /// Set on version-level documents only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub versioning: Versioning,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginEntry>,
}

/// Render a deploy timestamp in the compact metadata form.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year][month][day][hour][minute][second]");
    at.format(&format)
        .unwrap_or_else(|_| "00000000000000".to_string())
}

impl ArtifactMetadata {
    /// Create an empty artifact-level document.
    pub fn artifact_level(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            ..Self::default()
        }
    }

    /// Create an empty version-level document.
    pub fn version_level(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: Some(version.into()),
            ..Self::default()
        }
    }

    /// Artifact-level merge: record a deployed version.
    ///
    /// `latest` always moves to the deployed version; `release` moves only for
    /// non-snapshot deploys. Re-recording a known version does not duplicate
    /// the version list.
    pub fn record_version(&mut self, version: &str, is_snapshot: bool, at: OffsetDateTime) {
        if !self.versioning.versions.iter().any(|v| v == version) {
            self.versioning.versions.push(version.to_string());
        }
        self.versioning.latest = Some(version.to_string());
        if !is_snapshot {
            self.versioning.release = Some(version.to_string());
        }
        self.versioning.last_updated = format_timestamp(at);
    }

    /// Version-level merge: record one deployed snapshot file.
    ///
    /// The snapshot-version entry is replaced in place when an entry with the
    /// same classifier + extension already exists, so out-of-order or
    /// duplicate deploys of the same timestamp never duplicate entries.
    pub fn record_snapshot_deploy(
        &mut self,
        classifier: Option<&str>,
        extension: &str,
        snapshot: SnapshotRecord,
        at: OffsetDateTime,
    ) {
        let base_version = self
            .version
            .as_deref()
            .map(|v| v.strip_suffix("-SNAPSHOT").unwrap_or(v).to_string())
            .unwrap_or_default();
        let value = format!(
            "{}-{}-{}",
            base_version, snapshot.timestamp, snapshot.build_number
        );
        let updated = format_timestamp(at);

        let entry = SnapshotVersion {
            classifier: classifier.map(str::to_string),
            extension: extension.to_string(),
            value,
            updated,
        };

        match self
            .versioning
            .snapshot_versions
            .iter_mut()
            .find(|existing| {
                existing.classifier.as_deref() == classifier && existing.extension == extension
            }) {
            Some(existing) => *existing = entry,
            None => self.versioning.snapshot_versions.push(entry),
        }

        self.versioning.snapshot = Some(snapshot);
        self.versioning.last_updated = format_timestamp(at);
    }

    /// Plugin-level merge: register a prefix -> artifactId mapping.
    ///
    /// Idempotent by artifact id.
    pub fn register_plugin(&mut self, entry: PluginEntry) {
        match self
            .plugins
            .iter_mut()
            .find(|existing| existing.artifact_id == entry.artifact_id)
        {
            Some(existing) => *existing = entry,
            None => self.plugins.push(entry),
        }
    }

    /// Serialize to the on-disk document form.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Deserialize from the on-disk document form.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

/// Derive the conventional plugin prefix from a plugin artifact id:
/// `maven-clean-plugin` and `clean-maven-plugin` both map to `clean`.
pub fn plugin_prefix(artifact_id: &str) -> String {
    artifact_id
        .strip_prefix("maven-")
        .and_then(|rest| rest.strip_suffix("-plugin"))
        .or_else(|| {
            artifact_id
                .strip_suffix("-maven-plugin")
                .filter(|prefix| !prefix.is_empty())
        })
        .unwrap_or(artifact_id)
        .to_string()
}
