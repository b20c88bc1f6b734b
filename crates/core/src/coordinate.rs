//! Artifact coordinate types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A layout-specific structured artifact identifier.
///
/// Coordinates are ephemeral, created per request, and only ever interpreted
/// by the layout provider matching the owning repository's layout alias.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum ArtifactCoordinate {
    Maven(MavenCoordinate),
    Raw(RawCoordinate),
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactCoordinate::Maven(c) => write!(f, "{c}"),
            ArtifactCoordinate::Raw(c) => write!(f, "{c}"),
        }
    }
}

/// Maven GAV coordinate: groupId:artifactId:version[:classifier]:extension.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl MavenCoordinate {
    /// Create a coordinate with no classifier.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
            extension: extension.into(),
        }
    }

    /// Attach a classifier.
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Whether this version is a snapshot version.
    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with("-SNAPSHOT")
    }

    /// The version without its `-SNAPSHOT` suffix, if any.
    pub fn base_version(&self) -> &str {
        self.version
            .strip_suffix("-SNAPSHOT")
            .unwrap_or(&self.version)
    }

    /// Parse a `g:a:v[:classifier]:extension` string.
    pub fn parse(gavce: &str) -> crate::Result<Self> {
        let parts: Vec<&str> = gavce.split(':').collect();
        let coordinate = match parts.as_slice() {
            [g, a, v] => Self::new(*g, *a, *v, "jar"),
            [g, a, v, e] => Self::new(*g, *a, *v, *e),
            [g, a, v, c, e] => Self::new(*g, *a, *v, *e).with_classifier(*c),
            _ => {
                return Err(crate::Error::UnsupportedCoordinateShape(gavce.to_string()));
            }
        };
        if coordinate.group_id.is_empty()
            || coordinate.artifact_id.is_empty()
            || coordinate.version.is_empty()
            || coordinate.extension.is_empty()
        {
            return Err(crate::Error::UnsupportedCoordinateShape(gavce.to_string()));
        }
        Ok(coordinate)
    }

    /// The artifact file name, e.g. `artifact-1.0-sources.jar`.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(classifier) => write!(
                f,
                "{}:{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.version, classifier, self.extension
            ),
            None => write!(
                f,
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.version, self.extension
            ),
        }
    }
}

/// Raw layout coordinate: the relative path itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawCoordinate {
    pub path: String,
}

impl RawCoordinate {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl fmt::Display for RawCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
