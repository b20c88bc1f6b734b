//! Maven 2 layout: `group/with/slashes/artifact/version/artifact-version[-classifier].ext`.

use crate::coordinate::{ArtifactCoordinate, MavenCoordinate};
use crate::layout::{LayoutProvider, MAVEN2_ALIAS};

/// File name of the versioning metadata document maintained by this layout.
pub const METADATA_FILE_NAME: &str = "maven-metadata.json";

/// The Maven 2 repository layout.
pub struct Maven2LayoutProvider;

impl LayoutProvider for Maven2LayoutProvider {
    fn alias(&self) -> &'static str {
        MAVEN2_ALIAS
    }

    fn to_relative_path(&self, coordinate: &ArtifactCoordinate) -> crate::Result<String> {
        let ArtifactCoordinate::Maven(c) = coordinate else {
            return Err(crate::Error::UnsupportedCoordinateShape(format!(
                "maven2 layout cannot map coordinate: {coordinate}"
            )));
        };
        if c.group_id.is_empty() || c.artifact_id.is_empty() || c.version.is_empty() {
            return Err(crate::Error::UnsupportedCoordinateShape(c.to_string()));
        }
        Ok(format!(
            "{}/{}/{}/{}",
            c.group_id.replace('.', "/"),
            c.artifact_id,
            c.version,
            c.file_name()
        ))
    }

    fn to_coordinate(&self, path: &str) -> crate::Result<ArtifactCoordinate> {
        let invalid = || crate::Error::NotAValidArtifactPath(path.to_string());

        let segments: Vec<&str> = path.split('/').collect();
        // group (one or more segments) / artifact / version / file
        if segments.len() < 4 || segments.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }

        let file_name = segments[segments.len() - 1];
        let version = segments[segments.len() - 2];
        let artifact_id = segments[segments.len() - 3];
        let group_id = segments[..segments.len() - 3].join(".");

        if file_name == METADATA_FILE_NAME || self.is_checksum_path(file_name) {
            return Err(invalid());
        }

        // file = artifact-version[-classifier].extension
        let stem = format!("{artifact_id}-{version}");
        let rest = file_name.strip_prefix(stem.as_str()).ok_or_else(invalid)?;

        let (classifier, extension) = if let Some(rest) = rest.strip_prefix('.') {
            (None, rest)
        } else if let Some(rest) = rest.strip_prefix('-') {
            let (classifier, extension) = rest.split_once('.').ok_or_else(invalid)?;
            if classifier.is_empty() {
                return Err(invalid());
            }
            (Some(classifier), extension)
        } else {
            return Err(invalid());
        };

        if extension.is_empty() {
            return Err(invalid());
        }

        let mut coordinate = MavenCoordinate::new(group_id, artifact_id, version, extension);
        if let Some(classifier) = classifier {
            coordinate = coordinate.with_classifier(classifier);
        }
        Ok(ArtifactCoordinate::Maven(coordinate))
    }

    fn is_metadata_path(&self, path: &str) -> bool {
        path.rsplit('/').next() == Some(METADATA_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> &'static dyn LayoutProvider {
        &Maven2LayoutProvider
    }

    #[test]
    fn test_to_relative_path() {
        let c = ArtifactCoordinate::Maven(MavenCoordinate::new("org.example", "widget", "1.0", "jar"));
        assert_eq!(
            provider().to_relative_path(&c).unwrap(),
            "org/example/widget/1.0/widget-1.0.jar"
        );
    }

    #[test]
    fn test_round_trip_law() {
        let coordinates = [
            MavenCoordinate::new("org.example", "widget", "1.0", "jar"),
            MavenCoordinate::new("org.example", "widget", "1.0", "pom"),
            MavenCoordinate::new("org.example.deep.group", "widget", "2.0-SNAPSHOT", "jar"),
            MavenCoordinate::new("org.example", "widget", "1.0", "jar").with_classifier("sources"),
            MavenCoordinate::new("io.depot", "maven-depot-plugin", "0.3.1", "jar"),
        ];
        for c in coordinates {
            let coordinate = ArtifactCoordinate::Maven(c);
            let path = provider().to_relative_path(&coordinate).unwrap();
            let parsed = provider().to_coordinate(&path).unwrap();
            assert_eq!(parsed, coordinate, "round trip failed for {path}");
        }
    }

    #[test]
    fn test_rejects_non_artifact_paths() {
        assert!(provider().to_coordinate("too/short.jar").is_err());
        assert!(provider()
            .to_coordinate("org/example/widget/1.0/other-1.0.jar")
            .is_err());
        assert!(provider()
            .to_coordinate("org/example/widget/1.0/maven-metadata.json")
            .is_err());
        assert!(provider()
            .to_coordinate("org/example/widget/1.0/widget-1.0.jar.sha1")
            .is_err());
        assert!(provider().to_coordinate("org//widget/1.0/widget-1.0.jar").is_err());
    }

    #[test]
    fn test_rejects_foreign_coordinate() {
        let raw = ArtifactCoordinate::Raw(crate::coordinate::RawCoordinate::new("some/file.txt"));
        assert!(matches!(
            provider().to_relative_path(&raw),
            Err(crate::Error::UnsupportedCoordinateShape(_))
        ));
    }

    #[test]
    fn test_metadata_and_checksum_paths() {
        assert!(provider().is_metadata_path("org/example/widget/maven-metadata.json"));
        assert!(!provider().is_metadata_path("org/example/widget/1.0/widget-1.0.jar"));
        assert!(provider().is_checksum_path("org/example/widget/1.0/widget-1.0.jar.md5"));
    }
}
