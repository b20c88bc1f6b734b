//! Raw layout: the relative path is the coordinate.

use crate::coordinate::{ArtifactCoordinate, RawCoordinate};
use crate::layout::{LayoutProvider, RAW_ALIAS};

/// The raw repository layout.
pub struct RawLayoutProvider;

impl LayoutProvider for RawLayoutProvider {
    fn alias(&self) -> &'static str {
        RAW_ALIAS
    }

    fn to_relative_path(&self, coordinate: &ArtifactCoordinate) -> crate::Result<String> {
        let ArtifactCoordinate::Raw(c) = coordinate else {
            return Err(crate::Error::UnsupportedCoordinateShape(format!(
                "raw layout cannot map coordinate: {coordinate}"
            )));
        };
        if c.path.is_empty() || c.path.starts_with('/') {
            return Err(crate::Error::UnsupportedCoordinateShape(c.path.clone()));
        }
        Ok(c.path.clone())
    }

    fn to_coordinate(&self, path: &str) -> crate::Result<ArtifactCoordinate> {
        if path.is_empty() || path.starts_with('/') {
            return Err(crate::Error::NotAValidArtifactPath(path.to_string()));
        }
        Ok(ArtifactCoordinate::Raw(RawCoordinate::new(path)))
    }

    fn is_metadata_path(&self, _path: &str) -> bool {
        // The raw layout maintains no metadata documents.
        false
    }
}
