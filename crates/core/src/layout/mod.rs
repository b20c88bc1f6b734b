//! Layout providers: coordinate <-> relative path mapping, pluggable by alias.
//!
//! The engine never special-cases a layout by name outside this boundary;
//! everything it needs is expressed through the [`LayoutProvider`] contract.

pub mod maven;
pub mod raw;

use crate::coordinate::ArtifactCoordinate;

pub use maven::Maven2LayoutProvider;
pub use raw::RawLayoutProvider;

/// Alias for the Maven 2 layout.
pub const MAVEN2_ALIAS: &str = "maven2";

/// Alias for the raw (path-is-coordinate) layout.
pub const RAW_ALIAS: &str = "raw";

/// Coordinate <-> path mapping for one content layout.
///
/// Implementations are stateless and pure: the same input always maps to the
/// same output, and `to_coordinate(to_relative_path(c)) == c` for every
/// coordinate the provider accepts.
pub trait LayoutProvider: Send + Sync {
    /// The alias stored on repositories using this layout.
    fn alias(&self) -> &'static str;

    /// Convert a coordinate to a repository-relative path.
    ///
    /// Fails with `UnsupportedCoordinateShape` when the coordinate does not
    /// belong to this layout.
    fn to_relative_path(&self, coordinate: &ArtifactCoordinate) -> crate::Result<String>;

    /// Parse a repository-relative path back into a coordinate.
    ///
    /// Fails with `NotAValidArtifactPath` when the path does not name an
    /// artifact in this layout.
    fn to_coordinate(&self, path: &str) -> crate::Result<ArtifactCoordinate>;

    /// Whether `path` names a layout metadata document rather than an artifact.
    fn is_metadata_path(&self, path: &str) -> bool;

    /// Whether `path` names a checksum sidecar file.
    fn is_checksum_path(&self, path: &str) -> bool {
        crate::checksum::ChecksumAlgorithm::is_checksum_path(path)
    }
}

static MAVEN2: Maven2LayoutProvider = Maven2LayoutProvider;
static RAW: RawLayoutProvider = RawLayoutProvider;

/// Look up the layout provider registered under `alias`.
pub fn layout_provider(alias: &str) -> crate::Result<&'static dyn LayoutProvider> {
    match alias {
        MAVEN2_ALIAS => Ok(&MAVEN2),
        RAW_ALIAS => Ok(&RAW),
        other => Err(crate::Error::UnknownLayout(other.to_string())),
    }
}
