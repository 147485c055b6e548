//! Installed pack type with on-device context.
//!
//! [`InstalledPack`] extends [`PackManifest`] with installation-specific
//! state using composition; the `Deref` impl gives transparent access to
//! the manifest fields.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use super::manifest::PackManifest;

/// A pack physically present on the device.
///
/// Contains a [`PackManifest`] (the one embedded in the pack database,
/// which is authoritative for activation and deletion graphs) plus the
/// on-disk location and attribution text.
///
/// `pack_id` remains the identity key; `path` is derived state owned by
/// the tile store and never used to distinguish two packs with the same
/// id.
///
/// # Example
///
/// ```
/// use tilevault::pack::{InstalledPack, PackManifest};
///
/// let manifest = PackManifest::new("et-base", "Ethiopia Base", "1.0");
/// let installed = InstalledPack::new(manifest, "/packs/et-base.mbtiles");
///
/// // Manifest fields are reachable through Deref.
/// assert_eq!(installed.pack_id, "et-base");
/// assert!(installed.attribution.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledPack {
    /// Embedded manifest (composition).
    pub manifest: PackManifest,

    /// Filesystem path of the pack's tile database.
    pub path: PathBuf,

    /// Attribution text embedded in the pack, if any.
    pub attribution: Option<String>,
}

impl InstalledPack {
    /// Create a new installed pack without attribution.
    pub fn new(manifest: PackManifest, path: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            path: path.into(),
            attribution: None,
        }
    }

    /// Set the attribution text (builder pattern).
    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    /// Path of the pack's tile database.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Deref to the manifest for convenient field access.
impl Deref for InstalledPack {
    type Target = PackManifest;

    fn deref(&self) -> &Self::Target {
        &self.manifest
    }
}

/// Drop the installation context, keeping the manifest.
impl From<InstalledPack> for PackManifest {
    fn from(installed: InstalledPack) -> Self {
        installed.manifest
    }
}

impl AsRef<PackManifest> for InstalledPack {
    fn as_ref(&self) -> &PackManifest {
        &self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> PackManifest {
        PackManifest::new("et-base", "Ethiopia Base", "1.0").with_zoom_range(0, 8)
    }

    #[test]
    fn test_installed_pack_new() {
        let installed = InstalledPack::new(manifest(), "/packs/et-base.mbtiles");

        assert_eq!(installed.manifest.pack_id, "et-base");
        assert_eq!(installed.path, PathBuf::from("/packs/et-base.mbtiles"));
        assert!(installed.attribution.is_none());
    }

    #[test]
    fn test_installed_pack_with_attribution() {
        let installed =
            InstalledPack::new(manifest(), "/p.mbtiles").with_attribution("© OpenStreetMap");
        assert_eq!(installed.attribution.as_deref(), Some("© OpenStreetMap"));
    }

    #[test]
    fn test_installed_pack_deref() {
        let installed = InstalledPack::new(manifest(), "/p.mbtiles");
        assert_eq!(installed.pack_id, "et-base");
        assert!(installed.contains_zoom(5));
    }

    #[test]
    fn test_installed_pack_into_manifest() {
        let installed = InstalledPack::new(manifest(), "/p.mbtiles");
        let m: PackManifest = installed.into();
        assert_eq!(m.pack_id, "et-base");
    }

    #[test]
    fn test_installed_pack_as_ref() {
        let installed = InstalledPack::new(manifest(), "/p.mbtiles");
        let m: &PackManifest = installed.as_ref();
        assert_eq!(m.name, "Ethiopia Base");
    }
}
