//! Pack manifest: the immutable description of a map pack.
//!
//! A [`PackManifest`] describes a pack whether it comes from the remote
//! catalog or from the metadata embedded in an on-device pack database.
//! It is pure data; lifecycle behavior lives in the graph, integrity and
//! store modules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::{zoom_range_distance, LatLonBounds};

/// The closed set of pack kinds the engine dispatches over.
///
/// Each kind is handled by an explicit `match`; adding a kind means
/// extending this enum and the [`KIND_TABLE`] registration table.
///
/// - `Tiles` packs carry a raster tile database and are served by the
///   tile store's reader lanes.
/// - `Library` packs carry auxiliary data (search indexes, place names)
///   that other packs may depend on; they participate in the dependency
///   graph but are never rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackKind {
    /// Raster tile pack served by the tile store.
    #[default]
    Tiles,
    /// Non-renderable data pack other packs can depend on.
    Library,
}

/// Registration table mapping metadata strings to pack kinds.
pub const KIND_TABLE: &[(&str, PackKind)] = &[
    ("tiles", PackKind::Tiles),
    ("library", PackKind::Library),
];

impl PackKind {
    /// Look up a kind by its metadata name.
    ///
    /// Unknown names return `None`; callers decide whether to fall back
    /// to [`PackKind::Tiles`] or reject the pack.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        KIND_TABLE
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, kind)| *kind)
    }

    /// The metadata name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            PackKind::Tiles => "tiles",
            PackKind::Library => "library",
        }
    }
}

impl fmt::Display for PackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of a map pack.
///
/// Applies to both remote-catalog entries and installed packs. `pack_id`
/// is the canonical identity key everywhere in the engine; the on-disk
/// path of an installed pack is derived state owned by the tile store.
///
/// # Example
///
/// ```
/// use tilevault::pack::PackManifest;
///
/// let manifest = PackManifest::new("et-addis", "Addis Ababa", "2024.2")
///     .with_zoom_range(6, 15)
///     .with_depends_on(vec!["et-base".to_string()]);
///
/// assert_eq!(manifest.pack_id, "et-addis");
/// assert!(manifest.contains_zoom(12));
/// assert!(!manifest.is_self_contained());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackManifest {
    /// Stable identifier, unique within a catalog.
    pub pack_id: String,

    /// Human-readable pack name.
    pub name: String,

    /// Free-form version string (display and gating only, not semver).
    pub version: String,

    /// Pack kind (tiles or library data).
    #[serde(default)]
    pub kind: PackKind,

    /// Region code for catalog grouping (e.g. "addis-ababa").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,

    /// ISO country code for catalog grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    /// Raster format of stored tiles (e.g. "png", "jpg", "webp").
    #[serde(default = "default_tile_format")]
    pub tile_format: String,

    /// Minimum zoom level covered by the pack.
    pub min_zoom: u8,

    /// Maximum zoom level covered by the pack.
    pub max_zoom: u8,

    /// Geographic coverage; `None` means coverage is unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<LatLonBounds>,

    /// Installed size in bytes (display only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Compressed download size in bytes (display only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_size_bytes: Option<u64>,

    /// Pack ids this pack requires to be installed and activatable.
    ///
    /// Empty for a self-contained pack. Order is preserved as declared.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// SHA-256 of the pack archive, lowercase hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    /// Publisher signature over the archive hash, lowercase hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Signature algorithm tag (currently only "ed25519" is recognized).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig_alg: Option<String>,

    /// Catalog presentation hint: featured placement.
    #[serde(default)]
    pub is_featured: bool,

    /// Catalog presentation hint: sort order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,

    /// Minimum app version required to install this pack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_app_version: Option<String>,

    /// Download location of the pack archive (catalog entries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
}

fn default_tile_format() -> String {
    "png".to_string()
}

impl PackManifest {
    /// Create a minimal manifest with the given identity.
    ///
    /// Defaults: tiles kind, png format, zoom range 0..=0, no bounds, no
    /// dependencies, no integrity metadata.
    pub fn new(
        pack_id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            pack_id: pack_id.into(),
            name: name.into(),
            version: version.into(),
            kind: PackKind::Tiles,
            region_code: None,
            country_code: None,
            tile_format: default_tile_format(),
            min_zoom: 0,
            max_zoom: 0,
            bounds: None,
            size_bytes: None,
            download_size_bytes: None,
            depends_on: Vec::new(),
            sha256: None,
            signature: None,
            sig_alg: None,
            is_featured: false,
            display_order: None,
            min_app_version: None,
            archive_url: None,
        }
    }

    /// Set the zoom range (builder pattern).
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Set the geographic bounds (builder pattern).
    pub fn with_bounds(mut self, bounds: LatLonBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Set the dependency list (builder pattern).
    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Set the pack kind (builder pattern).
    pub fn with_kind(mut self, kind: PackKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set integrity metadata (builder pattern).
    pub fn with_integrity(
        mut self,
        sha256: impl Into<String>,
        signature: Option<String>,
        sig_alg: Option<String>,
    ) -> Self {
        self.sha256 = Some(sha256.into());
        self.signature = signature;
        self.sig_alg = sig_alg;
        self
    }

    /// Set the archive download location (builder pattern).
    pub fn with_archive_url(mut self, url: impl Into<String>) -> Self {
        self.archive_url = Some(url.into());
        self
    }

    /// Check whether the pack has no declared dependencies.
    pub fn is_self_contained(&self) -> bool {
        self.depends_on.is_empty()
    }

    /// Check whether a zoom level falls inside the pack's range.
    #[inline]
    pub fn contains_zoom(&self, zoom: u8) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&zoom)
    }

    /// Distance from a zoom level to the pack's zoom range (0 if inside).
    #[inline]
    pub fn zoom_distance(&self, zoom: u8) -> u8 {
        zoom_range_distance(zoom, self.min_zoom, self.max_zoom)
    }

    /// Fraction of `region`'s area covered by this pack's bounds.
    ///
    /// Unknown bounds count as zero coverage.
    pub fn coverage_ratio(&self, region: &LatLonBounds) -> f64 {
        self.bounds
            .map(|bounds| bounds.coverage_of(region))
            .unwrap_or(0.0)
    }

    /// Check whether the manifest declares a content hash.
    pub fn has_hash(&self) -> bool {
        self.sha256.is_some()
    }

    /// Check whether the manifest declares a publisher signature.
    pub fn has_signature(&self) -> bool {
        self.sha256.is_some() && self.signature.is_some()
    }
}

impl fmt::Display for PackManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} v{})", self.pack_id, self.name, self.version)
    }
}
