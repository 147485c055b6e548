//! Pack data model: manifests, installed packs and catalog parsing.
//!
//! A pack is a self-contained archive of map tiles for a bounded region
//! and zoom range. This module provides the pure data types shared across
//! the engine:
//!
//! - **PackManifest**: immutable description of a pack (catalog or
//!   installed), its geometry and its declared dependencies
//! - **InstalledPack**: extends `PackManifest` with on-device context
//!   (path, attribution) via composition
//! - **Catalog parsing**: JSON catalog document parse/serialize with
//!   structural validation
//!
//! # Type Hierarchy
//!
//! ```text
//! PackManifest (base)               InstalledPack (composition)
//! ├── pack_id: String               ├── manifest: PackManifest  ←── contains
//! ├── depends_on: Vec<String>       ├── path: PathBuf
//! ├── bounds, zoom range, ...       └── attribution: Option<String>
//! └── sha256 / signature / sig_alg
//! ```
//!
//! `InstalledPack` uses composition rather than inheritance; its `Deref`
//! impl allows transparent access to manifest fields.

mod catalog;
mod installed;
mod manifest;

pub use catalog::{parse_catalog, serialize_catalog, CatalogError};
pub use installed::InstalledPack;
pub use manifest::{PackKind, PackManifest, KIND_TABLE};
