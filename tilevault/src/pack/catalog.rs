//! Remote catalog document parsing and validation.
//!
//! The catalog is a JSON document listing every pack a publisher offers.
//! The engine consumes only the manifest fields; transport and any extra
//! publisher fields are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::manifest::PackManifest;

/// Errors raised while parsing or validating a catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The document is not valid JSON or is missing required fields.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two entries share the same pack id.
    #[error("duplicate pack id in catalog: {0}")]
    DuplicatePackId(String),

    /// An entry has an empty pack id.
    #[error("catalog entry has an empty pack id")]
    EmptyPackId,

    /// An entry declares min_zoom greater than max_zoom.
    #[error("invalid zoom range for {pack_id}: {min_zoom} > {max_zoom}")]
    InvalidZoomRange {
        pack_id: String,
        min_zoom: u8,
        max_zoom: u8,
    },
}

/// Top-level catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogDocument {
    packs: Vec<PackManifest>,
}

/// Parse and validate a catalog document.
///
/// Validation enforces the manifest invariants the rest of the engine
/// relies on: non-empty unique pack ids and ordered zoom ranges.
/// Dependency references are deliberately not validated here; a
/// `depends_on` entry absent from the catalog surfaces later as a
/// missing dependency in the install plan.
pub fn parse_catalog(json: &str) -> Result<Vec<PackManifest>, CatalogError> {
    let document: CatalogDocument = serde_json::from_str(json)?;
    validate_catalog(&document.packs)?;
    Ok(document.packs)
}

/// Serialize manifests into a catalog document.
pub fn serialize_catalog(packs: &[PackManifest]) -> Result<String, CatalogError> {
    let document = CatalogDocument {
        packs: packs.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

fn validate_catalog(packs: &[PackManifest]) -> Result<(), CatalogError> {
    let mut seen = std::collections::HashSet::new();

    for pack in packs {
        if pack.pack_id.is_empty() {
            return Err(CatalogError::EmptyPackId);
        }
        if !seen.insert(pack.pack_id.as_str()) {
            return Err(CatalogError::DuplicatePackId(pack.pack_id.clone()));
        }
        if pack.min_zoom > pack.max_zoom {
            return Err(CatalogError::InvalidZoomRange {
                pack_id: pack.pack_id.clone(),
                min_zoom: pack.min_zoom,
                max_zoom: pack.max_zoom,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> String {
        r#"{
            "packs": [
                {
                    "pack_id": "et-base",
                    "name": "Ethiopia Base",
                    "version": "1.0",
                    "min_zoom": 0,
                    "max_zoom": 8,
                    "archive_url": "https://packs.example.com/et-base.mbtiles"
                },
                {
                    "pack_id": "et-addis",
                    "name": "Addis Ababa",
                    "version": "2024.2",
                    "min_zoom": 6,
                    "max_zoom": 15,
                    "depends_on": ["et-base"],
                    "bounds": {
                        "min_lat": 8.8, "min_lon": 38.6,
                        "max_lat": 9.2, "max_lon": 39.0
                    }
                }
            ]
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_catalog() {
        let packs = parse_catalog(&sample_catalog()).unwrap();
        assert_eq!(packs.len(), 2);
        assert_eq!(packs[0].pack_id, "et-base");
        assert_eq!(packs[1].depends_on, vec!["et-base"]);
        assert!(packs[1].bounds.is_some());
    }

    #[test]
    fn test_parse_catalog_invalid_json() {
        let result = parse_catalog("{not json");
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_parse_catalog_duplicate_id() {
        let json = r#"{"packs": [
            {"pack_id": "a", "name": "A", "version": "1", "min_zoom": 0, "max_zoom": 1},
            {"pack_id": "a", "name": "A again", "version": "2", "min_zoom": 0, "max_zoom": 1}
        ]}"#;
        let result = parse_catalog(json);
        assert!(matches!(result, Err(CatalogError::DuplicatePackId(id)) if id == "a"));
    }

    #[test]
    fn test_parse_catalog_empty_id() {
        let json = r#"{"packs": [
            {"pack_id": "", "name": "A", "version": "1", "min_zoom": 0, "max_zoom": 1}
        ]}"#;
        assert!(matches!(parse_catalog(json), Err(CatalogError::EmptyPackId)));
    }

    #[test]
    fn test_parse_catalog_inverted_zoom_range() {
        let json = r#"{"packs": [
            {"pack_id": "a", "name": "A", "version": "1", "min_zoom": 9, "max_zoom": 3}
        ]}"#;
        let result = parse_catalog(json);
        assert!(matches!(
            result,
            Err(CatalogError::InvalidZoomRange { min_zoom: 9, max_zoom: 3, .. })
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let packs = parse_catalog(&sample_catalog()).unwrap();
        let json = serialize_catalog(&packs).unwrap();
        let back = parse_catalog(&json).unwrap();
        assert_eq!(packs, back);
    }
}
