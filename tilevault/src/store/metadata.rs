//! Embedded pack manifest parsing.
//!
//! Every pack database carries its own manifest in a `metadata(name,
//! value)` table. The embedded manifest is authoritative for activation
//! and deletion graphs; the remote catalog's copy only drives install
//! planning before the file exists on disk.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::coord::LatLonBounds;
use crate::pack::{InstalledPack, PackKind, PackManifest};

use super::error::{StoreError, StoreResult};

/// Read the embedded manifest of a pack database into an
/// [`InstalledPack`].
///
/// Required metadata: `id`. Everything else falls back to a sane default
/// so packs from older publishers still register; malformed numeric
/// fields are rejected rather than guessed at.
pub fn read_installed_pack(path: &Path) -> StoreResult<InstalledPack> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| StoreError::OpenFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let metadata = read_metadata_table(&conn, path)?;
    let invalid = |reason: String| StoreError::InvalidPack {
        path: path.to_path_buf(),
        reason,
    };

    let pack_id = metadata
        .get("id")
        .cloned()
        .ok_or_else(|| invalid("missing 'id' metadata".to_string()))?;
    let name = metadata.get("name").cloned().unwrap_or_else(|| pack_id.clone());
    let version = metadata.get("version").cloned().unwrap_or_else(|| "0".to_string());

    let mut manifest = PackManifest::new(pack_id, name, version);

    if let Some(kind) = metadata.get("kind") {
        manifest.kind = PackKind::from_name(kind).unwrap_or_default();
    }
    if let Some(format) = metadata.get("format") {
        manifest.tile_format = format.clone();
    }
    manifest.region_code = metadata.get("region").cloned();
    manifest.country_code = metadata.get("country").cloned();
    manifest.min_app_version = metadata.get("min_app_version").cloned();

    manifest.min_zoom = parse_zoom(&metadata, "minzoom", &invalid)?;
    manifest.max_zoom = parse_zoom(&metadata, "maxzoom", &invalid)?;
    if manifest.min_zoom > manifest.max_zoom {
        return Err(invalid(format!(
            "minzoom {} exceeds maxzoom {}",
            manifest.min_zoom, manifest.max_zoom
        )));
    }

    if let Some(bounds) = metadata.get("bounds") {
        manifest.bounds =
            Some(parse_bounds(bounds).ok_or_else(|| invalid(format!("bad bounds '{bounds}'")))?);
    }

    if let Some(deps) = metadata.get("depends_on") {
        manifest.depends_on = deps
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    manifest.size_bytes = std::fs::metadata(path).map(|m| m.len()).ok();

    let mut installed = InstalledPack::new(manifest, path);
    installed.attribution = metadata.get("attribution").cloned();
    Ok(installed)
}

fn read_metadata_table(conn: &Connection, path: &Path) -> StoreResult<HashMap<String, String>> {
    let mut statement = conn
        .prepare("SELECT name, value FROM metadata")
        .map_err(|e| StoreError::InvalidPack {
            path: path.to_path_buf(),
            reason: format!("no metadata table: {e}"),
        })?;

    let rows = statement
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| StoreError::InvalidPack {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut metadata = HashMap::new();
    for row in rows {
        let (name, value) = row.map_err(|e| StoreError::InvalidPack {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        metadata.insert(name, value);
    }
    Ok(metadata)
}

fn parse_zoom(
    metadata: &HashMap<String, String>,
    key: &str,
    invalid: &impl Fn(String) -> StoreError,
) -> StoreResult<u8> {
    match metadata.get(key) {
        None => Ok(0),
        Some(value) => value
            .trim()
            .parse::<u8>()
            .map_err(|_| invalid(format!("bad {key} '{value}'"))),
    }
}

/// Parse the conventional `left,bottom,right,top` bounds string
/// (longitudes first).
fn parse_bounds(value: &str) -> Option<LatLonBounds> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    if parts.len() != 4 {
        return None;
    }
    let (min_lon, min_lat, max_lon, max_lat) = (parts[0], parts[1], parts[2], parts[3]);
    if min_lat > max_lat || min_lon > max_lon {
        return None;
    }
    Some(LatLonBounds::new(min_lat, min_lon, max_lat, max_lon))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Write a pack database with the given metadata and tiles, for tests
    /// across the store module.
    pub fn write_test_pack(
        path: &Path,
        metadata: &[(&str, &str)],
        tiles: &[(u8, u32, u32, &[u8])],
    ) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE metadata (name TEXT, value TEXT);
             CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);",
        )
        .unwrap();
        for (name, value) in metadata {
            conn.execute(
                "INSERT INTO metadata (name, value) VALUES (?1, ?2)",
                rusqlite::params![name, value],
            )
            .unwrap();
        }
        for (zoom, x, stored_row, data) in tiles {
            conn.execute(
                "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![zoom, x, stored_row, data],
            )
            .unwrap();
        }
    }
}
