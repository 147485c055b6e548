//! End-to-end pack lifecycle: resolve, install, activate, serve tiles,
//! delete — against real pack databases and an in-memory catalog client.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use semver::Version;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use tilevault::coord::LatLonBounds;
use tilevault::graph::activation_status;
use tilevault::installer::{
    BoxFuture, CatalogClient, ClientError, InstallError, PackInstaller,
};
use tilevault::integrity::{IntegrityError, IntegrityPolicy, IntegrityVerifier};
use tilevault::pack::PackManifest;
use tilevault::policy::{base_layer_mode, BaseLayerMode};
use tilevault::store::{PackRegistry, StoreError};

/// Serves catalog and archives from memory.
struct MemoryClient {
    catalog: Vec<PackManifest>,
    archives: HashMap<String, Bytes>,
}

impl CatalogClient for MemoryClient {
    fn fetch_catalog(&self) -> BoxFuture<'_, Result<Vec<PackManifest>, ClientError>> {
        Box::pin(async move { Ok(self.catalog.clone()) })
    }

    fn download<'a>(
        &'a self,
        manifest: &'a PackManifest,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<Bytes, ClientError>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            self.archives
                .get(&manifest.pack_id)
                .cloned()
                .ok_or_else(|| ClientError::DownloadFailed {
                    url: manifest.archive_url.clone().unwrap_or_default(),
                    reason: "archive not found".to_string(),
                })
        })
    }
}

/// Build a pack database file and return its raw bytes.
fn build_pack_archive(
    scratch: &Path,
    id: &str,
    deps: &[&str],
    zoom_range: (u8, u8),
    bounds: &str,
    tiles: &[(u8, u32, u32, &[u8])],
) -> Vec<u8> {
    let path = scratch.join(format!("{id}.build"));
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE metadata (name TEXT, value TEXT);
         CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);",
    )
    .unwrap();

    let minzoom = zoom_range.0.to_string();
    let maxzoom = zoom_range.1.to_string();
    let deps_value = deps.join(",");
    let mut metadata: Vec<(&str, &str)> = vec![
        ("id", id),
        ("name", id),
        ("version", "1.0"),
        ("minzoom", &minzoom),
        ("maxzoom", &maxzoom),
        ("bounds", bounds),
        ("attribution", "© Test Packs"),
    ];
    if !deps_value.is_empty() {
        metadata.push(("depends_on", &deps_value));
    }
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
    drop(conn);
    std::fs::read(&path).unwrap()
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

struct Fixture {
    catalog: Vec<PackManifest>,
    archives: HashMap<String, Bytes>,
}

/// Two-pack fixture: a country base pack and a city overlay depending on
/// it, with one tile each.
fn fixture(scratch: &Path) -> Fixture {
    // Stored row 28 == requested row 3 at zoom 5.
    let base_bytes = build_pack_archive(
        scratch,
        "et-base",
        &[],
        (0, 8),
        "33.0,3.0,48.0,15.0",
        &[(5, 3, 28, b"base-tile")],
    );
    // Stored row 4083 == requested row 12 at zoom 12.
    let addis_bytes = build_pack_archive(
        scratch,
        "et-addis",
        &["et-base"],
        (6, 15),
        "38.6,8.8,39.0,9.2",
        &[(12, 9, 4083, b"addis-tile")],
    );

    let catalog = vec![
        PackManifest::new("et-base", "Ethiopia Base", "1.0")
            .with_zoom_range(0, 8)
            .with_bounds(LatLonBounds::new(3.0, 33.0, 15.0, 48.0))
            .with_integrity(hex_digest(&base_bytes), None, None)
            .with_archive_url("mem://et-base"),
        PackManifest::new("et-addis", "Addis Ababa", "1.0")
            .with_zoom_range(6, 15)
            .with_bounds(LatLonBounds::new(8.8, 38.6, 9.2, 39.0))
            .with_depends_on(vec!["et-base".to_string()])
            .with_integrity(hex_digest(&addis_bytes), None, None)
            .with_archive_url("mem://et-addis"),
    ];

    let mut archives = HashMap::new();
    archives.insert("et-base".to_string(), Bytes::from(base_bytes));
    archives.insert("et-addis".to_string(), Bytes::from(addis_bytes));

    Fixture { catalog, archives }
}

fn installer_for(
    fixture: Fixture,
    registry: Arc<PackRegistry>,
) -> PackInstaller<MemoryClient> {
    let client = MemoryClient {
        catalog: fixture.catalog,
        archives: fixture.archives,
    };
    PackInstaller::new(
        client,
        registry,
        IntegrityVerifier::new(IntegrityPolicy::default()),
        Version::new(1, 0, 0),
    )
}

#[tokio::test]
async fn install_activate_read_delete_round_trip() {
    let scratch = TempDir::new().unwrap();
    let packs = TempDir::new().unwrap();
    let fx = fixture(scratch.path());
    let catalog = fx.catalog.clone();

    let registry = Arc::new(PackRegistry::open(packs.path()).unwrap());
    let installer = installer_for(fx, registry.clone());

    // Install the overlay; the base pack comes along first.
    let outcome = installer
        .install("et-addis", &catalog, CancellationToken::new(), None)
        .await
        .unwrap();
    assert!(outcome.is_success(), "failure: {:?}", outcome.failure);
    assert_eq!(outcome.installed, vec!["et-base", "et-addis"]);

    // Round trip: the freshly installed target is activatable.
    let installed = registry.installed_packs();
    let target = registry.get("et-addis").unwrap();
    let status = activation_status(&target, &installed);
    assert!(status.can_activate);
    let chain: Vec<&str> = status
        .activation_chain
        .iter()
        .map(|p| p.pack_id.as_str())
        .collect();
    assert_eq!(chain, vec!["et-base", "et-addis"]);

    // Tile serving, including the flipped-row convention.
    let tile = registry.read_tile("et-addis", 12, 9, 12).await.unwrap();
    assert_eq!(tile.as_deref(), Some(b"addis-tile".as_slice()));
    let base_tile = registry.read_tile("et-base", 5, 3, 3).await.unwrap();
    assert_eq!(base_tile.as_deref(), Some(b"base-tile".as_slice()));

    // Out-of-range zoom short-circuits to no tile.
    let none = registry.read_tile("et-addis", 2, 0, 0).await.unwrap();
    assert!(none.is_none());

    // Viewport fully inside the city pack prefers offline rendering.
    let viewport = LatLonBounds::new(8.9, 38.7, 9.1, 38.9);
    let (best, coverage) = registry.viewport_coverage(&viewport).unwrap();
    assert_eq!(best.pack_id, "et-addis");
    assert_eq!(
        base_layer_mode(true, false, Some(coverage)),
        BaseLayerMode::Offline
    );

    // The base pack is protected while the overlay needs it.
    let veto = registry.remove_pack("et-base").await;
    assert!(matches!(veto, Err(StoreError::BlockedByDependents { .. })));

    // Cascade removes the overlay first, then the base.
    let cascade = registry.remove_cascade("et-base").await.unwrap();
    assert!(cascade.is_complete());
    assert_eq!(cascade.removed, vec!["et-addis", "et-base"]);
    assert!(registry.is_empty());
    assert!(!packs.path().join("et-base.mbtiles").exists());

    registry.shutdown().await;
}

#[tokio::test]
async fn corrupted_dependency_keeps_partial_progress() {
    let scratch = TempDir::new().unwrap();
    let packs = TempDir::new().unwrap();
    let mut fx = fixture(scratch.path());
    let catalog = fx.catalog.clone();

    // The overlay download is corrupted in transit.
    fx.archives
        .insert("et-addis".to_string(), Bytes::from_static(b"garbage"));

    let registry = Arc::new(PackRegistry::open(packs.path()).unwrap());
    let installer = installer_for(fx, registry.clone());

    let outcome = installer
        .install("et-addis", &catalog, CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.installed, vec!["et-base"]);
    assert_eq!(outcome.remaining(), vec!["et-addis"]);
    let failure = outcome.failure.unwrap();
    assert_eq!(failure.pack_id, "et-addis");
    assert!(matches!(
        failure.error,
        InstallError::Integrity(IntegrityError::HashMismatch { .. })
    ));

    // The dependency that made it stays installed and usable.
    assert!(registry.get("et-base").is_some());
    assert!(registry.get("et-addis").is_none());
    // No half-written archive is left behind.
    assert!(!packs.path().join("et-addis.mbtiles.part").exists());
}

#[tokio::test]
async fn policy_blocked_install_is_distinguishable() {
    let scratch = TempDir::new().unwrap();
    let packs = TempDir::new().unwrap();
    let fx = fixture(scratch.path());
    let catalog = fx.catalog.clone();

    let registry = Arc::new(PackRegistry::open(packs.path()).unwrap());
    let client = MemoryClient {
        catalog: fx.catalog,
        archives: fx.archives,
    };
    let installer = PackInstaller::new(
        client,
        registry.clone(),
        IntegrityVerifier::new(IntegrityPolicy {
            require_signed_packs: true,
        }),
        Version::new(1, 0, 0),
    );

    let outcome = installer
        .install("et-base", &catalog, CancellationToken::new(), None)
        .await
        .unwrap();

    // Valid artifact, rejected by policy — not a corruption error.
    let failure = outcome.failure.unwrap();
    assert!(matches!(
        failure.error,
        InstallError::Integrity(IntegrityError::PolicyBlocked { .. })
    ));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn cancelled_install_leaves_registry_untouched() {
    let scratch = TempDir::new().unwrap();
    let packs = TempDir::new().unwrap();
    let fx = fixture(scratch.path());
    let catalog = fx.catalog.clone();

    let registry = Arc::new(PackRegistry::open(packs.path()).unwrap());
    let installer = installer_for(fx, registry.clone());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = installer
        .install("et-addis", &catalog, cancel, None)
        .await
        .unwrap();

    assert!(outcome.installed.is_empty());
    assert!(matches!(
        outcome.failure,
        Some(ref f) if matches!(f.error, InstallError::Cancelled)
    ));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn registry_survives_restart_and_stale_cache() {
    let scratch = TempDir::new().unwrap();
    let packs = TempDir::new().unwrap();
    let fx = fixture(scratch.path());
    let catalog = fx.catalog.clone();

    {
        let registry = Arc::new(PackRegistry::open(packs.path()).unwrap());
        let installer = installer_for(fx, registry.clone());
        let outcome = installer
            .install("et-addis", &catalog, CancellationToken::new(), None)
            .await
            .unwrap();
        assert!(outcome.is_success());
        registry.shutdown().await;
    }

    // Plain restart: the cache answers.
    let reopened = PackRegistry::open(packs.path()).unwrap();
    assert_eq!(reopened.len(), 2);
    assert!(reopened.activation_status("et-addis").unwrap().can_activate);

    // Restart with the cache gone: the archives themselves are the
    // source of truth.
    std::fs::remove_file(packs.path().join("registry.json")).unwrap();
    let rescanned = PackRegistry::open(packs.path()).unwrap();
    assert_eq!(rescanned.len(), 2);
    assert_eq!(
        rescanned.get("et-addis").unwrap().depends_on,
        vec!["et-base"]
    );
    let tile = rescanned.read_tile("et-base", 5, 3, 3).await.unwrap();
    assert_eq!(tile.as_deref(), Some(b"base-tile".as_slice()));
    rescanned.shutdown().await;
}

#[tokio::test]
async fn missing_dependency_reported_as_plan_data() {
    let scratch = TempDir::new().unwrap();
    let packs = TempDir::new().unwrap();
    let fx = fixture(scratch.path());

    // Catalog listing the overlay but not its base dependency.
    let catalog = vec![fx.catalog[1].clone()];

    let registry = Arc::new(PackRegistry::open(packs.path()).unwrap());
    let installer = installer_for(fx, registry.clone());

    let outcome = installer
        .install("et-addis", &catalog, CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(!outcome.plan.is_installable());
    assert_eq!(outcome.plan.missing_dependencies, vec!["et-base"]);
    assert!(outcome.installed.is_empty());
    assert!(outcome.failure.is_none());
    assert!(registry.is_empty());
}
