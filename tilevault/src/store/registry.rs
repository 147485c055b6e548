//! The installed-pack registry.
//!
//! `PackRegistry` owns the mapping from pack id to on-disk resources: it
//! enumerates pack files, caches their embedded manifests, answers
//! viewport lookups and serves tile reads through per-pack reader lanes.
//!
//! Concurrency model:
//!
//! - the installed-pack map is behind an `RwLock`; queries never block
//!   each other
//! - install and delete are mutually exclusive via one async mutex, so a
//!   delete can never race an install of the same pack
//! - tile reads bypass both locks once they hold a lane handle; deleting
//!   a pack drains its lane before the file is removed
//!
//! The on-disk cache (`registry.json`) only exists to avoid re-opening
//! every pack database at startup; the pack files themselves are the
//! source of truth and any stale cache entry is rebuilt from the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::coord::LatLonBounds;
use crate::graph::{self, ActivationStatus};
use crate::pack::{InstalledPack, PackKind, PackManifest};

use super::error::{StoreError, StoreResult};
use super::metadata::read_installed_pack;
use super::metrics::{MetricsSnapshot, StoreMetrics};
use super::reader::TileLane;
use super::PackEvent;

/// File name of the manifest cache inside the packs directory.
const REGISTRY_CACHE_FILE: &str = "registry.json";

/// Extension of pack database files.
const PACK_EXTENSION: &str = "mbtiles";

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// In-memory tile cache capacity in bytes.
const TILE_CACHE_MAX_BYTES: u64 = 64 * 1024 * 1024;

type TileKey = (String, u8, u32, u32);

/// Outcome of a cascading deletion.
///
/// Already-deleted packs stay deleted when a later step fails; the
/// outcome reports exactly how far the cascade got.
#[derive(Debug)]
pub struct CascadeOutcome {
    /// The pack the cascade was requested for.
    pub target_id: String,

    /// Packs actually removed, in removal order.
    pub removed: Vec<String>,

    /// The step that stopped the cascade, if any.
    pub failed: Option<CascadeFailure>,
}

impl CascadeOutcome {
    /// The cascade removed everything it planned to.
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// A cascade step that failed.
#[derive(Debug)]
pub struct CascadeFailure {
    /// Pack whose removal failed.
    pub pack_id: String,
    /// The storage error that stopped the cascade.
    pub error: StoreError,
}

#[derive(Serialize, Deserialize)]
struct CacheDocument {
    generated_at: i64,
    entries: Vec<CacheEntry>,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    manifest: PackManifest,
    path: PathBuf,
    attribution: Option<String>,
    file_size: u64,
    modified_secs: i64,
}

/// The installed-pack registry and tile store.
pub struct PackRegistry {
    packs_dir: PathBuf,
    packs: RwLock<HashMap<String, InstalledPack>>,
    lanes: DashMap<String, TileLane>,
    /// Serializes install/delete against each other; tile reads and
    /// queries never take it.
    mutation: Mutex<()>,
    tile_cache: moka::future::Cache<TileKey, Bytes>,
    events: broadcast::Sender<PackEvent>,
    metrics: Arc<StoreMetrics>,
}

impl PackRegistry {
    /// Open the registry over a packs directory, creating it if needed.
    ///
    /// Enumerates pack files, reusing cached manifests whose file size
    /// and mtime still match and re-reading everything else from the
    /// pack databases. Unreadable pack files are skipped with a warning,
    /// never deleted.
    pub fn open(packs_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let packs_dir = packs_dir.into();
        std::fs::create_dir_all(&packs_dir).map_err(|e| StoreError::Io {
            path: packs_dir.clone(),
            source: e,
        })?;

        let cached = load_cache(&packs_dir.join(REGISTRY_CACHE_FILE));
        let mut packs: HashMap<String, InstalledPack> = HashMap::new();

        for path in enumerate_pack_files(&packs_dir)? {
            let installed = match cached_entry_for(&cached, &path) {
                Some(installed) => installed,
                None => match read_installed_pack(&path) {
                    Ok(installed) => installed,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable pack file");
                        continue;
                    }
                },
            };

            if let Some(existing) = packs.get(&installed.pack_id) {
                warn!(
                    pack_id = %installed.pack_id,
                    kept = %existing.path.display(),
                    skipped = %path.display(),
                    "duplicate pack id on disk, keeping first"
                );
                continue;
            }
            packs.insert(installed.pack_id.clone(), installed);
        }

        info!(
            packs_dir = %packs_dir.display(),
            count = packs.len(),
            "opened pack registry"
        );

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let registry = Self {
            packs_dir,
            packs: RwLock::new(packs),
            lanes: DashMap::new(),
            mutation: Mutex::new(()),
            tile_cache: moka::future::Cache::builder()
                .max_capacity(TILE_CACHE_MAX_BYTES)
                .weigher(|_k: &TileKey, v: &Bytes| v.len().try_into().unwrap_or(u32::MAX))
                .support_invalidation_closures()
                .build(),
            events,
            metrics: Arc::new(StoreMetrics::new()),
        };
        registry.persist_cache();
        Ok(registry)
    }

    /// Directory holding the pack files.
    pub fn packs_dir(&self) -> &Path {
        &self.packs_dir
    }

    /// Canonical on-disk location for a pack id.
    pub fn pack_path(&self, pack_id: &str) -> PathBuf {
        self.packs_dir.join(format!("{pack_id}.{PACK_EXTENSION}"))
    }

    /// All installed packs, unordered.
    pub fn installed_packs(&self) -> Vec<InstalledPack> {
        self.packs.read().values().cloned().collect()
    }

    /// Ids of all installed packs.
    pub fn installed_ids(&self) -> std::collections::HashSet<String> {
        self.packs.read().keys().cloned().collect()
    }

    /// Look up one installed pack.
    pub fn get(&self, pack_id: &str) -> Option<InstalledPack> {
        self.packs.read().get(pack_id).cloned()
    }

    /// Number of installed packs.
    pub fn len(&self) -> usize {
        self.packs.read().len()
    }

    /// Whether no packs are installed.
    pub fn is_empty(&self) -> bool {
        self.packs.read().is_empty()
    }

    /// Activation status of an installed pack against the current set.
    pub fn activation_status(&self, pack_id: &str) -> Option<ActivationStatus> {
        let packs = self.packs.read();
        let target = packs.get(pack_id)?;
        let all: Vec<InstalledPack> = packs.values().cloned().collect();
        Some(graph::activation_status(target, &all))
    }

    /// Best tile pack for a point at a preferred zoom.
    ///
    /// Among tile packs whose bounds contain the point, prefers a pack
    /// whose zoom range brackets the preferred zoom, then the closest
    /// range, then the smallest covered area (the most specific pack).
    pub fn best_pack(&self, lat: f64, lon: f64, preferred_zoom: u8) -> Option<InstalledPack> {
        let packs = self.packs.read();
        packs
            .values()
            .filter(|p| p.kind == PackKind::Tiles)
            .filter(|p| p.bounds.is_some_and(|b| b.contains(lat, lon)))
            .min_by(|a, b| {
                let zoom_order = a
                    .zoom_distance(preferred_zoom)
                    .cmp(&b.zoom_distance(preferred_zoom));
                zoom_order.then_with(|| {
                    let area_a = a.bounds.map(|bb| bb.area()).unwrap_or(f64::MAX);
                    let area_b = b.bounds.map(|bb| bb.area()).unwrap_or(f64::MAX);
                    area_a
                        .partial_cmp(&area_b)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
            })
            .cloned()
    }

    /// Best coverage of a viewport among installed tile packs.
    ///
    /// Returns `None` when no pack covers any part of the region — the
    /// base-layer policy treats that as "no usable pack". Ties on
    /// coverage go to the smallest covered area (the most specific
    /// pack).
    pub fn viewport_coverage(&self, region: &LatLonBounds) -> Option<(InstalledPack, f64)> {
        let packs = self.packs.read();
        packs
            .values()
            .filter(|p| p.kind == PackKind::Tiles)
            .map(|p| (p, p.coverage_ratio(region)))
            .filter(|(_, coverage)| *coverage > 0.0)
            .max_by(|(pack_a, a), (pack_b, b)| {
                a.partial_cmp(b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        let area_a = pack_a.bounds.map(|bb| bb.area()).unwrap_or(f64::MAX);
                        let area_b = pack_b.bounds.map(|bb| bb.area()).unwrap_or(f64::MAX);
                        area_b
                            .partial_cmp(&area_a)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
            })
            .map(|(p, coverage)| (p.clone(), coverage))
    }

    /// Subscribe to pack lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<PackEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the tile-serving metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // -------------------------------------------------------------------
    // Tile serving
    // -------------------------------------------------------------------

    /// Read one tile from an installed pack.
    ///
    /// `Ok(None)` means the pack simply has no such tile (including any
    /// zoom outside the pack's range, which never touches storage);
    /// errors are storage-level failures only.
    pub async fn read_tile(
        &self,
        pack_id: &str,
        zoom: u8,
        x: u32,
        y: u32,
    ) -> StoreResult<Option<Bytes>> {
        self.metrics.record_read();

        let pack = self
            .get(pack_id)
            .ok_or_else(|| StoreError::PackNotInstalled(pack_id.to_string()))?;

        if pack.kind != PackKind::Tiles || !pack.contains_zoom(zoom) {
            self.metrics.record_miss();
            return Ok(None);
        }

        let key: TileKey = (pack.pack_id.clone(), zoom, x, y);
        if let Some(tile) = self.tile_cache.get(&key).await {
            self.metrics.record_hit();
            return Ok(Some(tile));
        }

        let lane = {
            let entry = self
                .lanes
                .entry(pack.pack_id.clone())
                .or_insert_with(|| TileLane::open(pack.pack_id.clone(), pack.path.clone()));
            entry.value().clone()
        };

        match lane.read_tile(zoom, x, y).await? {
            Some(tile) => {
                self.metrics.record_hit();
                self.tile_cache.insert(key, tile.clone()).await;
                Ok(Some(tile))
            }
            None => {
                self.metrics.record_miss();
                Ok(None)
            }
        }
    }

    /// Rendering-path read: storage failures degrade to "no tile".
    ///
    /// The failure is still logged and counted; the renderer just draws
    /// a blank tile instead of erroring the whole frame.
    pub async fn read_tile_or_none(&self, pack_id: &str, zoom: u8, x: u32, y: u32) -> Option<Bytes> {
        match self.read_tile(pack_id, zoom, x, y).await {
            Ok(tile) => tile,
            Err(e) => {
                self.metrics.record_error();
                warn!(pack_id, zoom, x, y, error = %e, "tile read degraded to no-tile");
                None
            }
        }
    }

    // -------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------

    /// Register a pack file that is already at its final location.
    ///
    /// Reads the embedded manifest (authoritative over any catalog copy)
    /// and publishes the change. Re-registering the same path replaces
    /// the entry, which is how upgrades land.
    pub async fn register_pack(&self, path: &Path) -> StoreResult<InstalledPack> {
        let _guard = self.mutation.lock().await;

        let installed = read_installed_pack(path)?;
        let before = self.activation_map();

        {
            let mut packs = self.packs.write();
            if let Some(existing) = packs.get(&installed.pack_id) {
                if existing.path != installed.path {
                    return Err(StoreError::AlreadyInstalled {
                        pack_id: installed.pack_id.clone(),
                        path: existing.path.clone(),
                    });
                }
            }
            packs.insert(installed.pack_id.clone(), installed.clone());
        }

        // A replaced pack must not serve tiles cached from the old file.
        self.drop_lane(&installed.pack_id).await;
        self.invalidate_pack_tiles(&installed.pack_id);
        self.persist_cache();

        info!(pack_id = %installed.pack_id, path = %path.display(), "registered pack");
        self.emit(PackEvent::Installed {
            pack_id: installed.pack_id.clone(),
        });
        self.emit_activation_changes(&before);
        Ok(installed)
    }

    /// Remove a single pack, refusing if any installed pack depends on it.
    pub async fn remove_pack(&self, pack_id: &str) -> StoreResult<()> {
        let _guard = self.mutation.lock().await;

        let all = self.installed_packs();
        let target = all
            .iter()
            .find(|p| p.pack_id == pack_id)
            .cloned()
            .ok_or_else(|| StoreError::PackNotInstalled(pack_id.to_string()))?;

        let plan = graph::deletion_plan(&target, &all);
        if !plan.can_delete {
            return Err(StoreError::BlockedByDependents {
                pack_id: pack_id.to_string(),
                dependents: plan
                    .blocking_dependents
                    .iter()
                    .map(|p| p.pack_id.clone())
                    .collect(),
            });
        }

        let before = self.activation_map();
        self.delete_one(&target).await?;
        self.persist_cache();

        info!(pack_id, "removed pack");
        self.emit(PackEvent::Removed {
            pack_id: pack_id.to_string(),
        });
        self.emit_activation_changes(&before);
        Ok(())
    }

    /// Remove a pack together with its full dependents closure.
    ///
    /// Packs are removed dependents-first, the target last. A failing
    /// step stops the cascade; earlier removals stay removed and the
    /// outcome reports exactly which packs went.
    pub async fn remove_cascade(&self, pack_id: &str) -> StoreResult<CascadeOutcome> {
        let _guard = self.mutation.lock().await;

        let all = self.installed_packs();
        let target = all
            .iter()
            .find(|p| p.pack_id == pack_id)
            .cloned()
            .ok_or_else(|| StoreError::PackNotInstalled(pack_id.to_string()))?;

        let plan = graph::cascade_deletion_plan(&target, &all);
        let before = self.activation_map();

        let mut removed = Vec::new();
        let mut failed = None;
        for pack in &plan.deletion_order {
            match self.delete_one(pack).await {
                Ok(()) => {
                    removed.push(pack.pack_id.clone());
                    self.emit(PackEvent::Removed {
                        pack_id: pack.pack_id.clone(),
                    });
                }
                Err(error) => {
                    warn!(pack_id = %pack.pack_id, error = %error, "cascade stopped");
                    failed = Some(CascadeFailure {
                        pack_id: pack.pack_id.clone(),
                        error,
                    });
                    break;
                }
            }
        }

        self.persist_cache();
        self.emit_activation_changes(&before);

        Ok(CascadeOutcome {
            target_id: pack_id.to_string(),
            removed,
            failed,
        })
    }

    /// Close every reader lane. Call before dropping the registry when
    /// reads may still be in flight.
    pub async fn shutdown(&self) {
        let lanes: Vec<TileLane> = self
            .lanes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.lanes.clear();
        for lane in lanes {
            lane.close().await;
        }
        debug!("pack registry shut down");
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    /// Remove one pack's file and map entry.
    ///
    /// The map entry goes first (no new reads), then the lane drains its
    /// in-flight reads, then the file is unlinked. If the unlink fails
    /// the entry is restored so the registry still matches the disk.
    async fn delete_one(&self, pack: &InstalledPack) -> StoreResult<()> {
        let previous = self.packs.write().remove(&pack.pack_id);
        self.drop_lane(&pack.pack_id).await;
        self.invalidate_pack_tiles(&pack.pack_id);

        match tokio::fs::remove_file(&pack.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                if let Some(previous) = previous {
                    self.packs
                        .write()
                        .insert(previous.pack_id.clone(), previous);
                }
                Err(StoreError::Io {
                    path: pack.path.clone(),
                    source: e,
                })
            }
        }
    }

    async fn drop_lane(&self, pack_id: &str) {
        if let Some((_, lane)) = self.lanes.remove(pack_id) {
            lane.close().await;
        }
    }

    fn invalidate_pack_tiles(&self, pack_id: &str) {
        let pack_id = pack_id.to_string();
        if let Err(e) = self
            .tile_cache
            .invalidate_entries_if(move |key, _| key.0 == pack_id)
        {
            warn!(error = %e, "failed to invalidate tile cache");
        }
    }

    fn activation_map(&self) -> HashMap<String, bool> {
        let all = self.installed_packs();
        all.iter()
            .map(|pack| {
                let status = graph::activation_status(pack, &all);
                (pack.pack_id.clone(), status.can_activate)
            })
            .collect()
    }

    /// Emit `ActivationChanged` for every pack whose activation flipped
    /// as a side effect of the mutation. The mutated pack itself is
    /// covered by its `Installed`/`Removed` event.
    fn emit_activation_changes(&self, before: &HashMap<String, bool>) {
        for (pack_id, can_activate) in self.activation_map() {
            if let Some(&previous) = before.get(&pack_id) {
                if previous != can_activate {
                    self.emit(PackEvent::ActivationChanged {
                        pack_id,
                        can_activate,
                    });
                }
            }
        }
    }

    fn emit(&self, event: PackEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Best-effort rewrite of the manifest cache.
    fn persist_cache(&self) {
        let entries: Vec<CacheEntry> = self
            .installed_packs()
            .into_iter()
            .filter_map(|pack| {
                let (file_size, modified_secs) = file_stamp(&pack.path)?;
                Some(CacheEntry {
                    manifest: pack.manifest,
                    path: pack.path,
                    attribution: pack.attribution,
                    file_size,
                    modified_secs,
                })
            })
            .collect();

        let document = CacheDocument {
            generated_at: Utc::now().timestamp(),
            entries,
        };
        let path = self.packs_dir.join(REGISTRY_CACHE_FILE);
        match serde_json::to_vec_pretty(&document) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(path = %path.display(), error = %e, "failed to write registry cache");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize registry cache"),
        }
    }
}

fn enumerate_pack_files(packs_dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(packs_dir).map_err(|e| StoreError::Io {
        path: packs_dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(PACK_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_cache(path: &Path) -> Vec<CacheEntry> {
    let Ok(json) = std::fs::read(path) else {
        return Vec::new();
    };
    match serde_json::from_slice::<CacheDocument>(&json) {
        Ok(document) => document.entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable registry cache");
            Vec::new()
        }
    }
}

/// Use a cached manifest only while the file looks untouched.
fn cached_entry_for(cached: &[CacheEntry], path: &Path) -> Option<InstalledPack> {
    let (file_size, modified_secs) = file_stamp(path)?;
    let entry = cached.iter().find(|e| e.path == path)?;
    if entry.file_size != file_size || entry.modified_secs != modified_secs {
        debug!(path = %path.display(), "registry cache entry stale, re-reading pack");
        return None;
    }
    let mut installed = InstalledPack::new(entry.manifest.clone(), path);
    installed.attribution = entry.attribution.clone();
    Some(installed)
}

fn file_stamp(path: &Path) -> Option<(u64, i64)> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified: DateTime<Utc> = metadata.modified().ok()?.into();
    Some((metadata.len(), modified.timestamp()))
}

#[cfg(test)]
mod tests {
    use super::super::metadata::test_support::write_test_pack;
    use super::*;
    use tempfile::TempDir;

    fn pack_metadata<'a>(id: &'a str, deps: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut metadata = vec![
            ("id", id),
            ("version", "1.0"),
            ("minzoom", "0"),
            ("maxzoom", "10"),
            ("bounds", "38.0,8.0,40.0,10.0"),
        ];
        if !deps.is_empty() {
            metadata.push(("depends_on", deps));
        }
        metadata
    }

    fn write_pack_file(dir: &Path, id: &str, deps: &str) -> PathBuf {
        let path = dir.join(format!("{id}.mbtiles"));
        write_test_pack(&path, &pack_metadata(id, deps), &[(5, 3, 28, b"tile")]);
        path
    }

    #[tokio::test]
    async fn test_open_scans_pack_files() {
        let temp = TempDir::new().unwrap();
        write_pack_file(temp.path(), "et-base", "");
        write_pack_file(temp.path(), "et-addis", "et-base");

        let registry = PackRegistry::open(temp.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("et-base").is_some());
        assert_eq!(
            registry.get("et-addis").unwrap().depends_on,
            vec!["et-base"]
        );
    }

    #[tokio::test]
    async fn test_open_skips_invalid_files_without_deleting() {
        let temp = TempDir::new().unwrap();
        write_pack_file(temp.path(), "good", "");
        let bad = temp.path().join("bad.mbtiles");
        std::fs::write(&bad, b"not a database").unwrap();

        let registry = PackRegistry::open(temp.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(bad.exists());
    }

    #[tokio::test]
    async fn test_reopen_uses_cache() {
        let temp = TempDir::new().unwrap();
        write_pack_file(temp.path(), "et-base", "");

        let registry = PackRegistry::open(temp.path()).unwrap();
        drop(registry);
        assert!(temp.path().join(REGISTRY_CACHE_FILE).exists());

        let reopened = PackRegistry::open(temp.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("et-base").unwrap().max_zoom, 10);
    }

    #[tokio::test]
    async fn test_register_pack_emits_event() {
        let temp = TempDir::new().unwrap();
        let registry = PackRegistry::open(temp.path()).unwrap();
        let mut events = registry.subscribe();

        let path = write_pack_file(temp.path(), "et-base", "");
        let installed = registry.register_pack(&path).await.unwrap();
        assert_eq!(installed.pack_id, "et-base");

        match events.recv().await.unwrap() {
            PackEvent::Installed { pack_id } => assert_eq!(pack_id, "et-base"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_activation_changes_emitted_when_dependency_arrives() {
        let temp = TempDir::new().unwrap();
        let registry = PackRegistry::open(temp.path()).unwrap();

        // Dependent first: not activatable.
        let addis = write_pack_file(temp.path(), "et-addis", "et-base");
        registry.register_pack(&addis).await.unwrap();
        let status = registry.activation_status("et-addis").unwrap();
        assert!(!status.can_activate);

        let mut events = registry.subscribe();
        let base = write_pack_file(temp.path(), "et-base", "");
        registry.register_pack(&base).await.unwrap();

        let mut saw_activation_change = false;
        while let Ok(event) = events.try_recv() {
            if let PackEvent::ActivationChanged {
                pack_id,
                can_activate,
            } = event
            {
                assert_eq!(pack_id, "et-addis");
                assert!(can_activate);
                saw_activation_change = true;
            }
        }
        assert!(saw_activation_change);
        assert!(registry.activation_status("et-addis").unwrap().can_activate);
    }

    #[tokio::test]
    async fn test_remove_pack_vetoed_by_dependent() {
        let temp = TempDir::new().unwrap();
        write_pack_file(temp.path(), "et-base", "");
        write_pack_file(temp.path(), "et-addis", "et-base");
        let registry = PackRegistry::open(temp.path()).unwrap();

        let result = registry.remove_pack("et-base").await;
        assert!(matches!(
            result,
            Err(StoreError::BlockedByDependents { .. })
        ));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_pack_deletes_file() {
        let temp = TempDir::new().unwrap();
        let path = write_pack_file(temp.path(), "et-base", "");
        let registry = PackRegistry::open(temp.path()).unwrap();

        registry.remove_pack("et-base").await.unwrap();
        assert!(!path.exists());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_cascade_order_and_outcome() {
        let temp = TempDir::new().unwrap();
        write_pack_file(temp.path(), "et-base", "");
        write_pack_file(temp.path(), "et-mid", "et-base");
        write_pack_file(temp.path(), "et-top", "et-mid");
        let registry = PackRegistry::open(temp.path()).unwrap();

        let outcome = registry.remove_cascade("et-base").await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.removed, vec!["et-top", "et-mid", "et-base"]);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_pack() {
        let temp = TempDir::new().unwrap();
        let registry = PackRegistry::open(temp.path()).unwrap();
        assert!(matches!(
            registry.remove_pack("ghost").await,
            Err(StoreError::PackNotInstalled(_))
        ));
    }

    #[tokio::test]
    async fn test_read_tile_round_trip() {
        let temp = TempDir::new().unwrap();
        write_pack_file(temp.path(), "et-base", "");
        let registry = PackRegistry::open(temp.path()).unwrap();

        // Stored row 28 at zoom 5 corresponds to requested row 3.
        let tile = registry.read_tile("et-base", 5, 3, 3).await.unwrap();
        assert_eq!(tile.as_deref(), Some(b"tile".as_slice()));

        // Cached second read.
        let again = registry.read_tile("et-base", 5, 3, 3).await.unwrap();
        assert!(again.is_some());

        let snapshot = registry.metrics();
        assert_eq!(snapshot.tile_reads, 2);
        assert_eq!(snapshot.tile_hits, 2);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_read_tile_out_of_zoom_range_short_circuits() {
        let temp = TempDir::new().unwrap();
        write_pack_file(temp.path(), "et-base", "");
        let registry = PackRegistry::open(temp.path()).unwrap();

        let tile = registry.read_tile("et-base", 18, 0, 0).await.unwrap();
        assert!(tile.is_none());
        // No lane was ever opened for the short-circuited read.
        assert!(registry.lanes.is_empty());
        assert_eq!(registry.metrics().tile_misses, 1);
    }

    #[tokio::test]
    async fn test_read_tile_unknown_pack() {
        let temp = TempDir::new().unwrap();
        let registry = PackRegistry::open(temp.path()).unwrap();
        let result = registry.read_tile("ghost", 5, 0, 0).await;
        assert!(matches!(result, Err(StoreError::PackNotInstalled(_))));
    }

    #[tokio::test]
    async fn test_read_tile_or_none_degrades() {
        let temp = TempDir::new().unwrap();
        let path = write_pack_file(temp.path(), "et-base", "");
        let registry = PackRegistry::open(temp.path()).unwrap();

        // Corrupt the file after registration to force a storage error.
        std::fs::write(&path, b"garbage").unwrap();
        let tile = registry.read_tile_or_none("et-base", 5, 3, 3).await;
        assert!(tile.is_none());
        assert_eq!(registry.metrics().read_errors, 1);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_best_pack_prefers_bracketing_zoom_then_specific_area() {
        let temp = TempDir::new().unwrap();
        let wide = temp.path().join("wide.mbtiles");
        write_test_pack(
            &wide,
            &[
                ("id", "wide"),
                ("minzoom", "0"),
                ("maxzoom", "8"),
                ("bounds", "30.0,0.0,50.0,20.0"),
            ],
            &[],
        );
        let city = temp.path().join("city.mbtiles");
        write_test_pack(
            &city,
            &[
                ("id", "city"),
                ("minzoom", "10"),
                ("maxzoom", "16"),
                ("bounds", "38.6,8.8,39.0,9.2"),
            ],
            &[],
        );
        let registry = PackRegistry::open(temp.path()).unwrap();

        // Zoom 12 is bracketed only by the city pack.
        assert_eq!(registry.best_pack(9.0, 38.8, 12).unwrap().pack_id, "city");
        // Zoom 4 is bracketed only by the wide pack.
        assert_eq!(registry.best_pack(9.0, 38.8, 4).unwrap().pack_id, "wide");
        // Outside every pack's bounds: nothing.
        assert!(registry.best_pack(40.0, 100.0, 12).is_none());
    }

    #[tokio::test]
    async fn test_viewport_coverage() {
        let temp = TempDir::new().unwrap();
        write_pack_file(temp.path(), "et-base", "");
        let registry = PackRegistry::open(temp.path()).unwrap();

        // Fully inside the pack's 38..40 x 8..10 bounds.
        let inside = LatLonBounds::new(8.5, 38.5, 9.5, 39.5);
        let (pack, coverage) = registry.viewport_coverage(&inside).unwrap();
        assert_eq!(pack.pack_id, "et-base");
        assert!((coverage - 1.0).abs() < 1e-9);

        // Disjoint viewport: no usable pack.
        let far = LatLonBounds::new(50.0, 50.0, 51.0, 51.0);
        assert!(registry.viewport_coverage(&far).is_none());
    }

    #[tokio::test]
    async fn test_library_pack_serves_no_tiles() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("places.mbtiles");
        write_test_pack(
            &path,
            &[("id", "places"), ("kind", "library"), ("maxzoom", "10")],
            &[(5, 0, 31, b"blob")],
        );
        let registry = PackRegistry::open(temp.path()).unwrap();

        let tile = registry.read_tile("places", 5, 0, 0).await.unwrap();
        assert!(tile.is_none());
        // Library packs never get a reader lane.
        assert!(registry.lanes.is_empty());
    }
}
