//! Per-pack tile reader lane.
//!
//! Each open pack gets exactly one reader lane: a dedicated worker thread
//! owning a single database connection, fed by a FIFO channel. Reads on
//! one pack are serialized; reads across packs proceed concurrently.
//!
//! The connection is opened lazily on the first read and closed exactly
//! once when the lane shuts down. Shutdown is itself a queued message, so
//! every read submitted before it drains normally before the connection
//! closes — a pack is never yanked out from under an in-flight read.
//!
//! # Architecture
//!
//! ```text
//! read_tile() ──► mpsc (FIFO) ──► worker thread ──► rusqlite connection
//!      ▲                              │
//!      └────── oneshot reply ◄────────┘
//! ```

use std::path::{Path, PathBuf};
use std::thread;

use bytes::Bytes;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::coord::flipped_row;

use super::error::{StoreError, StoreResult};

/// Queue depth per lane. Reads beyond this apply backpressure to the
/// caller rather than growing without bound.
const LANE_CHANNEL_CAPACITY: usize = 64;

enum LaneRequest {
    Read {
        zoom: u8,
        x: u32,
        y: u32,
        reply: oneshot::Sender<StoreResult<Option<Bytes>>>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

/// Handle to a pack's reader lane.
///
/// Cheap to clone; all clones feed the same worker. Dropping every clone
/// without calling [`TileLane::close`] also shuts the worker down (the
/// channel closes), but `close` is the path that lets a caller wait for
/// the drain to finish.
#[derive(Clone)]
pub struct TileLane {
    pack_id: String,
    tx: mpsc::Sender<LaneRequest>,
}

impl TileLane {
    /// Spawn the worker for a pack database.
    ///
    /// The database is not touched until the first read arrives.
    pub fn open(pack_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let pack_id = pack_id.into();
        let path = path.into();
        let (tx, rx) = mpsc::channel(LANE_CHANNEL_CAPACITY);

        let worker_id = pack_id.clone();
        thread::Builder::new()
            .name(format!("tile-lane-{pack_id}"))
            .spawn(move || lane_worker(worker_id, path, rx))
            .expect("failed to spawn tile lane thread");

        Self { pack_id, tx }
    }

    /// Read one tile, waiting for the lane worker's reply.
    ///
    /// Returns `Ok(None)` for a tile that simply is not in the pack;
    /// only storage-level failures surface as errors.
    pub async fn read_tile(&self, zoom: u8, x: u32, y: u32) -> StoreResult<Option<Bytes>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(LaneRequest::Read { zoom, x, y, reply })
            .await
            .map_err(|_| StoreError::LaneClosed(self.pack_id.clone()))?;
        response
            .await
            .map_err(|_| StoreError::LaneClosed(self.pack_id.clone()))?
    }

    /// Shut the lane down after draining queued reads.
    ///
    /// Completes once the worker has served everything submitted before
    /// the close and released its connection.
    pub async fn close(&self) {
        let (done, finished) = oneshot::channel();
        if self.tx.send(LaneRequest::Close { done }).await.is_ok() {
            // Worker gone already counts as closed.
            let _ = finished.await;
        }
    }
}

/// Lane worker: serves requests in order, owning the connection.
fn lane_worker(pack_id: String, path: PathBuf, mut rx: mpsc::Receiver<LaneRequest>) {
    let mut connection: Option<Connection> = None;

    while let Some(request) = rx.blocking_recv() {
        match request {
            LaneRequest::Read { zoom, x, y, reply } => {
                let result = read_from(&mut connection, &path, zoom, x, y);
                // A dropped receiver means the caller gave up; nothing to do.
                let _ = reply.send(result);
            }
            LaneRequest::Close { done } => {
                let _ = done.send(());
                break;
            }
        }
    }

    if connection.take().is_some() {
        debug!(pack_id = %pack_id, "closed tile database connection");
    }
}

fn read_from(
    connection: &mut Option<Connection>,
    path: &Path,
    zoom: u8,
    x: u32,
    y: u32,
) -> StoreResult<Option<Bytes>> {
    if connection.is_none() {
        let opened = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "opened tile database");
        *connection = Some(opened);
    }
    let conn = connection.as_ref().expect("connection opened above");

    // Tile databases store rows bottom-up; requests address them top-down.
    let row = flipped_row(zoom, y);

    let result = conn
        .query_row(
            "SELECT tile_data FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
            rusqlite::params![zoom, x, row],
            |r| r.get::<_, Vec<u8>>(0),
        )
        .optional();

    match result {
        Ok(Some(data)) => Ok(Some(Bytes::from(data))),
        Ok(None) => Ok(None),
        Err(e) => {
            warn!(path = %path.display(), zoom, x, y, error = %e, "tile query failed");
            Err(StoreError::TileQuery {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }
}
