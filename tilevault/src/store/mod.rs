//! Tile store: the installed-pack registry and the concurrent tile
//! reader.
//!
//! The registry is the single shared mutable resource of the engine. All
//! mutation (register, remove, cascade) goes through its lock; queries
//! and tile reads run concurrently against immutable snapshots. Each
//! open pack file is served by one dedicated reader lane, so reads on a
//! pack are serialized while reads across packs proceed in parallel.
//!
//! # Architecture
//!
//! ```text
//!            ┌────────────────────────────────────────────┐
//!            │                PackRegistry                 │
//!  install ─►│  packs map (RwLock)     lanes (per pack)   │
//!  delete  ─►│  mutation lock          ┌──────────────┐   │
//!            │  registry.json cache    │ TileLane #1  │──► pack1.mbtiles
//!  read    ─►│  moka tile cache ──────►│ TileLane #2  │──► pack2.mbtiles
//!            │  broadcast events       └──────────────┘   │
//!            └────────────────────────────────────────────┘
//! ```
//!
//! Change notifications are explicit: subscribers receive [`PackEvent`]
//! values over a broadcast channel instead of observing ambient global
//! state.

mod error;
mod metadata;
mod metrics;
mod reader;
mod registry;

pub use error::{StoreError, StoreResult};
pub use metadata::read_installed_pack;
pub use metrics::{MetricsSnapshot, StoreMetrics};
pub use reader::TileLane;
pub use registry::{CascadeFailure, CascadeOutcome, PackRegistry};

/// Lifecycle notification published by the registry.
#[derive(Debug, Clone)]
pub enum PackEvent {
    /// A pack was registered (fresh install or upgrade).
    Installed {
        /// Id of the registered pack.
        pack_id: String,
    },
    /// A pack was removed from the device.
    Removed {
        /// Id of the removed pack.
        pack_id: String,
    },
    /// A pack's activation status flipped as a side effect of another
    /// pack being installed or removed.
    ActivationChanged {
        /// Id of the affected pack.
        pack_id: String,
        /// Whether the pack can be activated now.
        can_activate: bool,
    },
}
