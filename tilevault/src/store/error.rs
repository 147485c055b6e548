//! Error types for the tile store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the registry and the tile-serving path.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open a pack's tile database.
    #[error("failed to open pack database {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// A tile query failed at the storage level.
    #[error("tile query failed for {path}: {reason}")]
    TileQuery { path: PathBuf, reason: String },

    /// The file is not a usable pack database.
    #[error("{path} is not a valid pack: {reason}")]
    InvalidPack { path: PathBuf, reason: String },

    /// Filesystem operation failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The pack is not in the installed set.
    #[error("pack not installed: {0}")]
    PackNotInstalled(String),

    /// The pack's reader lane has shut down.
    #[error("reader lane closed for pack {0}")]
    LaneClosed(String),

    /// Deletion refused: other installed packs depend on the target.
    #[error("pack {pack_id} cannot be deleted, required by: {}", dependents.join(", "))]
    BlockedByDependents {
        pack_id: String,
        dependents: Vec<String>,
    },

    /// A pack with this id is already registered.
    #[error("pack {pack_id} is already installed at {path}")]
    AlreadyInstalled { pack_id: String, path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_by_dependents_display() {
        let err = StoreError::BlockedByDependents {
            pack_id: "et-base".to_string(),
            dependents: vec!["et-addis".to_string(), "et-full".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("et-base"));
        assert!(msg.contains("et-addis, et-full"));
    }

    #[test]
    fn test_pack_not_installed_display() {
        let err = StoreError::PackNotInstalled("ghost".to_string());
        assert_eq!(err.to_string(), "pack not installed: ghost");
    }
}
