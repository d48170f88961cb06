//! Error types for match setup and state snapshots.
//!
//! Only setup and (de)serialization can fail. Turn resolution and planning
//! are total over the state: invalid orders are silently ignored.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the simulation core.
#[derive(Debug, Error)]
pub enum GameError {
    /// Map dimensions outside the supported grid.
    #[error("Invalid map dimensions {width}x{height} (max {max_width}x{max_height})")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// Largest supported width.
        max_width: usize,
        /// Largest supported height.
        max_height: usize,
    },

    /// Tile array does not match the map dimensions.
    #[error("Tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch {
        /// `width * height`.
        expected: usize,
        /// Number of tiles supplied.
        actual: usize,
    },

    /// Tile code not in the known set.
    #[error("Unknown tile code: {0}")]
    UnknownTileCode(i64),

    /// Roster is empty or larger than the unit capacity.
    #[error("Invalid roster size {size} (max {max})")]
    InvalidRosterSize {
        /// Number of roster entries.
        size: usize,
        /// Unit capacity.
        max: usize,
    },

    /// Two roster entries share an external id.
    #[error("Duplicate unit id: {0}")]
    DuplicateUnitId(u32),

    /// External unit id not present in the roster.
    #[error("Unknown unit id: {0}")]
    UnknownUnitId(u32),

    /// Starting placement rejected.
    #[error("Invalid placement for unit {unit} at ({x}, {y}): {reason}")]
    InvalidPlacement {
        /// External unit id.
        unit: u32,
        /// Column.
        x: i64,
        /// Row.
        y: i64,
        /// What was wrong with the cell.
        reason: &'static str,
    },

    /// Snapshot encode/decode failure.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
