//! Error types for level loading and state transitions.
//!
//! Dead-end paths and unsolvable levels are ordinary results, not errors;
//! only malformed input and caller contract violations end up here.

use thiserror::Error;

use crate::puzzle::Position;

/// Malformed level data rejected by the loader
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("Grid layout is empty")]
    EmptyLayout,

    #[error("Grid dimensions {width}x{height} do not match layout {rows} rows")]
    DimensionMismatch {
        width: usize,
        height: usize,
        rows: usize,
    },

    #[error("Layout row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Vehicle {0} has length 0")]
    ZeroLength(String),

    #[error("Obstacles {first} and {second} share position {position}")]
    StackedObstacles {
        first: String,
        second: String,
        position: Position,
    },

    #[error(transparent)]
    State(#[from] StateError),
}

/// Puzzle state contract violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Vehicle {0} not in active vehicles")]
    VehicleNotActive(String),

    #[error("Vehicle id {0} is used more than once")]
    DuplicateVehicle(String),
}
