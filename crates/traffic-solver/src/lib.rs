//! Solver library for vehicle exit traffic puzzles.
//!
//! A level grid becomes a road graph whose nodes are split by facing. Every
//! (cell, orientation, movement rule) triple gets a precomputed exit path, and
//! a breadth-first search over which vehicle leaves next finds the shortest
//! exit order, or explains why the board is stuck.

pub mod error;
pub mod graph;
pub mod loader;
pub mod paths;
pub mod puzzle;
pub mod solver;
pub mod state;
pub mod validator;

// Re-export main types
pub use error::{LevelError, StateError};
pub use graph::{build_graph, Node, NodeId, RoadGraph};
pub use loader::{add_exit_border, load_level, LoadedLevel};
pub use paths::{calculate_all_paths, calculate_path, PathInfo, PathStatus, PathTable};
pub use puzzle::{
    CellType, Direction, LevelConfig, MovementRule, Obstacle, ObstacleType, Orientation, Position,
    Vehicle, VehicleType,
};
pub use solver::{
    solve, BlockedBy, BlockingDetail, Solver, SolverConfig, SolverResult, Termination,
};
pub use state::{GameState, StateFingerprint};
pub use validator::validate_initial_state;
