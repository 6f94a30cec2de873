//! Turns a parsed level definition into a road graph and initial state.
//!
//! The authored grid is wrapped in a one-cell ring of exit cells, so every
//! coordinate from the level file moves one step right and one step down.

use std::collections::HashMap;

use tracing::debug;

use crate::error::LevelError;
use crate::graph::{build_graph, RoadGraph};
use crate::paths::calculate_all_paths;
use crate::puzzle::{CellType, LevelConfig, Obstacle, Position};
use crate::state::GameState;

/// Offset applied to authored coordinates by the exit border
const BORDER_OFFSET: (i32, i32) = (1, 1);

/// A level ready to solve
#[derive(Debug, Clone)]
pub struct LoadedLevel {
    pub graph: RoadGraph,
    pub initial_state: GameState,
}

/// Load level data: add the exit border, build the graph and its path table,
/// and place vehicles and obstacles in bordered coordinates.
pub fn load_level(level: &LevelConfig) -> Result<LoadedLevel, LevelError> {
    let layout = &level.grid.layout;
    let width = level.grid.dimensions.width;
    let height = level.grid.dimensions.height;

    if layout.is_empty() || width == 0 {
        return Err(LevelError::EmptyLayout);
    }
    if layout.len() != height {
        return Err(LevelError::DimensionMismatch {
            width,
            height,
            rows: layout.len(),
        });
    }
    for (row, cells) in layout.iter().enumerate() {
        if cells.len() != width {
            return Err(LevelError::RaggedRow {
                row,
                expected: width,
                found: cells.len(),
            });
        }
    }

    let bordered = add_exit_border(layout);
    let mut graph = build_graph(width + 2, height + 2, &bordered);
    calculate_all_paths(&mut graph);

    let mut vehicles = Vec::with_capacity(level.vehicles.len());
    for vehicle in &level.vehicles {
        if vehicle.length == 0 {
            return Err(LevelError::ZeroLength(vehicle.id.clone()));
        }
        let mut placed = vehicle.clone();
        placed.position = vehicle.position.offset(BORDER_OFFSET);
        vehicles.push(placed);
    }

    let mut obstacles: HashMap<Position, Obstacle> = HashMap::new();
    for obstacle in &level.obstacles {
        let position = obstacle.position.offset(BORDER_OFFSET);
        if let Some(existing) = obstacles.get(&position) {
            return Err(LevelError::StackedObstacles {
                first: existing.id.clone(),
                second: obstacle.id.clone(),
                position: obstacle.position,
            });
        }
        obstacles.insert(
            position,
            Obstacle {
                position,
                ..obstacle.clone()
            },
        );
    }

    let initial_state = GameState::new(vehicles, obstacles.into_values())?;

    debug!(
        level = level.level_id.as_deref().unwrap_or("<unnamed>"),
        vehicles = initial_state.active_count(),
        "level loaded"
    );

    Ok(LoadedLevel {
        graph,
        initial_state,
    })
}

/// Surround the layout with exit cells
pub fn add_exit_border(layout: &[Vec<CellType>]) -> Vec<Vec<CellType>> {
    let width = layout.first().map_or(0, Vec::len);
    let mut bordered = Vec::with_capacity(layout.len() + 2);

    bordered.push(vec![CellType::Exit; width + 2]);
    for row in layout {
        let mut bordered_row = Vec::with_capacity(width + 2);
        bordered_row.push(CellType::Exit);
        bordered_row.extend_from_slice(row);
        bordered_row.push(CellType::Exit);
        bordered.push(bordered_row);
    }
    bordered.push(vec![CellType::Exit; width + 2]);

    bordered
}
