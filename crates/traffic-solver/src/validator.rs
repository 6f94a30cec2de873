//! Field-level checks on a loaded level before it is solved.

use std::collections::HashMap;

use crate::graph::RoadGraph;
use crate::puzzle::{CellType, Obstacle, Position, Vehicle};
use crate::state::GameState;

/// Validate the initial state of a level. An empty list means valid.
pub fn validate_initial_state(graph: &RoadGraph, state: &GameState) -> Vec<String> {
    let mut errors = Vec::new();

    for vehicle in state.active_vehicles() {
        errors.extend(validate_vehicle_placement(vehicle, graph));
    }

    errors.extend(check_vehicle_overlaps(state));

    for obstacle in state.obstacles() {
        errors.extend(validate_obstacle_placement(obstacle, graph));
    }

    for vehicle in state.active_vehicles() {
        errors.extend(validate_vehicle_path_exists(vehicle, graph));
    }

    errors
}

/// Every cell a vehicle covers must be a non-exit road cell it can face along
fn validate_vehicle_placement(vehicle: &Vehicle, graph: &RoadGraph) -> Vec<String> {
    let mut errors = Vec::new();

    for position in vehicle.occupied_cells() {
        let Some(node) = graph.node_at(position) else {
            errors.push(format!(
                "Vehicle {} occupies non-existent position {}",
                vehicle.id, position
            ));
            continue;
        };

        if !is_placeable(node.cell_type) {
            errors.push(format!(
                "Vehicle {} at {} is not on a road cell",
                vehicle.id, position
            ));
        } else if !node.cell_type.allows(vehicle.orientation) {
            errors.push(format!(
                "Vehicle {} orientation {} incompatible with {} at {}",
                vehicle.id,
                vehicle.orientation.as_str(),
                node.cell_type.as_str(),
                position
            ));
        }
    }

    errors
}

fn check_vehicle_overlaps(state: &GameState) -> Vec<String> {
    let mut errors = Vec::new();
    let mut claimed: HashMap<Position, &str> = HashMap::new();

    for vehicle in state.active_vehicles() {
        for position in vehicle.occupied_cells() {
            match claimed.get(&position) {
                Some(owner) => errors.push(format!(
                    "Vehicles {} and {} overlap at position {}",
                    owner, vehicle.id, position
                )),
                None => {
                    claimed.insert(position, &vehicle.id);
                }
            }
        }
    }

    errors
}

fn validate_obstacle_placement(obstacle: &Obstacle, graph: &RoadGraph) -> Vec<String> {
    match graph.node_at(obstacle.position) {
        None => vec![format!(
            "Obstacle {} at non-existent position {}",
            obstacle.id, obstacle.position
        )],
        Some(node) if !is_placeable(node.cell_type) => vec![format!(
            "Obstacle {} at {} is not on a road cell",
            obstacle.id, obstacle.position
        )],
        Some(_) => Vec::new(),
    }
}

/// The vehicle's own rule must lead off the board on an empty grid
fn validate_vehicle_path_exists(vehicle: &Vehicle, graph: &RoadGraph) -> Vec<String> {
    // Missing nodes are already reported by the placement check
    let Some(node) = graph.node_at(vehicle.position) else {
        return Vec::new();
    };

    match graph
        .paths()
        .get(node.id, vehicle.orientation, vehicle.movement_rule)
    {
        None => vec![format!(
            "No paths calculated for vehicle {} at {}",
            vehicle.id, vehicle.position
        )],
        Some(path) if !path.is_valid() => vec![format!(
            "Vehicle {} has no valid exit path with movement rule {} from current position",
            vehicle.id,
            vehicle.movement_rule.as_str()
        )],
        Some(_) => Vec::new(),
    }
}

fn is_placeable(cell_type: CellType) -> bool {
    cell_type.is_road() && !cell_type.is_exit()
}
