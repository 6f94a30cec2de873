//! Puzzle state: which vehicles are still on the board, where the obstacles
//! are, and the order in which vehicles have left.
//!
//! Vehicles never move once placed, a move removes a vehicle from the board.
//! The full vehicle list therefore lives in a shared, immutable fleet and a
//! state only records the indices still active. Obstacles are shared too and
//! copied only when a bulldozer actually clears one.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::StateError;
use crate::graph::{NodeId, RoadGraph};
use crate::puzzle::{Obstacle, Position, Vehicle};

#[derive(Debug)]
struct Fleet {
    vehicles: Vec<Vehicle>,
    by_id: HashMap<String, u32>,
}

/// What stops a vehicle on its path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker<'a> {
    Vehicle(&'a Vehicle),
    Obstacle(&'a Obstacle),
}

impl Blocker<'_> {
    pub fn id(&self) -> &str {
        match self {
            Blocker::Vehicle(vehicle) => &vehicle.id,
            Blocker::Obstacle(obstacle) => &obstacle.id,
        }
    }
}

/// Cell -> fleet index of the active vehicle covering it
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    cells: HashMap<Position, u32>,
}

/// Structural identity of a state for cycle detection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateFingerprint {
    vehicles: Vec<(u32, Position)>,
    obstacles: Vec<Position>,
}

/// A snapshot of the board during search
#[derive(Debug, Clone)]
pub struct GameState {
    fleet: Arc<Fleet>,
    // Sorted ascending, so iteration follows load order
    active: Vec<u32>,
    obstacles: Arc<BTreeMap<Position, Obstacle>>,
    exited: Vec<u32>,
    turn_number: u32,
}

impl GameState {
    /// Create the initial state. Obstacles are keyed by position; a later
    /// obstacle on the same cell replaces an earlier one.
    pub fn new(
        vehicles: Vec<Vehicle>,
        obstacles: impl IntoIterator<Item = Obstacle>,
    ) -> Result<Self, StateError> {
        let mut by_id = HashMap::with_capacity(vehicles.len());
        for (index, vehicle) in vehicles.iter().enumerate() {
            if by_id.insert(vehicle.id.clone(), index as u32).is_some() {
                return Err(StateError::DuplicateVehicle(vehicle.id.clone()));
            }
        }

        let active = (0..vehicles.len() as u32).collect();
        let obstacles = obstacles
            .into_iter()
            .map(|obstacle| (obstacle.position, obstacle))
            .collect();

        Ok(Self {
            fleet: Arc::new(Fleet { vehicles, by_id }),
            active,
            obstacles: Arc::new(obstacles),
            exited: Vec::new(),
            turn_number: 0,
        })
    }

    fn fleet_vehicle(&self, index: u32) -> &Vehicle {
        &self.fleet.vehicles[index as usize]
    }

    fn active_index(&self, vehicle_id: &str) -> Option<u32> {
        let index = *self.fleet.by_id.get(vehicle_id)?;
        self.active.binary_search(&index).ok().map(|_| index)
    }

    /// Active vehicles in load order
    pub fn active_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.active.iter().map(|&index| self.fleet_vehicle(index))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Look up an active vehicle
    pub fn vehicle(&self, vehicle_id: &str) -> Option<&Vehicle> {
        self.active_index(vehicle_id)
            .map(|index| self.fleet_vehicle(index))
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    pub fn obstacle_at(&self, position: Position) -> Option<&Obstacle> {
        self.obstacles.get(&position)
    }

    /// Exited vehicle ids, first exit first
    pub fn exited_vehicles(&self) -> impl Iterator<Item = &str> {
        self.exited
            .iter()
            .map(|&index| self.fleet_vehicle(index).id.as_str())
    }

    pub fn exit_order(&self) -> Vec<String> {
        self.exited_vehicles().map(str::to_string).collect()
    }

    pub fn moves_made(&self) -> usize {
        self.exited.len()
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// Check if all vehicles have exited
    pub fn is_solved(&self) -> bool {
        self.active.is_empty()
    }

    /// Map every cell covered by an active vehicle to that vehicle
    pub fn occupancy(&self) -> Occupancy {
        let mut cells = HashMap::new();
        for &index in &self.active {
            for cell in self.fleet_vehicle(index).occupied_cells() {
                cells.insert(cell, index);
            }
        }
        Occupancy { cells }
    }

    /// What, if anything, stops `vehicle` from entering `position`.
    /// Other vehicles are checked before obstacles.
    pub fn blocker_at(
        &self,
        position: Position,
        vehicle: &Vehicle,
        occupancy: &Occupancy,
    ) -> Option<Blocker<'_>> {
        if let Some(&index) = occupancy.cells.get(&position) {
            let occupant = self.fleet_vehicle(index);
            if occupant.id != vehicle.id {
                return Some(Blocker::Vehicle(occupant));
            }
        }

        self.obstacles
            .get(&position)
            .filter(|obstacle| obstacle.blocks_vehicle(vehicle.can_clear_obstacles()))
            .map(Blocker::Obstacle)
    }

    /// First blocking cell along a path, with what blocks it
    pub fn first_blocker(
        &self,
        vehicle: &Vehicle,
        path: &[NodeId],
        graph: &RoadGraph,
        occupancy: &Occupancy,
    ) -> Option<(Position, Blocker<'_>)> {
        path.iter().find_map(|&node| {
            let position = graph.position(node);
            self.blocker_at(position, vehicle, occupancy)
                .map(|blocker| (position, blocker))
        })
    }

    pub fn is_path_clear(&self, vehicle: &Vehicle, path: &[NodeId], graph: &RoadGraph) -> bool {
        self.first_blocker(vehicle, path, graph, &self.occupancy())
            .is_none()
    }

    /// New state with the vehicle gone. A bulldozer also removes every
    /// clearable obstacle lying on its path.
    pub fn apply_vehicle_exit(
        &self,
        vehicle_id: &str,
        path: &[NodeId],
        graph: &RoadGraph,
    ) -> Result<GameState, StateError> {
        let index = self
            .active_index(vehicle_id)
            .ok_or_else(|| StateError::VehicleNotActive(vehicle_id.to_string()))?;
        let vehicle = self.fleet_vehicle(index);

        let mut active = self.active.clone();
        active.retain(|&i| i != index);

        let mut exited = Vec::with_capacity(self.exited.len() + 1);
        exited.extend_from_slice(&self.exited);
        exited.push(index);

        let mut obstacles = Arc::clone(&self.obstacles);
        if vehicle.can_clear_obstacles() {
            let cleared: Vec<Position> = path
                .iter()
                .map(|&node| graph.position(node))
                .filter(|position| {
                    self.obstacles
                        .get(position)
                        .is_some_and(|obstacle| obstacle.obstacle_type.is_clearable())
                })
                .collect();
            if !cleared.is_empty() {
                let map = Arc::make_mut(&mut obstacles);
                for position in cleared {
                    map.remove(&position);
                }
            }
        }

        Ok(GameState {
            fleet: Arc::clone(&self.fleet),
            active,
            obstacles,
            exited,
            turn_number: self.turn_number + 1,
        })
    }

    /// Active (vehicle, head) pairs plus remaining clearable obstacles.
    /// Reserved obstacle kinds never change, so they are left out.
    pub fn fingerprint(&self) -> StateFingerprint {
        StateFingerprint {
            vehicles: self
                .active
                .iter()
                .map(|&index| (index, self.fleet_vehicle(index).position))
                .collect(),
            obstacles: self
                .obstacles
                .values()
                .filter(|obstacle| obstacle.obstacle_type.is_clearable())
                .map(|obstacle| obstacle.position)
                .collect(),
        }
    }
}
