//! Breadth-first solver over puzzle states.
//!
//! Each edge of the search removes one vehicle whose precomputed exit path is
//! currently unobstructed. BFS level equals the number of exits, so the first
//! solved state dequeued uses the fewest moves. When the frontier runs dry the
//! solver reports why the vehicles of the last dead end could not move.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::StateError;
use crate::graph::RoadGraph;
use crate::paths::{PathInfo, PathStatus};
use crate::puzzle::Vehicle;
use crate::state::{Blocker, GameState};

/// Configuration for the solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum number of states to dequeue before giving up
    pub max_states: usize,
    /// Maximum time to search
    pub timeout: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_states: 1_000_000,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Why the search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every vehicle left the board
    Solved,
    /// Frontier empty: no solution exists from the initial state
    Exhausted,
    /// Hit `max_states`
    StateLimit,
    /// Hit `timeout`
    Timeout,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Solved => "SOLVED",
            Termination::Exhausted => "EXHAUSTED",
            Termination::StateLimit => "STATE_LIMIT",
            Termination::Timeout => "TIMEOUT",
        }
    }
}

/// Cause recorded for a vehicle that cannot move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockedBy {
    /// Another vehicle, by id
    Vehicle(String),
    /// An obstacle, by id
    Obstacle(String),
    /// The head is not on the grid
    InvalidPosition,
    /// No path table entry for the head cell
    NoPath,
    /// The path ends in a dead end or a loop
    InvalidPath,
}

impl BlockedBy {
    /// Blocking id, or a category tag for the non-obstruction causes
    pub fn label(&self) -> &str {
        match self {
            BlockedBy::Vehicle(id) | BlockedBy::Obstacle(id) => id,
            BlockedBy::InvalidPosition => "INVALID_POSITION",
            BlockedBy::NoPath => "NO_PATH",
            BlockedBy::InvalidPath => "INVALID_PATH",
        }
    }
}

impl fmt::Display for BlockedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingDetail {
    pub blocked: String,
    pub blocked_by: BlockedBy,
    pub reason: String,
}

/// Result of the solver search
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub solvable: bool,
    /// Vehicle ids in exit order
    pub solution: Vec<String>,
    pub total_moves: usize,
    /// Why each vehicle was stuck in the last dead end (empty when solved)
    pub blocking_details: Vec<BlockingDetail>,
    /// Exhaustion summary (None when solved)
    pub reason: Option<String>,
    pub termination: Termination,
    pub states_explored: usize,
    pub max_depth: usize,
    pub time_elapsed_ms: u64,
}

pub struct Solver<'g> {
    graph: &'g RoadGraph,
    config: SolverConfig,
}

impl<'g> Solver<'g> {
    pub fn new(graph: &'g RoadGraph) -> Self {
        Self::with_config(graph, SolverConfig::default())
    }

    pub fn with_config(graph: &'g RoadGraph, config: SolverConfig) -> Self {
        Self { graph, config }
    }

    /// Run the search from `initial`.
    ///
    /// Unsolvable puzzles are reported in the result; an `Err` only means a
    /// state transition was asked to remove a vehicle that is not active.
    pub fn solve(&self, initial: &GameState) -> Result<SolverResult, StateError> {
        let start_time = Instant::now();
        // A timeout too large to represent means no deadline at all
        let deadline = start_time.checked_add(self.config.timeout);

        if initial.is_solved() {
            return Ok(SolverResult {
                solvable: true,
                solution: Vec::new(),
                total_moves: 0,
                blocking_details: Vec::new(),
                reason: None,
                termination: Termination::Solved,
                states_explored: 0,
                max_depth: 0,
                time_elapsed_ms: 0,
            });
        }

        let mut queue: VecDeque<GameState> = VecDeque::new();
        let mut visited = HashSet::new();
        visited.insert(initial.fingerprint());
        queue.push_back(initial.clone());

        let mut search = SearchStats::default();

        while let Some(state) = queue.pop_front() {
            if search.states_explored >= self.config.max_states {
                return Ok(self.give_up(Termination::StateLimit, &state, search, start_time));
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(self.give_up(Termination::Timeout, &state, search, start_time));
            }

            search.states_explored += 1;
            search.max_depth = search.max_depth.max(state.moves_made());

            if state.is_solved() {
                let solution = state.exit_order();
                info!(
                    moves = solution.len(),
                    states = search.states_explored,
                    "puzzle solved"
                );
                return Ok(SolverResult {
                    solvable: true,
                    total_moves: solution.len(),
                    solution,
                    blocking_details: Vec::new(),
                    reason: None,
                    termination: Termination::Solved,
                    states_explored: search.states_explored,
                    max_depth: search.max_depth,
                    time_elapsed_ms: start_time.elapsed().as_millis() as u64,
                });
            }

            let movable = self.find_movable_vehicles(&state);

            if movable.is_empty() {
                debug!(
                    depth = state.moves_made(),
                    remaining = state.active_count(),
                    "dead end"
                );
                search.last_blocking_details = self.analyze_blocking(&state);
                continue;
            }

            for (vehicle, path) in movable {
                let next = state.apply_vehicle_exit(&vehicle.id, &path.exit_path, self.graph)?;
                if visited.insert(next.fingerprint()) {
                    queue.push_back(next);
                }
            }
        }

        let reason = format!(
            "Exhausted all possibilities. Explored {} states up to depth {}.",
            search.states_explored, search.max_depth
        );
        info!(
            states = search.states_explored,
            depth = search.max_depth,
            "puzzle unsolvable"
        );
        Ok(search.into_failure(Termination::Exhausted, reason, start_time))
    }

    /// Stop on a resource bound. Without a dead end seen so far, the
    /// blocking analysis comes from the state the search stopped at.
    fn give_up(
        &self,
        termination: Termination,
        pending: &GameState,
        mut search: SearchStats,
        start_time: Instant,
    ) -> SolverResult {
        if search.last_blocking_details.is_empty() {
            search.last_blocking_details = self.analyze_blocking(pending);
        }
        let reason = match termination {
            Termination::Timeout => format!(
                "Search timed out after {} ms. Explored {} states up to depth {}.",
                start_time.elapsed().as_millis(),
                search.states_explored,
                search.max_depth
            ),
            _ => format!(
                "Search limit of {} states reached. Explored {} states up to depth {}.",
                self.config.max_states, search.states_explored, search.max_depth
            ),
        };
        warn!(termination = termination.as_str(), "{}", reason);
        search.into_failure(termination, reason, start_time)
    }

    /// Precomputed path for a vehicle's head cell, facing and rule
    fn lookup_path(&self, vehicle: &Vehicle) -> Result<&'g PathInfo, BlockedBy> {
        let node = self
            .graph
            .node_at(vehicle.position)
            .ok_or(BlockedBy::InvalidPosition)?;
        self.graph
            .paths()
            .get(node.id, vehicle.orientation, vehicle.movement_rule)
            .ok_or(BlockedBy::NoPath)
    }

    /// Vehicles in `state` whose path is valid and unobstructed, in load order
    pub fn find_movable_vehicles<'s>(
        &self,
        state: &'s GameState,
    ) -> Vec<(&'s Vehicle, &'g PathInfo)> {
        let occupancy = state.occupancy();

        state
            .active_vehicles()
            .filter_map(|vehicle| {
                let path = self.lookup_path(vehicle).ok()?;
                if !path.is_valid() {
                    return None;
                }
                state
                    .first_blocker(vehicle, &path.exit_path, self.graph, &occupancy)
                    .is_none()
                    .then_some((vehicle, path))
            })
            .collect()
    }

    /// Explain, per vehicle, why it cannot move in `state`
    pub fn analyze_blocking(&self, state: &GameState) -> Vec<BlockingDetail> {
        let occupancy = state.occupancy();
        let mut details = Vec::new();

        for vehicle in state.active_vehicles() {
            let rule = vehicle.movement_rule.as_str();
            let path = match self.lookup_path(vehicle) {
                Ok(path) => path,
                Err(BlockedBy::InvalidPosition) => {
                    details.push(BlockingDetail {
                        blocked: vehicle.id.clone(),
                        blocked_by: BlockedBy::InvalidPosition,
                        reason: format!(
                            "Vehicle {} is at invalid position {}",
                            vehicle.id, vehicle.position
                        ),
                    });
                    continue;
                }
                Err(cause) => {
                    details.push(BlockingDetail {
                        blocked: vehicle.id.clone(),
                        blocked_by: cause,
                        reason: format!(
                            "No valid path exists for {} with {} from current position",
                            vehicle.id, rule
                        ),
                    });
                    continue;
                }
            };

            if !path.is_valid() {
                let reason = match path.status {
                    PathStatus::Loop => format!(
                        "Path for {} loops without reaching an exit under {}",
                        vehicle.id, rule
                    ),
                    _ => format!(
                        "Path for {} leads to dead end or cannot complete {}",
                        vehicle.id, rule
                    ),
                };
                details.push(BlockingDetail {
                    blocked: vehicle.id.clone(),
                    blocked_by: BlockedBy::InvalidPath,
                    reason,
                });
                continue;
            }

            if let Some((position, blocker)) =
                state.first_blocker(vehicle, &path.exit_path, self.graph, &occupancy)
            {
                let (blocked_by, reason) = match blocker {
                    Blocker::Vehicle(other) => (
                        BlockedBy::Vehicle(other.id.clone()),
                        format!(
                            "Vehicle {} blocks {}'s path at {}",
                            other.id, vehicle.id, position
                        ),
                    ),
                    Blocker::Obstacle(obstacle) => (
                        BlockedBy::Obstacle(obstacle.id.clone()),
                        format!(
                            "{} {} blocks {}'s path at {}",
                            obstacle.obstacle_type.as_str(),
                            obstacle.id,
                            vehicle.id,
                            position
                        ),
                    ),
                };
                details.push(BlockingDetail {
                    blocked: vehicle.id.clone(),
                    blocked_by,
                    reason,
                });
            }
        }

        details
    }
}

#[derive(Debug, Default)]
struct SearchStats {
    states_explored: usize,
    max_depth: usize,
    last_blocking_details: Vec<BlockingDetail>,
}

impl SearchStats {
    fn into_failure(
        self,
        termination: Termination,
        reason: String,
        start_time: Instant,
    ) -> SolverResult {
        SolverResult {
            solvable: false,
            solution: Vec::new(),
            total_moves: 0,
            blocking_details: self.last_blocking_details,
            reason: Some(reason),
            termination,
            states_explored: self.states_explored,
            max_depth: self.max_depth,
            time_elapsed_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}

/// Solve with a one-off solver
pub fn solve(
    graph: &RoadGraph,
    initial: &GameState,
    config: &SolverConfig,
) -> Result<SolverResult, StateError> {
    Solver::with_config(graph, config.clone()).solve(initial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::paths::calculate_all_paths;
    use crate::puzzle::{
        parse_layout, MovementRule, Obstacle, ObstacleType, Orientation, Position, VehicleType,
    };

    fn graph_from(rows: &[&str]) -> RoadGraph {
        let layout = parse_layout(rows).unwrap();
        let mut graph = build_graph(layout[0].len(), layout.len(), &layout);
        calculate_all_paths(&mut graph);
        graph
    }

    fn vehicle(
        id: &str,
        kind: VehicleType,
        x: i32,
        y: i32,
        orientation: Orientation,
        rule: MovementRule,
    ) -> Vehicle {
        Vehicle::new(id, kind, 1, Position::new(x, y), orientation, rule)
    }

    fn east_car(id: &str, x: i32) -> Vehicle {
        vehicle(id, VehicleType::Car, x, 1, Orientation::East, MovementRule::Straight)
    }

    fn straight_road() -> RoadGraph {
        graph_from(&["EEEEEEE", "E-----E", "EEEEEEE"])
    }

    #[test]
    fn test_empty_board_is_solved_immediately() {
        let graph = straight_road();
        let state = GameState::new(Vec::new(), []).unwrap();

        let result = Solver::new(&graph).solve(&state).unwrap();
        assert!(result.solvable);
        assert_eq!(result.total_moves, 0);
        assert_eq!(result.states_explored, 0);
        assert_eq!(result.termination, Termination::Solved);
    }

    #[test]
    fn test_single_car_on_straight_road() {
        let graph = straight_road();
        let state = GameState::new(vec![east_car("C1", 3)], []).unwrap();

        let result = Solver::new(&graph).solve(&state).unwrap();
        assert!(result.solvable);
        assert_eq!(result.solution, vec!["C1".to_string()]);
        assert_eq!(result.total_moves, 1);
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_front_car_leaves_before_rear_car() {
        let graph = straight_road();
        // Rear car listed first so load order alone would pick it
        let state = GameState::new(vec![east_car("REAR", 2), east_car("FRONT", 4)], []).unwrap();

        let result = Solver::new(&graph).solve(&state).unwrap();
        assert!(result.solvable);
        assert_eq!(
            result.solution,
            vec!["FRONT".to_string(), "REAR".to_string()]
        );
        assert_eq!(result.total_moves, 2);
    }

    #[test]
    fn test_dead_end_path_reports_invalid_path() {
        let graph = graph_from(&["EEEEE", "E--00", "EEEEE"]);
        let state = GameState::new(vec![east_car("C1", 1)], []).unwrap();

        let result = Solver::new(&graph).solve(&state).unwrap();
        assert!(!result.solvable);
        assert_eq!(result.termination, Termination::Exhausted);
        assert_eq!(result.blocking_details.len(), 1);
        assert_eq!(result.blocking_details[0].blocked, "C1");
        assert_eq!(result.blocking_details[0].blocked_by, BlockedBy::InvalidPath);
        assert_eq!(result.blocking_details[0].blocked_by.label(), "INVALID_PATH");
        assert!(result
            .reason
            .as_deref()
            .unwrap()
            .starts_with("Exhausted all possibilities. Explored 1 states"));
    }

    #[test]
    fn test_boulder_blocks_ordinary_car() {
        let graph = straight_road();
        let state = GameState::new(
            vec![east_car("C1", 2)],
            [Obstacle::new("O1", ObstacleType::Boulder, Position::new(4, 1))],
        )
        .unwrap();

        let result = Solver::new(&graph).solve(&state).unwrap();
        assert!(!result.solvable);
        assert_eq!(
            result.blocking_details[0].blocked_by,
            BlockedBy::Obstacle("O1".to_string())
        );
        assert!(result.blocking_details[0].reason.contains("BOULDER O1"));
    }

    #[test]
    fn test_bulldozer_clears_boulder() {
        let graph = straight_road();
        let bulldozer = vehicle(
            "B1",
            VehicleType::Bulldozer,
            2,
            1,
            Orientation::East,
            MovementRule::Straight,
        );
        let state = GameState::new(
            vec![bulldozer],
            [Obstacle::new("O1", ObstacleType::Boulder, Position::new(4, 1))],
        )
        .unwrap();

        let solver = Solver::new(&graph);
        let result = solver.solve(&state).unwrap();
        assert!(result.solvable);
        assert_eq!(result.solution, vec!["B1".to_string()]);

        let (vehicle, path) = solver.find_movable_vehicles(&state)[0];
        let after = state
            .apply_vehicle_exit(&vehicle.id, &path.exit_path, &graph)
            .unwrap();
        assert!(after.obstacle_at(Position::new(4, 1)).is_none());
    }

    #[test]
    fn test_bulldozer_opens_crossing_for_car() {
        let graph = graph_from(&[
            "EEEEEEE", //
            "E--+--E", //
            "E00|00E", //
            "E00|00E", //
            "EEEEEEE",
        ]);
        let state = GameState::new(
            vec![
                east_car("C1", 1),
                vehicle(
                    "B1",
                    VehicleType::Bulldozer,
                    3,
                    3,
                    Orientation::North,
                    MovementRule::Straight,
                ),
            ],
            [Obstacle::new("O1", ObstacleType::Boulder, Position::new(3, 1))],
        )
        .unwrap();

        let result = Solver::new(&graph).solve(&state).unwrap();
        assert!(result.solvable);
        assert_eq!(result.solution, vec!["B1".to_string(), "C1".to_string()]);
    }

    #[test]
    fn test_head_on_deadlock_reports_both_vehicles() {
        let graph = straight_road();
        let state = GameState::new(
            vec![
                east_car("C1", 2),
                vehicle("C2", VehicleType::Car, 4, 1, Orientation::West, MovementRule::Straight),
            ],
            [],
        )
        .unwrap();

        let result = Solver::new(&graph).solve(&state).unwrap();
        assert!(!result.solvable);
        assert_eq!(
            result.blocking_details,
            vec![
                BlockingDetail {
                    blocked: "C1".to_string(),
                    blocked_by: BlockedBy::Vehicle("C2".to_string()),
                    reason: "Vehicle C2 blocks C1's path at (4, 1)".to_string(),
                },
                BlockingDetail {
                    blocked: "C2".to_string(),
                    blocked_by: BlockedBy::Vehicle("C1".to_string()),
                    reason: "Vehicle C1 blocks C2's path at (2, 1)".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_vehicle_off_grid_and_on_building() {
        let graph = graph_from(&["EEEEE", "E-0-E", "EEEEE"]);
        let state = GameState::new(vec![east_car("OFF", 9), east_car("WALL", 2)], []).unwrap();

        let details = Solver::new(&graph).analyze_blocking(&state);
        assert_eq!(details[0].blocked_by, BlockedBy::InvalidPosition);
        assert_eq!(details[1].blocked_by, BlockedBy::NoPath);
    }

    #[test]
    fn test_state_limit_is_distinct_from_exhaustion() {
        let graph = straight_road();
        let state = GameState::new(vec![east_car("REAR", 2), east_car("FRONT", 4)], []).unwrap();
        let config = SolverConfig {
            max_states: 1,
            ..Default::default()
        };

        let result = solve(&graph, &state, &config).unwrap();
        assert!(!result.solvable);
        assert_eq!(result.termination, Termination::StateLimit);
        assert_eq!(result.states_explored, 1);
        assert!(result.reason.unwrap().starts_with("Search limit of 1 states reached"));
    }

    #[test]
    fn test_zero_timeout_gives_up() {
        let graph = straight_road();
        let state = GameState::new(vec![east_car("REAR", 2), east_car("FRONT", 4)], []).unwrap();
        let config = SolverConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };

        let result = solve(&graph, &state, &config).unwrap();
        assert!(!result.solvable);
        assert_eq!(result.termination, Termination::Timeout);
        assert!(result.reason.unwrap().starts_with("Search timed out"));
        assert_eq!(
            result.blocking_details,
            vec![BlockingDetail {
                blocked: "REAR".to_string(),
                blocked_by: BlockedBy::Vehicle("FRONT".to_string()),
                reason: "Vehicle FRONT blocks REAR's path at (4, 1)".to_string(),
            }]
        );
    }

    #[test]
    fn test_state_limit_reports_pending_blockers() {
        let graph = graph_from(&["EEEEEEE", "E-----E", "E---00E", "EEEEEEE"]);
        let state = GameState::new(
            vec![
                east_car("REAR", 2),
                east_car("FRONT", 4),
                vehicle("STUCK", VehicleType::Car, 2, 2, Orientation::East, MovementRule::Straight),
            ],
            [],
        )
        .unwrap();
        let config = SolverConfig {
            max_states: 1,
            ..Default::default()
        };

        // The first expansion never hits a dead end, so the details come
        // from the state left pending in the queue.
        let result = solve(&graph, &state, &config).unwrap();
        assert_eq!(result.termination, Termination::StateLimit);
        assert_eq!(result.blocking_details.len(), 1);
        assert_eq!(result.blocking_details[0].blocked, "STUCK");
        assert_eq!(result.blocking_details[0].blocked_by, BlockedBy::InvalidPath);
    }

    #[test]
    fn test_unrepresentable_timeout_means_no_deadline() {
        let graph = straight_road();
        let state = GameState::new(vec![east_car("C1", 3)], []).unwrap();
        let config = SolverConfig {
            timeout: Duration::from_secs(u64::MAX),
            ..Default::default()
        };

        let result = solve(&graph, &state, &config).unwrap();
        assert!(result.solvable);
        assert_eq!(result.solution, vec!["C1".to_string()]);
    }

    #[test]
    fn test_looping_path_is_reported() {
        let mut graph = straight_road();
        let node = graph.node_id(3, 1).unwrap();
        graph.path_lookup.set(
            node,
            Orientation::East,
            MovementRule::Left,
            PathInfo {
                exit_path: Vec::new(),
                exit_point: None,
                status: PathStatus::Loop,
            },
        );
        let state = GameState::new(
            vec![vehicle("C1", VehicleType::Car, 3, 1, Orientation::East, MovementRule::Left)],
            [],
        )
        .unwrap();

        let details = Solver::new(&graph).analyze_blocking(&state);
        assert_eq!(
            details,
            vec![BlockingDetail {
                blocked: "C1".to_string(),
                blocked_by: BlockedBy::InvalidPath,
                reason: "Path for C1 loops without reaching an exit under LEFT".to_string(),
            }]
        );
    }

    #[test]
    fn test_solution_uses_fewest_moves_and_revisits_nothing() {
        // Three independent cars: any order works, BFS still needs exactly 3.
        let graph = graph_from(&[
            "EEEEEEE", //
            "E-----E", //
            "E-----E", //
            "E-----E", //
            "EEEEEEE",
        ]);
        let state = GameState::new(
            vec![
                vehicle("A", VehicleType::Car, 3, 1, Orientation::East, MovementRule::Straight),
                vehicle("B", VehicleType::Car, 3, 2, Orientation::West, MovementRule::Straight),
                vehicle("C", VehicleType::Car, 3, 3, Orientation::East, MovementRule::Straight),
            ],
            [],
        )
        .unwrap();

        let result = Solver::new(&graph).solve(&state).unwrap();
        assert!(result.solvable);
        assert_eq!(result.total_moves, 3);
        assert_eq!(result.max_depth, 3);
        // 1 + 3 + 3 + 1 distinct subsets, the full one found last
        assert_eq!(result.states_explored, 8);
    }
}
