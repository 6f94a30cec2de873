//! Precomputed exit paths for every road cell, facing and movement rule.
//!
//! The table is filled once right after the graph is built and is read-only
//! afterwards; the solver only ever looks results up.

use std::collections::HashSet;

use tracing::debug;

use crate::graph::{Node, NodeId, RoadGraph};
use crate::puzzle::{Direction, MovementRule, Orientation, Position};

/// How a path computation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStatus {
    /// Reached a boundary cell
    Exit,
    /// Ran out of neighbors before reaching the boundary
    DeadEnd,
    /// Revisited a cell (or cell/facing/turn state) without reaching the boundary
    Loop,
}

/// Pre-calculated path information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    /// Cells traversed after leaving the start, in order
    pub exit_path: Vec<NodeId>,
    /// Where the vehicle leaves the grid
    pub exit_point: Option<Position>,
    pub status: PathStatus,
}

impl PathInfo {
    fn exit(exit_path: Vec<NodeId>, exit_point: Position) -> Self {
        Self {
            exit_path,
            exit_point: Some(exit_point),
            status: PathStatus::Exit,
        }
    }

    // Partial paths are kept for diagnostics only
    fn failed(exit_path: Vec<NodeId>, status: PathStatus) -> Self {
        Self {
            exit_path,
            exit_point: None,
            status,
        }
    }

    /// Whether a vehicle can actually drive this path
    pub fn is_valid(&self) -> bool {
        self.status == PathStatus::Exit
    }
}

type RulePaths = [[PathInfo; 5]; 4];

/// node -> orientation -> movement rule -> path
#[derive(Debug, Clone, Default)]
pub struct PathTable {
    entries: Vec<Option<Box<RulePaths>>>,
}

impl PathTable {
    pub fn get(
        &self,
        node: NodeId,
        orientation: Orientation,
        rule: MovementRule,
    ) -> Option<&PathInfo> {
        self.entries
            .get(node.index())
            .and_then(|entry| entry.as_deref())
            .map(|paths| &paths[orientation.index()][rule.index()])
    }

    #[cfg(test)]
    pub(crate) fn set(
        &mut self,
        node: NodeId,
        orientation: Orientation,
        rule: MovementRule,
        path: PathInfo,
    ) {
        if let Some(Some(paths)) = self.entries.get_mut(node.index()) {
            paths[orientation.index()][rule.index()] = path;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Iterate over every stored (node, orientation, rule, path)
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Orientation, MovementRule, &PathInfo)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                entry
                    .as_deref()
                    .map(|paths| (NodeId::from_index(index), paths))
            })
            .flat_map(|(node, paths)| {
                Orientation::ALL.into_iter().flat_map(move |orientation| {
                    MovementRule::ALL.into_iter().map(move |rule| {
                        (node, orientation, rule, &paths[orientation.index()][rule.index()])
                    })
                })
            })
    }
}

/// Pre-calculate every path for the graph and attach the table to it.
/// Calling it again on the same graph leaves the existing table untouched.
pub fn calculate_all_paths(graph: &mut RoadGraph) {
    if !graph.path_lookup.is_empty() {
        return;
    }

    let mut entries: Vec<Option<Box<RulePaths>>> = Vec::with_capacity(graph.width * graph.height);
    let mut valid = 0usize;
    let mut dead_ends = 0usize;
    let mut loops = 0usize;

    for node in graph.nodes() {
        if !node.cell_type.is_road() {
            entries.push(None);
            continue;
        }

        let paths: RulePaths = Orientation::ALL.map(|orientation| {
            MovementRule::ALL.map(|rule| calculate_path(graph, node, orientation, rule))
        });

        for path in paths.iter().flatten() {
            match path.status {
                PathStatus::Exit => valid += 1,
                PathStatus::DeadEnd => dead_ends += 1,
                PathStatus::Loop => loops += 1,
            }
        }
        entries.push(Some(Box::new(paths)));
    }

    debug!(valid, dead_ends, loops, "path table computed");
    graph.path_lookup = PathTable { entries };
}

/// Calculate the path for one movement from a node
pub fn calculate_path(
    graph: &RoadGraph,
    start: &Node,
    orientation: Orientation,
    rule: MovementRule,
) -> PathInfo {
    match rule.turn_plan() {
        None => calculate_straight_path(graph, start, orientation),
        Some((turn_direction, turns)) => {
            calculate_turn_path(graph, start, orientation, turn_direction, turns)
        }
    }
}

fn calculate_straight_path(graph: &RoadGraph, start: &Node, orientation: Orientation) -> PathInfo {
    let Some(next) = start.neighbor(orientation, Direction::Forward) else {
        return PathInfo::failed(Vec::new(), PathStatus::DeadEnd);
    };
    continue_straight_to_exit(graph, next, orientation, vec![next])
}

fn calculate_turn_path(
    graph: &RoadGraph,
    start: &Node,
    orientation: Orientation,
    turn_direction: Direction,
    required_turns: u8,
) -> PathInfo {
    let mut path = Vec::new();
    let mut current = start;
    let mut previous: Option<&Node> = None;
    let mut orientation = orientation;
    let mut turns_made = 0u8;
    let mut visited: HashSet<(NodeId, Orientation, u8)> = HashSet::new();

    while turns_made < required_turns {
        if !visited.insert((current.id, orientation, turns_made)) {
            return PathInfo::failed(path, PathStatus::Loop);
        }

        // A vehicle has to leave its start cell before it may turn, and may
        // not turn twice across neighboring intersection cells.
        let may_turn = previous.is_some_and(|prev| !prev.cell_type.is_intersection());
        let turn_target = if may_turn {
            current.neighbor(orientation, turn_direction)
        } else {
            None
        };

        let next = match turn_target {
            Some(next) => {
                orientation = orientation.turn(turn_direction);
                turns_made += 1;
                next
            }
            None => match current.neighbor(orientation, Direction::Forward) {
                Some(next) => next,
                None => return PathInfo::failed(path, PathStatus::DeadEnd),
            },
        };

        previous = Some(current);
        current = graph.node(next);
        path.push(next);

        // Reaching the boundary counts as leaving even with turns outstanding
        if graph.is_exit_position(current.position) {
            return PathInfo::exit(path, current.position);
        }
    }

    continue_straight_to_exit(graph, current.id, orientation, path)
}

fn continue_straight_to_exit(
    graph: &RoadGraph,
    from: NodeId,
    orientation: Orientation,
    mut path: Vec<NodeId>,
) -> PathInfo {
    let mut current = graph.node(from);
    let mut visited: HashSet<NodeId> = HashSet::new();

    loop {
        // Positional check only: whether the facing actually points out
        // through this boundary cell is not considered.
        if graph.is_exit_position(current.position) {
            return PathInfo::exit(path, current.position);
        }

        if !visited.insert(current.id) {
            return PathInfo::failed(path, PathStatus::Loop);
        }

        let Some(next) = current.neighbor(orientation, Direction::Forward) else {
            return PathInfo::failed(path, PathStatus::DeadEnd);
        };
        current = graph.node(next);
        path.push(next);
    }
}
