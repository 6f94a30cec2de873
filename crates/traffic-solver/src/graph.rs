//! Orientation-aware road graph built from a grid layout.
//!
//! Every grid cell becomes a [`Node`]. Road cells carry a fixed 4x4 neighbor
//! table indexed by the facing of a vehicle standing on the cell and the
//! relative direction it wants to move in, so one physical cell can expose
//! different neighbors depending on how a vehicle entered it.

use std::collections::BTreeSet;

use tracing::debug;

use crate::paths::PathTable;
use crate::puzzle::{CellType, Direction, Orientation, Position};

/// Dense node identifier, `y * width + x`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

type NeighborTable = [[Option<NodeId>; 4]; 4];

/// A single grid cell
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub cell_type: CellType,
    neighbors: NeighborTable,
}

impl Node {
    fn new(id: NodeId, position: Position, cell_type: CellType) -> Self {
        Self {
            id,
            position,
            cell_type,
            neighbors: [[None; 4]; 4],
        }
    }

    /// Neighbor reached by moving `direction` while facing `orientation`
    pub fn neighbor(&self, orientation: Orientation, direction: Direction) -> Option<NodeId> {
        self.neighbors[orientation.index()][direction.index()]
    }

    /// Check if any neighbor is recorded for a facing
    pub fn has_neighbors(&self, orientation: Orientation) -> bool {
        self.neighbors[orientation.index()].iter().any(Option::is_some)
    }

    /// Number of recorded (orientation, direction) entries
    pub fn neighbor_count(&self) -> usize {
        self.neighbors.iter().flatten().filter(|n| n.is_some()).count()
    }

    fn add_neighbor(&mut self, orientation: Orientation, direction: Direction, neighbor: NodeId) {
        self.neighbors[orientation.index()][direction.index()] = Some(neighbor);
    }
}

/// Main graph structure for the road network
#[derive(Debug, Clone)]
pub struct RoadGraph {
    pub width: usize,
    pub height: usize,
    nodes: Vec<Node>,
    exit_positions: BTreeSet<Position>,
    pub(crate) path_lookup: PathTable,
}

impl RoadGraph {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            nodes: Vec::with_capacity(width * height),
            exit_positions: BTreeSet::new(),
            path_lookup: PathTable::default(),
        }
    }

    /// Node id for a coordinate, None when off-grid
    pub fn node_id(&self, x: i32, y: i32) -> Option<NodeId> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(NodeId((y as usize * self.width + x as usize) as u32))
    }

    pub fn get_node(&self, x: i32, y: i32) -> Option<&Node> {
        self.node_id(x, y).and_then(|id| self.nodes.get(id.index()))
    }

    pub fn node_at(&self, position: Position) -> Option<&Node> {
        self.get_node(position.x, position.y)
    }

    /// Node by id. Ids only come from this graph, so the lookup is in range.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn position(&self, id: NodeId) -> Position {
        self.node(id).position
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Check if a position lies on the grid boundary
    pub fn is_exit_position(&self, position: Position) -> bool {
        position.x == 0
            || position.y == 0
            || position.x == self.width as i32 - 1
            || position.y == self.height as i32 - 1
    }

    /// Boundary road cells, recorded as nodes were inserted
    pub fn exit_positions(&self) -> &BTreeSet<Position> {
        &self.exit_positions
    }

    pub fn paths(&self) -> &PathTable {
        &self.path_lookup
    }

    fn add_node(&mut self, node: Node) {
        if node.cell_type.is_road() && self.is_exit_position(node.position) {
            self.exit_positions.insert(node.position);
        }
        self.nodes.push(node);
    }

    fn road_neighbor(&self, position: Position) -> Option<NodeId> {
        self.node_at(position)
            .filter(|node| node.cell_type.is_road())
            .map(|node| node.id)
    }
}

/// Build the graph from grid dimensions and a row-major layout.
///
/// Rows shorter than `width` and rows beyond `height` are treated as
/// impassable; the loader rejects such layouts before they get here.
pub fn build_graph(width: usize, height: usize, layout: &[Vec<CellType>]) -> RoadGraph {
    let mut graph = RoadGraph::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let cell_type = layout
                .get(y)
                .and_then(|row| row.get(x))
                .copied()
                .unwrap_or(CellType::NonPassable);
            let id = NodeId((y * width + x) as u32);
            graph.add_node(Node::new(id, Position::new(x as i32, y as i32), cell_type));
        }
    }

    establish_neighbors(&mut graph);

    debug!(
        width,
        height,
        exits = graph.exit_positions.len(),
        "road graph built"
    );
    graph
}

fn establish_neighbors(graph: &mut RoadGraph) {
    for index in 0..graph.nodes.len() {
        let (position, cell_type) = {
            let node = &graph.nodes[index];
            (node.position, node.cell_type)
        };

        let directions: &[Direction] = match cell_type {
            CellType::Intersection => &Direction::ALL,
            CellType::HorizontalRoad | CellType::VerticalRoad => {
                &[Direction::Forward, Direction::Backward]
            }
            CellType::NonPassable | CellType::Exit => continue,
        };

        for orientation in Orientation::ALL {
            if !cell_type.allows(orientation) {
                continue;
            }
            for &direction in directions {
                let target = position.offset(orientation.relative_delta(direction));
                if let Some(neighbor) = graph.road_neighbor(target) {
                    graph.nodes[index].add_neighbor(orientation, direction, neighbor);
                }
            }
        }
    }
}
