//! Level representation types that match the level JSON format.
//!
//! These types deserialize directly from the level definitions produced by
//! the level editor. Coordinates in a freshly parsed level are relative to the
//! player-authored grid; the loader shifts them into bordered coordinates.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position shifted by a delta
    pub fn offset(self, (dx, dy): (i32, i32)) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cell classification - one layout character per cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    #[serde(rename = "0")]
    NonPassable,
    #[serde(rename = "-")]
    HorizontalRoad,
    #[serde(rename = "|")]
    VerticalRoad,
    #[serde(rename = "+")]
    Intersection,
    #[serde(rename = "E")]
    Exit,
}

impl CellType {
    pub fn from_code(code: char) -> Option<CellType> {
        match code {
            '0' => Some(CellType::NonPassable),
            '-' => Some(CellType::HorizontalRoad),
            '|' => Some(CellType::VerticalRoad),
            '+' => Some(CellType::Intersection),
            'E' => Some(CellType::Exit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CellType::NonPassable => "NON_PASSABLE",
            CellType::HorizontalRoad => "HORIZONTAL_ROAD",
            CellType::VerticalRoad => "VERTICAL_ROAD",
            CellType::Intersection => "INTERSECTION",
            CellType::Exit => "EXIT",
        }
    }

    /// Anything a vehicle can stand on or drive into, exits included
    pub fn is_road(self) -> bool {
        self != CellType::NonPassable
    }

    pub fn is_exit(self) -> bool {
        self == CellType::Exit
    }

    pub fn is_intersection(self) -> bool {
        self == CellType::Intersection
    }

    /// Check if a vehicle may face `orientation` while standing on this cell
    pub fn allows(self, orientation: Orientation) -> bool {
        match self {
            CellType::Intersection => true,
            CellType::HorizontalRoad => orientation.is_horizontal(),
            CellType::VerticalRoad => !orientation.is_horizontal(),
            CellType::NonPassable | CellType::Exit => false,
        }
    }
}

/// Cardinal facing of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    /// Table index (0-3)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::North => "NORTH",
            Orientation::East => "EAST",
            Orientation::South => "SOUTH",
            Orientation::West => "WEST",
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Orientation::East | Orientation::West)
    }

    pub fn turn_left(self) -> Orientation {
        match self {
            Orientation::North => Orientation::West,
            Orientation::West => Orientation::South,
            Orientation::South => Orientation::East,
            Orientation::East => Orientation::North,
        }
    }

    pub fn turn_right(self) -> Orientation {
        match self {
            Orientation::North => Orientation::East,
            Orientation::East => Orientation::South,
            Orientation::South => Orientation::West,
            Orientation::West => Orientation::North,
        }
    }

    pub fn reverse(self) -> Orientation {
        self.turn_left().turn_left()
    }

    /// Facing after moving one cell in a relative direction
    pub fn turn(self, direction: Direction) -> Orientation {
        match direction {
            Direction::Forward => self,
            Direction::Left => self.turn_left(),
            Direction::Right => self.turn_right(),
            Direction::Backward => self.reverse(),
        }
    }

    /// Grid delta of one step forward (y grows southwards)
    pub fn delta(self) -> (i32, i32) {
        match self {
            Orientation::North => (0, -1),
            Orientation::South => (0, 1),
            Orientation::East => (1, 0),
            Orientation::West => (-1, 0),
        }
    }

    /// Grid delta of the neighbor lying in `direction` relative to this facing
    pub fn relative_delta(self, direction: Direction) -> (i32, i32) {
        self.turn(direction).delta()
    }
}

/// Direction relative to a vehicle's facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Forward,
    Left,
    Right,
    Backward,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Left,
        Direction::Right,
        Direction::Backward,
    ];

    /// Table index (0-3)
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Maneuver a vehicle performs when it leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementRule {
    Straight,
    Left,
    Right,
    LeftUTurn,
    RightUTurn,
}

impl MovementRule {
    pub const ALL: [MovementRule; 5] = [
        MovementRule::Straight,
        MovementRule::Left,
        MovementRule::Right,
        MovementRule::LeftUTurn,
        MovementRule::RightUTurn,
    ];

    /// Table index (0-4)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Turn direction and number of turns, or None for straight
    pub fn turn_plan(self) -> Option<(Direction, u8)> {
        match self {
            MovementRule::Straight => None,
            MovementRule::Left => Some((Direction::Left, 1)),
            MovementRule::Right => Some((Direction::Right, 1)),
            MovementRule::LeftUTurn => Some((Direction::Left, 2)),
            MovementRule::RightUTurn => Some((Direction::Right, 2)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementRule::Straight => "STRAIGHT",
            MovementRule::Left => "LEFT",
            MovementRule::Right => "RIGHT",
            MovementRule::LeftUTurn => "LEFT_U_TURN",
            MovementRule::RightUTurn => "RIGHT_U_TURN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Car,
    Truck,
    Bulldozer,
}

impl VehicleType {
    /// Only bulldozers push boulders out of the way
    pub fn can_clear_obstacles(self) -> bool {
        self == VehicleType::Bulldozer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObstacleType {
    Boulder,
    TrafficLight,
    Pedestrian,
}

impl ObstacleType {
    pub fn is_clearable(self) -> bool {
        self == ObstacleType::Boulder
    }

    /// Check if this obstacle stops a vehicle with the given clearing ability.
    /// Traffic lights and pedestrians are reserved and never block.
    pub fn blocks(self, vehicle_can_clear: bool) -> bool {
        match self {
            ObstacleType::Boulder => !vehicle_can_clear,
            ObstacleType::TrafficLight | ObstacleType::Pedestrian => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObstacleType::Boulder => "BOULDER",
            ObstacleType::TrafficLight => "TRAFFIC_LIGHT",
            ObstacleType::Pedestrian => "PEDESTRIAN",
        }
    }
}

/// A vehicle placed on the grid. `position` is the head cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub length: u8,
    pub position: Position,
    pub orientation: Orientation,
    pub movement_rule: MovementRule,
}

impl Vehicle {
    pub fn new(
        id: impl Into<String>,
        vehicle_type: VehicleType,
        length: u8,
        position: Position,
        orientation: Orientation,
        movement_rule: MovementRule,
    ) -> Self {
        Self {
            id: id.into(),
            vehicle_type,
            length,
            position,
            orientation,
            movement_rule,
        }
    }

    /// Cells covered by the vehicle, head first; the body trails behind the
    /// head along the facing axis.
    pub fn occupied_cells(&self) -> SmallVec<[Position; 2]> {
        let (dx, dy) = self.orientation.reverse().delta();
        (0..i32::from(self.length.max(1)))
            .map(|i| self.position.offset((dx * i, dy * i)))
            .collect()
    }

    pub fn can_clear_obstacles(&self) -> bool {
        self.vehicle_type.can_clear_obstacles()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: String,
    #[serde(rename = "type")]
    pub obstacle_type: ObstacleType,
    pub position: Position,
}

impl Obstacle {
    pub fn new(id: impl Into<String>, obstacle_type: ObstacleType, position: Position) -> Self {
        Self {
            id: id.into(),
            obstacle_type,
            position,
        }
    }

    pub fn blocks_vehicle(&self, vehicle_can_clear: bool) -> bool {
        self.obstacle_type.blocks(vehicle_can_clear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub dimensions: Dimensions,
    pub layout: Vec<Vec<CellType>>,
}

/// The complete level definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    #[serde(default)]
    pub level_id: Option<String>,
    // Free-form; carried through untouched
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub grid: GridConfig,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

/// Parse a layout written as one string per row, e.g. `["E-E", "0|0"]`.
/// Returns None if any character is not a known cell code.
pub fn parse_layout<S: AsRef<str>>(rows: &[S]) -> Option<Vec<Vec<CellType>>> {
    rows.iter()
        .map(|row| {
            row.as_ref()
                .chars()
                .map(CellType::from_code)
                .collect::<Option<Vec<_>>>()
        })
        .collect()
}
