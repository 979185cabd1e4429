//! Spatial primitives for the conveyor-network engine.
//!
//! Provides integer 3-vector positions, cardinal directions with a
//! facing-relative rotation table, entity footprints, and the fixed-extent
//! sparse cell grid that backs the world index. The grid is generic over a
//! slotmap key so it stores handles, never entities.

use serde::{Deserialize, Serialize};
use slotmap::Key;

// ---------------------------------------------------------------------------
// Grid constants
// ---------------------------------------------------------------------------

/// Side length of one cell, in world tiles.
pub const CELL_SIZE: i32 = 32;

/// Number of cells along each horizontal axis.
pub const AXIS_CELLS: i32 = 64;

/// Depth floors a cell can hold.
pub const MAX_FLOORS: i32 = 4;

/// World extent along x and y, in tiles. Valid world coordinates lie in
/// `[-WORLD_EXTENT / 2, WORLD_EXTENT / 2)`.
pub const WORLD_EXTENT: i32 = CELL_SIZE * AXIS_CELLS;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position on the world grid. `depth` selects the floor; y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub depth: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, depth: i32) -> Self {
        Self { x, y, depth }
    }

    /// The position one step in `dir`, on the same floor.
    pub fn step(&self, dir: Direction) -> Position {
        let (dx, dy) = dir.offset();
        Position::new(self.x + dx, self.y + dy, self.depth)
    }

    /// The position `n` steps in `dir`, on the same floor.
    pub fn step_by(&self, dir: Direction, n: i32) -> Position {
        let (dx, dy) = dir.offset();
        Position::new(self.x + dx * n, self.y + dy * n, self.depth)
    }

    /// Manhattan distance to another position, ignoring depth.
    pub fn manhattan_distance(&self, other: &Position) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// Cardinal facing directions. `Up` is negative y (screen convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions, in the probe order the junction uses.
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Right,
            Direction::Down,
            Direction::Left,
        ]
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// The opposite direction.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Rotate 90 degrees clockwise (with y growing downward).
    pub fn rotate_cw(&self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(&self) -> Direction {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }

    /// Resolve a relative direction against this facing.
    pub fn relative(&self, rel: RelativeDirection) -> Direction {
        match rel {
            RelativeDirection::Forward => *self,
            RelativeDirection::Backward => self.opposite(),
            RelativeDirection::RightOf => self.rotate_cw(),
            RelativeDirection::LeftOf => self.rotate_ccw(),
        }
    }
}

/// A direction relative to an entity's facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelativeDirection {
    Forward,
    Backward,
    RightOf,
    LeftOf,
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// The volume an entity occupies: x span, y span, and floor span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
    pub floors: u32,
}

impl Footprint {
    /// A 1x1 single-floor footprint.
    pub fn single() -> Self {
        Self {
            width: 1,
            height: 1,
            floors: 1,
        }
    }

    pub fn new(width: u32, height: u32, floors: u32) -> Self {
        Self {
            width,
            height,
            floors,
        }
    }

    /// Iterate over every tile covered by this footprint at the given
    /// origin. Origin is the top-left corner on the lowest floor.
    pub fn tiles(&self, origin: Position) -> impl Iterator<Item = Position> {
        let w = self.width as i32;
        let h = self.height as i32;
        let d = self.floors as i32;
        (0..d).flat_map(move |dz| {
            (0..h).flat_map(move |dy| {
                (0..w).map(move |dx| Position::new(origin.x + dx, origin.y + dy, origin.depth + dz))
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from spatial operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SpatialError {
    #[error("position is outside the world bounds")]
    OutOfBounds,
    #[error("position is occupied")]
    Occupied,
}

// ---------------------------------------------------------------------------
// Cell coordinates
// ---------------------------------------------------------------------------

/// A world position resolved into grid storage coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCoords {
    pub cell_x: i32,
    pub cell_y: i32,
    pub slot_x: i32,
    pub slot_y: i32,
    pub floor: i32,
}

/// Resolve a world position into cell coordinates. Returns `None` when any
/// component is outside the fixed world extent; the caller must never index
/// storage with an unresolved position.
pub fn to_cell_space(pos: Position) -> Option<CellCoords> {
    let shifted_x = pos.x + WORLD_EXTENT / 2;
    let shifted_y = pos.y + WORLD_EXTENT / 2;
    if shifted_x < 0 || shifted_x >= WORLD_EXTENT || shifted_y < 0 || shifted_y >= WORLD_EXTENT {
        return None;
    }
    if pos.depth < 0 || pos.depth >= MAX_FLOORS {
        return None;
    }
    Some(CellCoords {
        cell_x: shifted_x / CELL_SIZE,
        cell_y: shifted_y / CELL_SIZE,
        slot_x: shifted_x % CELL_SIZE,
        slot_y: shifted_y % CELL_SIZE,
        floor: pos.depth,
    })
}

// ---------------------------------------------------------------------------
// CellGrid
// ---------------------------------------------------------------------------

/// One depth layer of a cell. Allocated on first write.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Floor<K: Key> {
    slots: Vec<Option<K>>,
}

impl<K: Key> Floor<K> {
    fn new() -> Self {
        Self {
            slots: vec![None; (CELL_SIZE * CELL_SIZE) as usize],
        }
    }

    fn index(slot_x: i32, slot_y: i32) -> usize {
        (slot_y * CELL_SIZE + slot_x) as usize
    }
}

/// A fixed-size spatial bucket holding up to [`MAX_FLOORS`] sparse floors.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Cell<K: Key> {
    floors: Vec<Option<Box<Floor<K>>>>,
}

impl<K: Key> Cell<K> {
    fn new() -> Self {
        Self {
            floors: (0..MAX_FLOORS).map(|_| None).collect(),
        }
    }
}

/// The fixed-extent sparse cell grid: a 2D array of cells, each with lazily
/// allocated depth floors, each floor a dense slot array of handles.
///
/// Reads return `None` both for empty slots and for out-of-bounds positions;
/// [`CellGrid::contains`] distinguishes the two. Writes to out-of-bounds
/// positions are refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellGrid<K: Key> {
    cells: Vec<Cell<K>>,
    claimed: usize,
}

impl<K: Key> Default for CellGrid<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key> CellGrid<K> {
    pub fn new() -> Self {
        Self {
            cells: (0..AXIS_CELLS * AXIS_CELLS).map(|_| Cell::new()).collect(),
            claimed: 0,
        }
    }

    fn cell_index(coords: &CellCoords) -> usize {
        (coords.cell_y * AXIS_CELLS + coords.cell_x) as usize
    }

    /// Whether the position lies inside the world bounds.
    pub fn contains(&self, pos: Position) -> bool {
        to_cell_space(pos).is_some()
    }

    /// The handle stored at `pos`, if any.
    pub fn get(&self, pos: Position) -> Option<K> {
        let coords = to_cell_space(pos)?;
        let cell = &self.cells[Self::cell_index(&coords)];
        let floor = cell.floors[coords.floor as usize].as_ref()?;
        floor.slots[Floor::<K>::index(coords.slot_x, coords.slot_y)]
    }

    /// Whether `pos` holds a handle. Out-of-bounds positions read as free.
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.get(pos).is_some()
    }

    /// Store `key` at `pos`. Fails without mutation when the position is
    /// out of bounds or already claimed. Allocates the floor on first write.
    pub fn claim(&mut self, pos: Position, key: K) -> Result<(), SpatialError> {
        let coords = to_cell_space(pos).ok_or(SpatialError::OutOfBounds)?;
        let cell = &mut self.cells[Self::cell_index(&coords)];
        let floor = cell.floors[coords.floor as usize].get_or_insert_with(|| Box::new(Floor::new()));
        let slot = &mut floor.slots[Floor::<K>::index(coords.slot_x, coords.slot_y)];
        if slot.is_some() {
            return Err(SpatialError::Occupied);
        }
        *slot = Some(key);
        self.claimed += 1;
        Ok(())
    }

    /// Clear `pos`, returning the handle that was stored there.
    pub fn release(&mut self, pos: Position) -> Option<K> {
        let coords = to_cell_space(pos)?;
        let cell = &mut self.cells[Self::cell_index(&coords)];
        let floor = cell.floors[coords.floor as usize].as_mut()?;
        let slot = &mut floor.slots[Floor::<K>::index(coords.slot_x, coords.slot_y)];
        let released = slot.take();
        if released.is_some() {
            self.claimed -= 1;
        }
        released
    }

    /// Total claimed slots.
    pub fn claimed_count(&self) -> usize {
        self.claimed
    }

    /// Number of floors that have been allocated across all cells.
    pub fn allocated_floor_count(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.floors.iter().filter(|f| f.is_some()).count())
            .sum()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
