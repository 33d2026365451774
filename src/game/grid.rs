//! # Maze Grid
//!
//! Square grid of open and walled cells, stored as a flat row-major arena.

use crate::Position;
use serde::{Deserialize, Serialize};

/// A single maze cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Open,
    Wall,
}

impl Cell {
    /// Whether the player can stand on this cell.
    pub fn is_passable(self) -> bool {
        self == Cell::Open
    }
}

/// Square maze grid.
///
/// The start corner is (0, 0) and the exit corner is (size - 1, size - 1).
///
/// # Examples
///
/// ```
/// use mazecrawl::{Cell, Grid, Position};
///
/// let mut grid = Grid::new(5);
/// assert_eq!(grid.get(Position::new(2, 2)), Some(Cell::Wall));
/// grid.set(Position::new(2, 2), Cell::Open);
/// assert!(grid.is_open(Position::new(2, 2)));
/// assert_eq!(grid.get(Position::new(5, 0)), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a fully walled grid.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Wall; size * size],
        }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The start corner.
    pub fn start(&self) -> Position {
        Position::origin()
    }

    /// The exit corner.
    pub fn exit(&self) -> Position {
        let last = self.size as i32 - 1;
        Position::new(last, last)
    }

    /// Whether `pos` is one of the two corners.
    pub fn is_corner(&self, pos: Position) -> bool {
        pos == self.start() || pos == self.exit()
    }

    /// Checks if a position is within bounds.
    pub fn is_valid_position(&self, pos: Position) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && (pos.row as usize) < self.size
            && (pos.col as usize) < self.size
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.is_valid_position(pos) {
            Some(pos.row as usize * self.size + pos.col as usize)
        } else {
            None
        }
    }

    /// Gets the cell at a position, `None` when out of bounds.
    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.index(pos).map(|index| self.cells[index])
    }

    /// Sets the cell at a position. Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if let Some(index) = self.index(pos) {
            self.cells[index] = cell;
        }
    }

    /// Whether the position is in bounds and open.
    pub fn is_open(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(Cell::is_passable)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let size = self.size as i32;
        (0..size).flat_map(move |row| (0..size).map(move |col| Position::new(row, col)))
    }

    /// All open positions in row-major order.
    pub fn open_positions(&self) -> Vec<Position> {
        self.positions().filter(|pos| self.is_open(*pos)).collect()
    }

    /// All walled positions in row-major order.
    pub fn wall_positions(&self) -> Vec<Position> {
        self.positions().filter(|pos| !self.is_open(*pos)).collect()
    }

    /// Number of open cells.
    pub fn open_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_passable()).count()
    }
}
