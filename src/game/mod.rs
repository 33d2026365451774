//! # Game Module
//!
//! Core game state management, the encounter state machine and the command surface.
//!
//! This module contains the fundamental building blocks of the maze crawler:
//! - Grid and position representation
//! - Entity sets for creatures and items
//! - The game state aggregate and its read-only snapshot
//! - The encounter roulette and the action dispatcher
//! - The controller that advances the aggregate on each command

pub mod actions;
pub mod controller;
pub mod encounter;
pub mod entities;
pub mod grid;
pub mod state;

pub use actions::*;
pub use controller::*;
pub use encounter::*;
pub use entities::*;
pub use grid::*;
pub use state::*;

use serde::{Deserialize, Serialize};

/// A (row, col) coordinate in the maze.
///
/// Positions order row-major, which keeps entity sets iterating in a stable order.
///
/// # Examples
///
/// ```
/// use mazecrawl::Position;
///
/// let pos = Position::new(2, 5);
/// assert_eq!(pos.row, 2);
/// assert_eq!(pos.col, 5);
/// assert_eq!(pos.cardinal_adjacent_positions().len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Returns the origin position (0, 0).
    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Calculates the Manhattan distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use mazecrawl::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.manhattan_distance(pos2), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> u32 {
        (self.row - other.row).unsigned_abs() + (self.col - other.col).unsigned_abs()
    }

    /// Returns the 4 cardinal neighbours in search order: right, down, left, up.
    pub fn cardinal_adjacent_positions(self) -> Vec<Position> {
        Direction::search_order()
            .iter()
            .map(|direction| self.step(*direction))
            .collect()
    }

    /// Returns the position one cell away in `direction`.
    pub fn step(self, direction: Direction) -> Position {
        self + direction.to_delta()
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.row + other.row, self.col + other.col)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.row - other.row, self.col - other.col)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Movement directions. The maze has no diagonal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Converts a direction to a (row, col) delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use mazecrawl::{Direction, Position};
    ///
    /// assert_eq!(Direction::Up.to_delta(), Position::new(-1, 0));
    /// assert_eq!(Direction::Right.to_delta(), Position::new(0, 1));
    /// ```
    pub fn to_delta(self) -> Position {
        match self {
            Direction::Up => Position::new(-1, 0),
            Direction::Down => Position::new(1, 0),
            Direction::Left => Position::new(0, -1),
            Direction::Right => Position::new(0, 1),
        }
    }

    /// Converts a delta back to a direction, if it is a unit cardinal step.
    pub fn from_delta(delta: Position) -> Option<Direction> {
        match (delta.row, delta.col) {
            (-1, 0) => Some(Direction::Up),
            (1, 0) => Some(Direction::Down),
            (0, -1) => Some(Direction::Left),
            (0, 1) => Some(Direction::Right),
            _ => None,
        }
    }

    /// Neighbour visiting order shared by the path finder and the carver.
    pub fn search_order() -> [Direction; 4] {
        [
            Direction::Right,
            Direction::Down,
            Direction::Left,
            Direction::Up,
        ]
    }
}
