//! # Path Search
//!
//! Breadth-first shortest paths over open maze cells.

use crate::{Grid, Position};
use ::pathfinding::prelude::bfs;

/// Shortest 4-directional path between two open cells, endpoints included.
///
/// Returns an empty path when either endpoint is blocked or no route exists.
/// Neighbours expand right, down, left, up, so equal-length routes resolve the same
/// way every time.
///
/// # Examples
///
/// ```
/// use mazecrawl::{shortest_path, Cell, Grid, Position};
///
/// let mut grid = Grid::new(3);
/// for col in 0..3 {
///     grid.set(Position::new(0, col), Cell::Open);
/// }
/// let path = shortest_path(&grid, Position::new(0, 0), Position::new(0, 2));
/// assert_eq!(path.len(), 3);
/// assert!(shortest_path(&grid, Position::new(0, 0), Position::new(2, 2)).is_empty());
/// ```
pub fn shortest_path(grid: &Grid, from: Position, to: Position) -> Vec<Position> {
    if !grid.is_open(from) || !grid.is_open(to) {
        return Vec::new();
    }

    bfs(
        &from,
        |pos: &Position| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|next| grid.is_open(*next))
                .collect::<Vec<_>>()
        },
        |pos| *pos == to,
    )
    .unwrap_or_default()
}

/// Whether `to` can be reached from `from`.
pub fn is_reachable(grid: &Grid, from: Position, to: Position) -> bool {
    !shortest_path(grid, from, to).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cell;

    fn grid_from(rows: &[&str]) -> Grid {
        let mut grid = Grid::new(rows.len());
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if ch == '.' {
                    grid.set(Position::new(row as i32, col as i32), Cell::Open);
                }
            }
        }
        grid
    }

    #[test]
    fn test_straight_corridor() {
        let grid = grid_from(&["...", "##.", "##."]);
        let path = shortest_path(&grid, grid.start(), grid.exit());
        assert_eq!(
            path,
            vec![
                Position::new(0, 0),
                Position::new(0, 1),
                Position::new(0, 2),
                Position::new(1, 2),
                Position::new(2, 2),
            ]
        );
    }

    #[test]
    fn test_picks_shortest_of_two_routes() {
        let grid = grid_from(&[".....", ".###.", ".#...", ".#.#.", "...#."]);
        let path = shortest_path(&grid, grid.start(), grid.exit());
        assert_eq!(path.len(), 9);
        assert_eq!(path.first(), Some(&grid.start()));
        assert_eq!(path.last(), Some(&grid.exit()));
    }

    #[test]
    fn test_tie_break_prefers_right_then_down() {
        let grid = grid_from(&["...", "...", "..."]);
        let path = shortest_path(&grid, grid.start(), grid.exit());
        assert_eq!(path.len(), 5);
        assert_eq!(path[1], Position::new(0, 1));
    }

    #[test]
    fn test_unreachable_is_empty() {
        let grid = grid_from(&["..#", "###", "#.."]);
        assert!(shortest_path(&grid, grid.start(), grid.exit()).is_empty());
        assert!(!is_reachable(&grid, grid.start(), grid.exit()));
    }

    #[test]
    fn test_blocked_endpoint_is_empty() {
        let grid = grid_from(&["#..", "...", "..."]);
        assert!(shortest_path(&grid, grid.start(), grid.exit()).is_empty());
    }

    #[test]
    fn test_same_endpoint() {
        let grid = grid_from(&["...", "...", "..."]);
        let pos = Position::new(1, 1);
        assert_eq!(shortest_path(&grid, pos, pos), vec![pos]);
    }
}
