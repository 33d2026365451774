//! # Maze Generation
//!
//! Randomized depth-first carving followed by an additive noise pass.
//!
//! Cells at even (row, col) offsets act as rooms. The carver walks rooms from the start
//! corner, opening the cell between a room and each unvisited neighbour two steps away.
//! The result is a spanning tree over every room, so the start corner reaches every
//! carved cell. The exit corner is then forced open and linked, and the noise pass
//! punches extra holes to create alternate routes. Noise only ever opens cells.

use crate::config::MIN_MAZE_SIZE;
use crate::utils::search::shortest_path;
use crate::{
    Cell, Direction, GenerationConfig, Generator, Grid, MazeError, MazeResult, Position,
};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// One pending room on the explicit carving stack.
struct CarveFrame {
    room: Position,
    directions: [Direction; 4],
    next: usize,
}

impl CarveFrame {
    fn new<R: Rng + ?Sized>(room: Position, rng: &mut R) -> Self {
        let mut directions = Direction::search_order();
        directions.shuffle(rng);
        Self {
            room,
            directions,
            next: 0,
        }
    }
}

/// Spanning-tree maze generator.
///
/// # Examples
///
/// ```
/// use mazecrawl::{create_rng, GenerationConfig, Generator, MazeGenerator};
///
/// let config = GenerationConfig::for_testing(7);
/// let mut rng = create_rng(&config);
/// let grid = MazeGenerator::new().generate(&config, &mut rng).unwrap();
/// assert!(grid.is_open(grid.start()));
/// assert!(grid.is_open(grid.exit()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MazeGenerator;

impl MazeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Carves the spanning-tree maze and links the exit corner. Total for any size.
    pub fn carve<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Grid {
        let mut grid = Grid::new(size);
        if size == 0 {
            return grid;
        }

        let start = grid.start();
        grid.set(start, Cell::Open);
        let mut stack = vec![CarveFrame::new(start, rng)];

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.directions.len() {
                stack.pop();
                continue;
            }
            let direction = frame.directions[frame.next];
            frame.next += 1;

            let link = frame.room.step(direction);
            let neighbour = link.step(direction);
            if grid.get(neighbour) == Some(Cell::Wall) {
                grid.set(link, Cell::Open);
                grid.set(neighbour, Cell::Open);
                stack.push(CarveFrame::new(neighbour, rng));
            }
        }

        self.link_exit(&mut grid);
        grid
    }

    /// Opens the exit corner and, if it is isolated, the cell above it (or left of it
    /// on a single-row grid).
    fn link_exit(&self, grid: &mut Grid) {
        let exit = grid.exit();
        grid.set(exit, Cell::Open);

        let above = exit.step(Direction::Up);
        let left = exit.step(Direction::Left);
        if !grid.is_open(above) && !grid.is_open(left) {
            if exit.row > 0 {
                grid.set(above, Cell::Open);
            } else if exit.col > 0 {
                grid.set(left, Cell::Open);
            }
        }
    }

    /// Flips `floor(size² × fraction)` distinct non-corner walls open.
    ///
    /// Returns how many cells were opened, which is smaller than the target only when
    /// the grid runs out of walls.
    pub fn add_noise<R: Rng + ?Sized>(
        &self,
        grid: &mut Grid,
        fraction: f64,
        rng: &mut R,
    ) -> usize {
        let area = (grid.size() * grid.size()) as f64;
        let target = (area * fraction.max(0.0)).floor() as usize;

        let mut walls: Vec<Position> = grid
            .wall_positions()
            .into_iter()
            .filter(|pos| !grid.is_corner(*pos))
            .collect();
        let (chosen, _) = walls.partial_shuffle(rng, target);
        for pos in chosen.iter() {
            grid.set(*pos, Cell::Open);
        }
        chosen.len()
    }

    /// Carves and roughens a maze of `size` cells per side.
    pub fn generate_grid<R: Rng + ?Sized>(
        &self,
        size: usize,
        noise_fraction: f64,
        rng: &mut R,
    ) -> Grid {
        let mut grid = self.carve(size, rng);
        let carved = grid.open_count();
        let opened = self.add_noise(&mut grid, noise_fraction, rng);
        debug!(
            "Carved {size}x{size} maze: {carved} open cells, {opened} opened by noise"
        );
        grid
    }
}

impl Generator<Grid> for MazeGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> MazeResult<Grid> {
        if config.size < MIN_MAZE_SIZE {
            return Err(MazeError::GenerationFailed(format!(
                "maze size {} is below the minimum of {MIN_MAZE_SIZE}",
                config.size
            )));
        }

        let grid = self.generate_grid(config.size, config.noise_fraction, rng);
        self.validate(&grid, config)?;
        Ok(grid)
    }

    fn validate(&self, grid: &Grid, _config: &GenerationConfig) -> MazeResult<()> {
        if shortest_path(grid, grid.start(), grid.exit()).is_empty() {
            return Err(MazeError::Unsolvable { size: grid.size() });
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "MazeGenerator"
    }
}
