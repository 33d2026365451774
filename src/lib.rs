//! # Mazecrawl
//!
//! A procedurally generated maze crawler where every creature and item is resolved
//! through a weighted roulette.
//!
//! ## Architecture Overview
//!
//! The crate is split into a synchronous game core and a thin async driver:
//!
//! - **Generation**: maze carving, entity placement and the entity/outcome tables
//! - **Game**: the state aggregate, the encounter state machine, the action dispatcher
//!   and the controller that ties them together
//! - **Session**: a tokio driver that owns the controller, runs the roulette ticker and
//!   publishes snapshots
//! - **Input**: device-neutral text input mapped onto the command surface
//!
//! Presentation is left to the caller: everything it needs is in [`GameSnapshot`].

pub mod game;
pub mod generation;
pub mod input;
pub mod session;
pub mod utils;

pub use game::*;
pub use generation::*;
pub use input::*;
pub use session::*;
pub use utils::*;

/// Core error type for the maze engine.
#[derive(thiserror::Error, Debug)]
pub enum MazeError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Outcome names an action the dispatcher does not know
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The exit cannot be reached from the start corner
    #[error("Maze of size {size} has no path from start to exit")]
    Unsolvable { size: usize },
}

/// Result type used throughout the crate.
pub type MazeResult<T> = Result<T, MazeError>;

/// Version information for the game.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Default maze side length in cells
    pub const DEFAULT_MAZE_SIZE: usize = 20;

    /// Smallest maze the carver accepts
    pub const MIN_MAZE_SIZE: usize = 3;

    /// Fraction of the grid flipped open by the noise pass
    pub const DEFAULT_NOISE_FRACTION: f64 = 0.15;

    /// Minimum Manhattan distance between placed creatures
    pub const DEFAULT_MIN_DISTANCE: u32 = 2;

    /// Rejection-sampling attempts per placement batch
    pub const DEFAULT_PLACEMENT_ATTEMPTS: u32 = 1000;

    /// Player health bounds
    pub const MIN_HEALTH: i32 = 0;
    pub const MAX_HEALTH: i32 = 100;

    /// Default player starting health
    pub const DEFAULT_PLAYER_HEALTH: i32 = 100;

    /// Interval between roulette redraws in milliseconds
    pub const DEFAULT_SPIN_INTERVAL_MS: u64 = 80;

    /// Reveal duration used when a `reveal_exit` outcome carries no amount
    pub const DEFAULT_REVEAL_EXIT_TURNS: u32 = 3;

    /// Forced encounters placed on the shortest path
    pub const MIN_FORCED_ENCOUNTERS: usize = 2;
    pub const MAX_FORCED_ENCOUNTERS: usize = 3;

    /// Fresh mazes attempted before regenerate gives up
    pub const MAX_REGENERATION_ATTEMPTS: u32 = 8;
}
