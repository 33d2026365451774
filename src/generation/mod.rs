//! # Generation Module
//!
//! Procedural content generation: maze carving, entity placement and the entity
//! tables that drive encounters.
//!
//! Every generator takes its randomness from an injected [`StdRng`], so a seed fully
//! determines the maze and its population.

pub mod encounters;
pub mod maze;
pub mod placement;

pub use encounters::*;
pub use maze::*;
pub use placement::*;

use crate::{config, MazeError, MazeResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for procedural generation.
///
/// Controls the maze dimensions, how much noise is punched into the carved maze and
/// the spacing rules for entity placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Side length of the square maze
    pub size: usize,
    /// Fraction of N² wall cells flipped open after carving
    pub noise_fraction: f64,
    /// Manhattan distance floor between placed creatures and the player start
    pub min_distance: u32,
    /// Rejection-sampling attempts per placement batch
    pub placement_attempts: u32,
    /// Health the player starts each maze with
    pub starting_health: i32,
    /// Interval between roulette redraws in milliseconds
    pub spin_interval_ms: u64,
}

impl GenerationConfig {
    /// Creates a default generation configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use mazecrawl::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert_eq!(config.seed, 7);
    /// assert!(config.size >= 3);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            size: config::DEFAULT_MAZE_SIZE,
            noise_fraction: config::DEFAULT_NOISE_FRACTION,
            min_distance: config::DEFAULT_MIN_DISTANCE,
            placement_attempts: config::DEFAULT_PLACEMENT_ATTEMPTS,
            starting_health: config::DEFAULT_PLAYER_HEALTH,
            spin_interval_ms: config::DEFAULT_SPIN_INTERVAL_MS,
        }
    }

    /// Creates a configuration for testing with smaller mazes.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            size: 11,
            placement_attempts: 200,
            ..Self::new(seed)
        }
    }

    /// Overrides the maze size.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Complete game configuration: generation parameters plus the entity table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub generation: GenerationConfig,
    pub entities: EntityTable,
}

impl GameConfig {
    /// Parses a configuration from JSON text. Missing sections fall back to defaults.
    pub fn from_json_str(json: &str) -> MazeResult<Self> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> MazeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects configurations the generators cannot honour.
    pub fn validate(&self) -> MazeResult<()> {
        if self.generation.size < config::MIN_MAZE_SIZE {
            return Err(MazeError::GenerationFailed(format!(
                "maze size {} is below the minimum of {}",
                self.generation.size,
                config::MIN_MAZE_SIZE
            )));
        }
        if !(0.0..1.0).contains(&self.generation.noise_fraction) {
            return Err(MazeError::GenerationFailed(format!(
                "noise fraction {} must be in [0, 1)",
                self.generation.noise_fraction
            )));
        }
        self.entities.validate()
    }
}

/// Trait for procedural generators.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> MazeResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> MazeResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Creates a seeded random number generator from the config.
pub fn create_rng(config: &GenerationConfig) -> StdRng {
    StdRng::seed_from_u64(config.seed)
}
