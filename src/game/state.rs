//! # Game State Module
//!
//! The mutable aggregate advanced by the controller, plus the read-only snapshot
//! handed to presentation code.
//!
//! The aggregate is rebuilt wholesale when a maze is (re)generated and mutated in
//! place by moves and encounter outcomes. Nothing outside the controller holds on to
//! it between calls.

use crate::config::{MAX_HEALTH, MAX_REGENERATION_ATTEMPTS, MIN_HEALTH};
use crate::{
    EncounterDescriptor, EncounterEngine, EntityPlacer, EntitySets, EntityTag, GameConfig,
    Generator, Grid, MazeError, MazeGenerator, MazeResult, Placement, PlacementConfig, Position,
};
use log::{info, warn};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of the current maze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    InProgress,
    Won,
    Lost,
}

impl GameResult {
    pub fn is_over(self) -> bool {
        self != GameResult::InProgress
    }
}

/// The player's position, health and inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: Position,
    pub health: i32,
    pub has_key: bool,
}

impl PlayerState {
    pub fn new(position: Position, health: i32) -> Self {
        Self {
            position,
            health: health.clamp(MIN_HEALTH, MAX_HEALTH),
            has_key: false,
        }
    }

    /// Sets health clamped to [0, 100]. Returns the previous value.
    pub fn set_health(&mut self, health: i32) -> i32 {
        let previous = self.health;
        self.health = health.clamp(MIN_HEALTH, MAX_HEALTH);
        previous
    }

    /// Adds `delta` to health, clamped. Returns the previous value.
    pub fn add_health(&mut self, delta: i32) -> i32 {
        self.set_health(self.health.saturating_add(delta))
    }

    pub fn is_depleted(&self) -> bool {
        self.health <= MIN_HEALTH
    }
}

/// Notifications emitted while the game advances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PlayerMoved { from: Position, to: Position },
    EncounterStarted { tag: EntityTag, position: Position },
    SelectionChanged { index: usize },
    EncounterResolved { index: usize, label: String },
    OutcomeApplied { label: String, action: String },
    HealthChanged { from: i32, to: i32 },
    PlayerTeleported { from: Position, to: Position },
    EntitySpawned { tag: EntityTag, position: Position },
    EntityRemoved { tag: EntityTag, position: Position },
    KeyTaken,
    ExitRevealed { turns: u32 },
    ExitLocked,
    MazeRegenerated { generation: u64 },
    ExitSealed,
    GameWon,
    GameLost,
}

/// Running totals across every maze played in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Successful moves
    pub steps_taken: u64,
    /// Encounters triggered by collisions
    pub encounters_started: u32,
    /// Encounters whose outcome was applied
    pub encounters_resolved: u32,
    /// Creatures removed after an encounter
    pub creatures_removed: u32,
    /// Vials and keys consumed
    pub items_consumed: u32,
    /// Mazes generated, including reshuffles
    pub mazes_generated: u32,
}

impl GameStatistics {
    /// Creates new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates statistics based on a game event.
    pub fn update_from_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::PlayerMoved { .. } => {
                self.steps_taken += 1;
            }
            GameEvent::EncounterStarted { .. } => {
                self.encounters_started += 1;
            }
            GameEvent::OutcomeApplied { .. } => {
                self.encounters_resolved += 1;
            }
            GameEvent::EntityRemoved { tag, .. } => {
                if tag.is_creature() {
                    self.creatures_removed += 1;
                } else {
                    self.items_consumed += 1;
                }
            }
            GameEvent::MazeRegenerated { .. } => {
                self.mazes_generated += 1;
            }
            _ => {}
        }
    }
}

/// Central game state: the maze, its population and the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// The current maze
    pub grid: Grid,
    /// Creatures and items still on the board
    pub entities: EntitySets,
    /// Shortest-path cells that received a forced creature at generation time
    #[serde(default)]
    pub forced_encounters: Vec<Position>,
    /// The player
    pub player: PlayerState,
    /// Whether the maze is still being played
    pub result: GameResult,
    /// Set by `lock_exit`; recorded for presentation only
    pub exit_locked: bool,
    /// Remaining turns of a `reveal_exit` effect
    pub reveal_exit_turns: u32,
    /// Incremented on every full rebuild
    pub generation: u64,
    /// Successful moves on the current maze
    pub turn_number: u64,
    /// Session-wide statistics
    pub statistics: GameStatistics,
}

impl GameState {
    /// Generates a fresh maze and population.
    ///
    /// # Examples
    ///
    /// ```
    /// use mazecrawl::{create_rng, GameConfig, GameResult, GameState};
    ///
    /// let config = GameConfig::default();
    /// let mut rng = create_rng(&config.generation);
    /// let state = GameState::generate(&config, &mut rng).unwrap();
    /// assert_eq!(state.player.position, state.grid.start());
    /// assert_eq!(state.player.health, 100);
    /// assert_eq!(state.result, GameResult::InProgress);
    /// ```
    pub fn generate(config: &GameConfig, rng: &mut StdRng) -> MazeResult<Self> {
        let (grid, placement) = Self::build_world(config, rng)?;
        let player = PlayerState::new(grid.start(), config.generation.starting_health);

        Ok(Self {
            grid,
            entities: placement.entities,
            forced_encounters: placement.forced,
            player,
            result: GameResult::InProgress,
            exit_locked: false,
            reveal_exit_turns: 0,
            generation: 0,
            turn_number: 0,
            statistics: GameStatistics::new(),
        })
    }

    /// Replaces the maze and population, keeping statistics.
    ///
    /// The returned event is not folded into the statistics; the caller records it.
    ///
    /// With `keep_health` the player's current health survives the rebuild; otherwise it
    /// resets to the configured starting health. Everything else starts fresh.
    pub fn rebuild(
        &mut self,
        config: &GameConfig,
        keep_health: bool,
        rng: &mut StdRng,
    ) -> MazeResult<GameEvent> {
        let (grid, placement) = Self::build_world(config, rng)?;
        let health = if keep_health {
            self.player.health
        } else {
            config.generation.starting_health
        };

        self.player = PlayerState::new(grid.start(), health);
        self.grid = grid;
        self.entities = placement.entities;
        self.forced_encounters = placement.forced;
        self.result = GameResult::InProgress;
        self.exit_locked = false;
        self.reveal_exit_turns = 0;
        self.turn_number = 0;
        self.generation += 1;

        info!("Generated maze #{}", self.generation);
        Ok(GameEvent::MazeRegenerated {
            generation: self.generation,
        })
    }

    /// Generates a solvable grid and places entities on it, retrying on the
    /// (unexpected) case of an unreachable exit.
    fn build_world(config: &GameConfig, rng: &mut StdRng) -> MazeResult<(Grid, Placement)> {
        let generator = MazeGenerator::new();
        let placer = EntityPlacer::new();
        let placement_config = PlacementConfig::from_tables(&config.entities, &config.generation);

        for attempt in 1..=MAX_REGENERATION_ATTEMPTS {
            let grid = match generator.generate(&config.generation, rng) {
                Ok(grid) => grid,
                Err(MazeError::Unsolvable { size }) => {
                    warn!("Attempt {attempt}: {size}x{size} maze had no exit path, regenerating");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match placer.place(&grid, grid.start(), &placement_config, rng) {
                Ok(placement) => return Ok((grid, placement)),
                Err(MazeError::Unsolvable { size }) => {
                    warn!("Attempt {attempt}: placement found no path on {size}x{size} maze");
                }
                Err(e) => return Err(e),
            }
        }

        Err(MazeError::GenerationFailed(format!(
            "no solvable maze after {MAX_REGENERATION_ATTEMPTS} attempts"
        )))
    }

    /// Folds an event into the statistics.
    pub fn record(&mut self, event: &GameEvent) {
        self.statistics.update_from_event(event);
    }

    /// Whether the player stands on the exit corner.
    pub fn player_on_exit(&self) -> bool {
        self.player.position == self.grid.exit()
    }
}

/// Read-only view of everything presentation code needs to draw a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub grid: Grid,
    pub player: Position,
    pub health: i32,
    pub has_key: bool,
    pub entities: BTreeMap<EntityTag, Vec<Position>>,
    pub encounter: Option<EncounterDescriptor>,
    pub spinning: bool,
    pub selected_index: Option<usize>,
    pub result: GameResult,
    pub exit_locked: bool,
    pub reveal_exit_turns: u32,
    pub turn_number: u64,
}

impl GameSnapshot {
    /// Captures the aggregate together with the encounter engine's view.
    pub fn capture(state: &GameState, encounter: &EncounterEngine) -> Self {
        Self {
            grid: state.grid.clone(),
            player: state.player.position,
            health: state.player.health,
            has_key: state.player.has_key,
            entities: state.entities.by_tag(),
            encounter: encounter.active().cloned(),
            spinning: encounter.is_spinning(),
            selected_index: encounter.selected_index(),
            result: state.result,
            exit_locked: state.exit_locked,
            reveal_exit_turns: state.reveal_exit_turns,
            turn_number: state.turn_number,
        }
    }

    /// Saves the snapshot as pretty JSON.
    pub fn to_json(&self) -> MazeResult<String> {
        serde_json::to_string_pretty(self).map_err(MazeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_rng, is_reachable};

    #[test]
    fn test_player_health_clamps() {
        let mut player = PlayerState::new(Position::origin(), 150);
        assert_eq!(player.health, 100);

        assert_eq!(player.add_health(-130), 100);
        assert_eq!(player.health, 0);
        assert!(player.is_depleted());

        player.set_health(-5);
        assert_eq!(player.health, 0);
        player.add_health(i32::MAX);
        assert_eq!(player.health, 100);
    }

    #[test]
    fn test_generate_fresh_state() {
        let config = GameConfig::default();
        let state = GameState::generate(&config, &mut create_rng(&config.generation)).unwrap();

        assert!(is_reachable(&state.grid, state.grid.start(), state.grid.exit()));
        assert_eq!(state.player.position, Position::origin());
        assert!(!state.player.has_key);
        assert_eq!(state.generation, 0);
        assert_eq!(state.statistics, GameStatistics::default());
        assert!(!state.entities.is_empty());
    }

    #[test]
    fn test_rebuild_keeps_health_on_request() {
        let config = GameConfig::default();
        let mut rng = create_rng(&config.generation);
        let mut state = GameState::generate(&config, &mut rng).unwrap();
        state.player.set_health(37);
        state.player.has_key = true;
        state.exit_locked = true;
        let old_grid = state.grid.clone();

        state.rebuild(&config, true, &mut rng).unwrap();
        assert_eq!(state.player.health, 37);
        assert!(!state.player.has_key);
        assert!(!state.exit_locked);
        assert_eq!(state.generation, 1);
        assert_ne!(state.grid, old_grid);

        let event = state.rebuild(&config, false, &mut rng).unwrap();
        assert_eq!(event, GameEvent::MazeRegenerated { generation: 2 });
        assert_eq!(state.player.health, 100);
    }

    #[test]
    fn test_forced_encounters_follow_rebuild() {
        let config = GameConfig::default();
        let mut rng = create_rng(&config.generation);
        let mut state = GameState::generate(&config, &mut rng).unwrap();
        state.forced_encounters.push(Position::new(0, 0));

        state.rebuild(&config, true, &mut rng).unwrap();
        assert!(!state.forced_encounters.contains(&Position::new(0, 0)));
        for pos in &state.forced_encounters {
            assert!(state
                .entities
                .entity_at(*pos)
                .is_some_and(EntityTag::is_creature));
        }
    }

    #[test]
    fn test_statistics_update() {
        let mut stats = GameStatistics::new();
        stats.update_from_event(&GameEvent::PlayerMoved {
            from: Position::new(0, 0),
            to: Position::new(0, 1),
        });
        stats.update_from_event(&GameEvent::EntityRemoved {
            tag: EntityTag::Wolf,
            position: Position::new(0, 1),
        });
        stats.update_from_event(&GameEvent::EntityRemoved {
            tag: EntityTag::HpVial,
            position: Position::new(0, 2),
        });

        assert_eq!(stats.steps_taken, 1);
        assert_eq!(stats.creatures_removed, 1);
        assert_eq!(stats.items_consumed, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let config = GameConfig::default();
        let state = GameState::generate(&config, &mut create_rng(&config.generation)).unwrap();
        let snapshot = GameSnapshot::capture(&state, &EncounterEngine::new());

        assert!(!snapshot.spinning);
        assert_eq!(snapshot.encounter, None);
        let json = snapshot.to_json().unwrap();
        let _: serde_json::Value = serde_json::from_str(&json).unwrap();
    }
}
