//! # Game Controller
//!
//! Owns the game state, the encounter engine and the RNG, and advances them in
//! response to commands and spin ticks.

use crate::{
    create_rng, ActionDispatcher, Direction, EncounterDescriptor, EncounterEngine,
    EncounterPhase, GameConfig, GameEvent, GameResult, GameSnapshot, GameState, MazeResult,
    SpinTick,
};
use log::{debug, info};
use rand::rngs::StdRng;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Commands accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Step one cell
    Move(Direction),
    /// Stop a spinning roulette, or apply a resolved one
    Confirm,
    /// Build a fresh maze and reset the player
    Regenerate,
}

/// Single owner of the mutable game aggregate.
///
/// # Examples
///
/// ```
/// use mazecrawl::{Command, Direction, GameConfig, GameController};
///
/// let mut controller = GameController::new(GameConfig::default()).unwrap();
/// controller.handle(Command::Move(Direction::Right)).unwrap();
/// let snapshot = controller.snapshot();
/// assert_eq!(snapshot.health, 100);
/// ```
#[derive(Debug)]
pub struct GameController {
    dispatcher: ActionDispatcher,
    state: GameState,
    encounter: EncounterEngine,
    rng: StdRng,
}

impl GameController {
    /// Validates `config` and generates the first maze from its seed.
    pub fn new(config: GameConfig) -> MazeResult<Self> {
        config.validate()?;
        let mut rng = create_rng(&config.generation);
        let state = GameState::generate(&config, &mut rng)?;
        info!(
            "New {}x{} game (seed {})",
            config.generation.size, config.generation.size, config.generation.seed
        );

        let mut controller = Self::with_state(config, state, rng);
        controller.record(vec![GameEvent::MazeRegenerated { generation: 0 }]);
        Ok(controller)
    }

    /// Wraps an existing state.
    pub fn with_state(config: GameConfig, state: GameState, rng: StdRng) -> Self {
        let interval = Duration::from_millis(config.generation.spin_interval_ms);
        Self {
            dispatcher: ActionDispatcher::new(config),
            state,
            encounter: EncounterEngine::with_interval(interval),
            rng,
        }
    }

    /// Routes roulette ticks to `sink`; see [`EncounterEngine::install_tick_sink`].
    pub fn install_tick_sink(&mut self, sink: UnboundedSender<SpinTick>) {
        self.encounter.install_tick_sink(sink);
    }

    pub fn config(&self) -> &GameConfig {
        self.dispatcher.config()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn encounter(&self) -> &EncounterEngine {
        &self.encounter
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.state, &self.encounter)
    }

    /// Applies a command and returns the events it produced.
    ///
    /// Commands that make no sense right now (moving into a wall, moving mid-encounter,
    /// anything but `Regenerate` after the game ended) produce no events.
    pub fn handle(&mut self, command: Command) -> MazeResult<Vec<GameEvent>> {
        let events = match command {
            Command::Regenerate => self.regenerate()?,
            _ if self.state.result.is_over() => {
                debug!("Ignoring {command:?}: game is {:?}", self.state.result);
                Vec::new()
            }
            Command::Move(direction) => self.move_player(direction)?,
            Command::Confirm => self.confirm()?,
        };
        Ok(self.record(events))
    }

    /// Redraws the roulette for a tick from the current spin.
    pub fn tick(&mut self, tick: SpinTick) -> Option<GameEvent> {
        let index = self.encounter.tick(tick.epoch, &mut self.rng)?;
        Some(GameEvent::SelectionChanged { index })
    }

    fn record(&mut self, events: Vec<GameEvent>) -> Vec<GameEvent> {
        for event in &events {
            self.state.record(event);
        }
        events
    }

    fn regenerate(&mut self) -> MazeResult<Vec<GameEvent>> {
        self.encounter.cancel();
        let event = self
            .state
            .rebuild(self.dispatcher.config(), false, &mut self.rng)?;
        Ok(vec![event])
    }

    fn move_player(&mut self, direction: Direction) -> MazeResult<Vec<GameEvent>> {
        if !self.encounter.is_idle() {
            debug!("Ignoring move {direction:?} during encounter");
            return Ok(Vec::new());
        }

        let from = self.state.player.position;
        let to = from.step(direction);
        if !self.state.grid.is_open(to) {
            return Ok(Vec::new());
        }

        self.state.player.position = to;
        self.state.turn_number += 1;
        self.state.reveal_exit_turns = self.state.reveal_exit_turns.saturating_sub(1);
        let mut events = vec![GameEvent::PlayerMoved { from, to }];

        if let Some(tag) = self.state.entities.entity_at(to) {
            let options = self.dispatcher.config().entities.outcomes(tag).to_vec();
            if options.is_empty() {
                debug!("{tag} at {to} has no outcomes, walking past");
            } else {
                let index = self
                    .encounter
                    .trigger(EncounterDescriptor::new(tag, to, options), &mut self.rng)?;
                events.push(GameEvent::EncounterStarted { tag, position: to });
                events.push(GameEvent::SelectionChanged { index });
                return Ok(events);
            }
        }

        self.check_exit(&mut events);
        Ok(events)
    }

    fn confirm(&mut self) -> MazeResult<Vec<GameEvent>> {
        match self.encounter.phase() {
            EncounterPhase::Spinning => {
                let index = self.encounter.stop()?;
                let label = self
                    .encounter
                    .active()
                    .and_then(|active| active.options.get(index))
                    .map(|option| option.label.clone())
                    .unwrap_or_default();
                Ok(vec![GameEvent::EncounterResolved { index, label }])
            }
            EncounterPhase::Resolved(_) => self.apply_resolved(),
            EncounterPhase::Idle | EncounterPhase::Applied => Ok(Vec::new()),
        }
    }

    /// Applies the resolved outcome, then removes the entity that triggered it.
    fn apply_resolved(&mut self) -> MazeResult<Vec<GameEvent>> {
        let (descriptor, option) = self.encounter.take_resolved()?;
        let generation = self.state.generation;

        let applied =
            self.dispatcher
                .apply_option(&option, descriptor.tag, &mut self.state, &mut self.rng);
        let mut events = match applied {
            Ok(events) => events,
            Err(e) => {
                self.encounter.cancel();
                return Err(e);
            }
        };

        // A rebuilt maze no longer holds the triggering entity.
        if self.state.generation == generation
            && self.state.entities.remove(descriptor.tag, descriptor.position)
        {
            events.push(GameEvent::EntityRemoved {
                tag: descriptor.tag,
                position: descriptor.position,
            });
        }
        self.encounter.finish();

        self.check_exit(&mut events);
        Ok(events)
    }

    fn check_exit(&mut self, events: &mut Vec<GameEvent>) {
        if self.state.result != GameResult::InProgress || !self.state.player_on_exit() {
            return;
        }
        if self.state.player.has_key {
            self.state.result = GameResult::Won;
            info!("Game won in {} turns", self.state.turn_number);
            events.push(GameEvent::GameWon);
        } else {
            debug!("Exit reached without the key");
            events.push(GameEvent::ExitSealed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        is_reachable, Cell, EntityRecord, EntitySets, EntityTag, GameStatistics, Grid,
        OutcomeOption, PlayerState, Position,
    };
    use rand::SeedableRng;

    fn open_state(size: usize, health: i32) -> GameState {
        let mut grid = Grid::new(size);
        let positions: Vec<Position> = grid.positions().collect();
        for pos in positions {
            grid.set(pos, Cell::Open);
        }
        GameState {
            player: PlayerState::new(grid.start(), health),
            grid,
            entities: EntitySets::new(),
            forced_encounters: Vec::new(),
            result: GameResult::InProgress,
            exit_locked: false,
            reveal_exit_turns: 0,
            generation: 0,
            turn_number: 0,
            statistics: GameStatistics::new(),
        }
    }

    fn heal_hurt_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.entities.set_record(
            EntityTag::Wolf,
            EntityRecord::new(
                0,
                0,
                vec![
                    OutcomeOption::new("Heal", "hp_gain").with_amount(20),
                    OutcomeOption::new("Hurt", "hp_gain").with_amount(-20),
                ],
            ),
        );
        config
    }

    fn controller_with(config: GameConfig, state: GameState) -> GameController {
        GameController::with_state(config, state, StdRng::seed_from_u64(99))
    }

    /// Ticks until option `index` is highlighted.
    fn spin_to(controller: &mut GameController, index: usize) {
        for _ in 0..200 {
            if controller.encounter().selected_index() == Some(index) {
                return;
            }
            let epoch = controller.encounter().epoch();
            controller.tick(SpinTick { epoch });
        }
        panic!("option {index} never came up");
    }

    #[test]
    fn test_heal_hurt_scenario() {
        let mut state = open_state(5, 50);
        state.entities.insert(EntityTag::Wolf, Position::new(0, 1));
        let mut controller = controller_with(heal_hurt_config(), state);

        let events = controller.handle(Command::Move(Direction::Right)).unwrap();
        assert!(events.contains(&GameEvent::EncounterStarted {
            tag: EntityTag::Wolf,
            position: Position::new(0, 1)
        }));
        assert!(controller.encounter().is_spinning());

        spin_to(&mut controller, 1);
        let events = controller.handle(Command::Confirm).unwrap();
        assert_eq!(
            events,
            vec![GameEvent::EncounterResolved {
                index: 1,
                label: "Hurt".to_string()
            }]
        );

        controller.handle(Command::Confirm).unwrap();
        assert_eq!(controller.state().player.health, 30);
        assert_eq!(controller.state().entities.count(EntityTag::Wolf), 0);
        assert!(controller.encounter().is_idle());
        assert_eq!(controller.state().statistics.encounters_resolved, 1);
    }

    #[test]
    fn test_moves_ignored_during_encounter() {
        let mut state = open_state(5, 100);
        state.entities.insert(EntityTag::Wolf, Position::new(0, 1));
        let mut controller = controller_with(heal_hurt_config(), state);
        controller.handle(Command::Move(Direction::Right)).unwrap();

        let grid = controller.state().grid.clone();
        for direction in Direction::search_order() {
            let events = controller.handle(Command::Move(direction)).unwrap();
            assert!(events.is_empty());
        }
        assert_eq!(controller.state().player.position, Position::new(0, 1));
        assert_eq!(controller.state().grid, grid);

        controller.handle(Command::Confirm).unwrap();
        assert!(controller
            .handle(Command::Move(Direction::Down))
            .unwrap()
            .is_empty());
        assert_eq!(controller.state().player.position, Position::new(0, 1));
    }

    #[test]
    fn test_wall_and_edge_moves_ignored() {
        let mut state = open_state(3, 100);
        state.grid.set(Position::new(0, 1), Cell::Wall);
        let mut controller = controller_with(GameConfig::default(), state);

        assert!(controller.handle(Command::Move(Direction::Up)).unwrap().is_empty());
        assert!(controller.handle(Command::Move(Direction::Right)).unwrap().is_empty());
        assert_eq!(controller.state().player.position, Position::origin());
        assert_eq!(controller.state().turn_number, 0);
    }

    #[test]
    fn test_exit_needs_key() {
        let mut state = open_state(3, 100);
        state.player.position = Position::new(2, 1);
        let mut controller = controller_with(GameConfig::default(), state);

        let events = controller.handle(Command::Move(Direction::Right)).unwrap();
        assert_eq!(events.last(), Some(&GameEvent::ExitSealed));
        assert_eq!(controller.state().result, GameResult::InProgress);

        controller.handle(Command::Move(Direction::Left)).unwrap();
        controller.state.player.has_key = true;
        let events = controller.handle(Command::Move(Direction::Right)).unwrap();
        assert_eq!(events.last(), Some(&GameEvent::GameWon));
        assert_eq!(controller.state().result, GameResult::Won);

        assert!(controller
            .handle(Command::Move(Direction::Left))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_key_pickup_then_win() {
        let mut state = open_state(3, 100);
        state.player.position = Position::new(1, 2);
        state.entities.insert(EntityTag::Key, Position::new(2, 1));
        let mut controller = controller_with(GameConfig::default(), state);

        controller.handle(Command::Move(Direction::Left)).unwrap();
        controller.handle(Command::Move(Direction::Down)).unwrap();
        controller.handle(Command::Confirm).unwrap();
        let events = controller.handle(Command::Confirm).unwrap();
        assert!(events.contains(&GameEvent::KeyTaken));
        assert!(controller.state().player.has_key);

        let events = controller.handle(Command::Move(Direction::Right)).unwrap();
        assert!(events.contains(&GameEvent::GameWon));
    }

    #[test]
    fn test_lethal_outcome_ends_game() {
        let mut config = GameConfig::default();
        config.entities.set_record(
            EntityTag::Bones,
            EntityRecord::new(
                0,
                0,
                vec![OutcomeOption::new("Crushed", "hp_gain").with_amount(-30)],
            ),
        );
        let mut state = open_state(4, 20);
        state.entities.insert(EntityTag::Bones, Position::new(1, 0));
        let mut controller = controller_with(config, state);

        controller.handle(Command::Move(Direction::Down)).unwrap();
        controller.handle(Command::Confirm).unwrap();
        let events = controller.handle(Command::Confirm).unwrap();

        assert!(events.contains(&GameEvent::GameLost));
        assert_eq!(controller.state().player.health, 0);
        assert_eq!(controller.snapshot().result, GameResult::Lost);
        assert!(controller.handle(Command::Confirm).unwrap().is_empty());

        controller.handle(Command::Regenerate).unwrap();
        assert_eq!(controller.state().result, GameResult::InProgress);
        assert_eq!(controller.state().player.health, 100);
    }

    #[test]
    fn test_entity_without_outcomes_is_walked_past() {
        let mut config = GameConfig::default();
        config
            .entities
            .set_record(EntityTag::Maw, EntityRecord::new(0, 0, Vec::new()));
        let mut state = open_state(4, 100);
        state.entities.insert(EntityTag::Maw, Position::new(0, 1));
        let mut controller = controller_with(config, state);

        let events = controller.handle(Command::Move(Direction::Right)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(controller.encounter().is_idle());
        assert!(controller.state().entities.contains(EntityTag::Maw, Position::new(0, 1)));
    }

    #[test]
    fn test_shuffle_outcome_replaces_maze() {
        let mut config = GameConfig::default();
        config.entities.set_record(
            EntityTag::Maw,
            EntityRecord::new(0, 1, vec![OutcomeOption::new("Shift", "shuffle_maze")]),
        );
        let mut state = open_state(5, 64);
        state.entities.insert(EntityTag::Maw, Position::new(0, 1));
        let mut controller = controller_with(config, state);

        controller.handle(Command::Move(Direction::Right)).unwrap();
        controller.handle(Command::Confirm).unwrap();
        let events = controller.handle(Command::Confirm).unwrap();

        assert!(events.contains(&GameEvent::MazeRegenerated { generation: 1 }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, GameEvent::EntityRemoved { .. })));
        let state = controller.state();
        assert_eq!(state.grid.size(), 20);
        assert_eq!(state.player.health, 64);
        assert_eq!(state.player.position, state.grid.start());
        assert!(is_reachable(&state.grid, state.grid.start(), state.grid.exit()));
        assert!(controller.encounter().is_idle());
    }

    #[test]
    fn test_regenerate_mid_encounter() {
        let mut state = open_state(5, 100);
        state.entities.insert(EntityTag::Wolf, Position::new(0, 1));
        let mut controller = controller_with(heal_hurt_config(), state);
        controller.handle(Command::Move(Direction::Right)).unwrap();
        let stale = controller.encounter().epoch();

        controller.handle(Command::Regenerate).unwrap();
        assert!(controller.encounter().is_idle());
        assert_eq!(controller.tick(SpinTick { epoch: stale }), None);
        assert_eq!(controller.state().generation, 1);
    }

    #[test]
    fn test_new_game_from_seed_is_reproducible() {
        let a = GameController::new(GameConfig::default()).unwrap();
        let b = GameController::new(GameConfig::default()).unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.state().statistics.mazes_generated, 1);
    }
}
