//! # Battle Actions
//!
//! Typed outcome effects and the dispatcher that applies them to the game state.

use crate::{
    scatter, EntityTag, GameConfig, GameEvent, GameResult, GameState, MazeError, MazeResult,
    OutcomeOption, Position,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::DEFAULT_REVEAL_EXIT_TURNS;

/// An outcome effect, parsed from an [`OutcomeOption`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleAction {
    /// Set health to an absolute value
    SetHp(i32),
    /// Add a signed amount to health
    HpGain(i32),
    /// The entity is beaten; only its removal happens
    Defeat,
    /// The game is lost outright
    Lose,
    /// Rebuild the maze around the player, keeping health
    ShuffleMaze,
    /// Move the player to a random free cell
    Teleport,
    /// Add more creatures to the maze
    SpawnMob { creature: EntityTag, count: u32 },
    /// Show the exit for a number of turns
    RevealExit { turns: u32 },
    /// Mark the exit as locked
    LockExit,
    /// Pick up the exit key
    TakeKey,
}

impl BattleAction {
    /// Parses an outcome triggered by an entity tagged `source`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mazecrawl::{BattleAction, EntityTag, OutcomeOption};
    ///
    /// let option = OutcomeOption::new("Bitten", "hp_gain").with_amount(-20);
    /// let action = BattleAction::from_option(&option, EntityTag::Wolf).unwrap();
    /// assert_eq!(action, BattleAction::HpGain(-20));
    /// ```
    pub fn from_option(option: &OutcomeOption, source: EntityTag) -> MazeResult<Self> {
        let action = match option.action.as_str() {
            "set_hp" => {
                let amount = option.amount.ok_or_else(|| {
                    MazeError::InvalidAction(format!("'{}': set_hp needs an amount", option.label))
                })?;
                BattleAction::SetHp(amount)
            }
            "hp_gain" => BattleAction::HpGain(option.amount.unwrap_or(0)),
            "defeat" => BattleAction::Defeat,
            "lose" => BattleAction::Lose,
            "shuffle_maze" => BattleAction::ShuffleMaze,
            "teleport" => BattleAction::Teleport,
            "spawn_mob" => {
                let creature = option
                    .creature
                    .or_else(|| source.is_creature().then_some(source))
                    .filter(|tag| tag.is_creature())
                    .ok_or_else(|| {
                        MazeError::InvalidAction(format!(
                            "'{}': spawn_mob has no creature to spawn",
                            option.label
                        ))
                    })?;
                let count = option.amount.unwrap_or(1).max(0) as u32;
                BattleAction::SpawnMob { creature, count }
            }
            "reveal_exit" => BattleAction::RevealExit {
                turns: option
                    .amount
                    .map(|turns| turns.max(0) as u32)
                    .unwrap_or(DEFAULT_REVEAL_EXIT_TURNS),
            },
            "lock_exit" => BattleAction::LockExit,
            "take_key" => BattleAction::TakeKey,
            other => return Err(MazeError::UnknownAction(other.to_string())),
        };
        Ok(action)
    }

    /// The configuration name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            BattleAction::SetHp(_) => "set_hp",
            BattleAction::HpGain(_) => "hp_gain",
            BattleAction::Defeat => "defeat",
            BattleAction::Lose => "lose",
            BattleAction::ShuffleMaze => "shuffle_maze",
            BattleAction::Teleport => "teleport",
            BattleAction::SpawnMob { .. } => "spawn_mob",
            BattleAction::RevealExit { .. } => "reveal_exit",
            BattleAction::LockExit => "lock_exit",
            BattleAction::TakeKey => "take_key",
        }
    }
}

/// Applies battle actions to a [`GameState`].
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    config: GameConfig,
}

impl ActionDispatcher {
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Parses and applies an outcome option.
    ///
    /// Options that fail to parse are logged and skipped, so an encounter never stalls
    /// on bad configuration. The `OutcomeApplied` event is emitted either way.
    pub fn apply_option(
        &self,
        option: &OutcomeOption,
        source: EntityTag,
        state: &mut GameState,
        rng: &mut StdRng,
    ) -> MazeResult<Vec<GameEvent>> {
        let mut events = vec![GameEvent::OutcomeApplied {
            label: option.label.clone(),
            action: option.action.clone(),
        }];

        match BattleAction::from_option(option, source) {
            Ok(action) => events.extend(self.apply(action, state, rng)?),
            Err(e @ (MazeError::UnknownAction(_) | MazeError::InvalidAction(_))) => {
                warn!("Skipping outcome '{}' from {source}: {e}", option.label);
            }
            Err(e) => return Err(e),
        }
        Ok(events)
    }

    /// Applies one action and returns the events it produced.
    pub fn apply(
        &self,
        action: BattleAction,
        state: &mut GameState,
        rng: &mut StdRng,
    ) -> MazeResult<Vec<GameEvent>> {
        debug!("Applying {}", action.name());
        let mut events = Vec::new();

        match action {
            BattleAction::SetHp(amount) => {
                let from = state.player.set_health(amount);
                self.health_changed(state, from, &mut events);
            }
            BattleAction::HpGain(amount) => {
                let from = state.player.add_health(amount);
                self.health_changed(state, from, &mut events);
            }
            BattleAction::Defeat => {}
            BattleAction::Lose => {
                self.lose(state, &mut events);
            }
            BattleAction::ShuffleMaze => {
                events.push(state.rebuild(&self.config, true, rng)?);
            }
            BattleAction::Teleport => {
                if let Some(event) = self.teleport(state, rng) {
                    events.push(event);
                }
            }
            BattleAction::SpawnMob { creature, count } => {
                events.extend(self.spawn(state, creature, count as usize, rng));
            }
            BattleAction::RevealExit { turns } => {
                state.reveal_exit_turns = turns;
                events.push(GameEvent::ExitRevealed { turns });
            }
            BattleAction::LockExit => {
                state.exit_locked = true;
                events.push(GameEvent::ExitLocked);
            }
            BattleAction::TakeKey => {
                state.player.has_key = true;
                events.push(GameEvent::KeyTaken);
            }
        }

        Ok(events)
    }

    fn health_changed(&self, state: &mut GameState, from: i32, events: &mut Vec<GameEvent>) {
        let to = state.player.health;
        if from != to {
            events.push(GameEvent::HealthChanged { from, to });
        }
        if state.player.is_depleted() {
            self.lose(state, events);
        }
    }

    fn lose(&self, state: &mut GameState, events: &mut Vec<GameEvent>) {
        if state.result != GameResult::Lost {
            state.result = GameResult::Lost;
            info!("Game lost with {} health", state.player.health);
            events.push(GameEvent::GameLost);
        }
    }

    /// Moves the player to a random open cell that is not a corner, not occupied and not
    /// the current cell. Does nothing when no such cell exists.
    fn teleport(&self, state: &mut GameState, rng: &mut StdRng) -> Option<GameEvent> {
        let from = state.player.position;
        let targets: Vec<Position> = state
            .grid
            .open_positions()
            .into_iter()
            .filter(|pos| {
                *pos != from && !state.grid.is_corner(*pos) && !state.entities.is_occupied(*pos)
            })
            .collect();

        let Some(&to) = targets.choose(rng) else {
            warn!("Teleport found no free cell; player stays at {from}");
            return None;
        };
        state.player.position = to;
        debug!("Teleported player {from} -> {to}");
        Some(GameEvent::PlayerTeleported { from, to })
    }

    /// Scatters up to `count` new creatures away from everything already on the board.
    fn spawn(
        &self,
        state: &mut GameState,
        creature: EntityTag,
        count: usize,
        rng: &mut StdRng,
    ) -> Vec<GameEvent> {
        let candidates: Vec<Position> = state
            .grid
            .open_positions()
            .into_iter()
            .filter(|pos| !state.grid.is_corner(*pos))
            .collect();
        let mut keep_clear: Vec<Position> = state.entities.all_positions().collect();
        keep_clear.push(state.player.position);
        let count = count.min(candidates.len());

        let generation = &self.config.generation;
        let spawned = scatter(
            &candidates,
            count,
            &keep_clear,
            generation.min_distance,
            generation.placement_attempts,
            rng,
        );
        if spawned.len() < count {
            warn!("Spawned {} of {count} {creature}", spawned.len());
        }

        spawned
            .into_iter()
            .filter(|pos| state.entities.insert(creature, *pos))
            .map(|position| GameEvent::EntitySpawned {
                tag: creature,
                position,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_rng, is_reachable, Cell, EntitySets, Grid};

    fn setup() -> (ActionDispatcher, GameState, StdRng) {
        let config = GameConfig::default();
        let mut rng = create_rng(&config.generation);
        let state = GameState::generate(&config, &mut rng).unwrap();
        (ActionDispatcher::new(config), state, rng)
    }

    #[test]
    fn test_parse_actions() {
        let parse = |option: OutcomeOption| BattleAction::from_option(&option, EntityTag::Bones);

        assert_eq!(
            parse(OutcomeOption::new("Heal", "hp_gain").with_amount(10)).unwrap(),
            BattleAction::HpGain(10)
        );
        assert_eq!(
            parse(OutcomeOption::new("Nothing", "hp_gain")).unwrap(),
            BattleAction::HpGain(0)
        );
        assert_eq!(
            parse(OutcomeOption::new("Clarity", "reveal_exit")).unwrap(),
            BattleAction::RevealExit {
                turns: DEFAULT_REVEAL_EXIT_TURNS
            }
        );
        assert_eq!(
            parse(OutcomeOption::new("Rise", "spawn_mob").with_amount(2)).unwrap(),
            BattleAction::SpawnMob {
                creature: EntityTag::Bones,
                count: 2
            }
        );
        assert!(matches!(
            parse(OutcomeOption::new("Dance", "dance")),
            Err(MazeError::UnknownAction(name)) if name == "dance"
        ));
        assert!(matches!(
            parse(OutcomeOption::new("Broken", "set_hp")),
            Err(MazeError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_spawn_from_item_needs_creature() {
        let option = OutcomeOption::new("Summon", "spawn_mob");
        assert!(BattleAction::from_option(&option, EntityTag::HpVial).is_err());

        let option = option.with_creature(EntityTag::Wolf);
        assert_eq!(
            BattleAction::from_option(&option, EntityTag::HpVial).unwrap(),
            BattleAction::SpawnMob {
                creature: EntityTag::Wolf,
                count: 1
            }
        );
    }

    #[test]
    fn test_hp_gain_to_zero_loses() {
        let (dispatcher, mut state, mut rng) = setup();
        state.player.set_health(20);

        let events = dispatcher
            .apply(BattleAction::HpGain(-30), &mut state, &mut rng)
            .unwrap();
        assert_eq!(state.player.health, 0);
        assert_eq!(state.result, GameResult::Lost);
        assert!(events.contains(&GameEvent::GameLost));
    }

    #[test]
    fn test_set_hp_clamps() {
        let (dispatcher, mut state, mut rng) = setup();
        dispatcher
            .apply(BattleAction::SetHp(150), &mut state, &mut rng)
            .unwrap();
        assert_eq!(state.player.health, 100);
        assert_eq!(state.result, GameResult::InProgress);

        dispatcher
            .apply(BattleAction::SetHp(-4), &mut state, &mut rng)
            .unwrap();
        assert_eq!(state.player.health, 0);
        assert_eq!(state.result, GameResult::Lost);
    }

    #[test]
    fn test_lose_and_defeat() {
        let (dispatcher, mut state, mut rng) = setup();
        let before = state.clone();
        let events = dispatcher
            .apply(BattleAction::Defeat, &mut state, &mut rng)
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(state, before);

        dispatcher
            .apply(BattleAction::Lose, &mut state, &mut rng)
            .unwrap();
        assert_eq!(state.result, GameResult::Lost);
        assert_eq!(state.player.health, before.player.health);
    }

    #[test]
    fn test_shuffle_keeps_health() {
        let (dispatcher, mut state, mut rng) = setup();
        state.player.set_health(42);
        state.player.position = Position::new(5, 5);
        let old_grid = state.grid.clone();

        let events = dispatcher
            .apply(BattleAction::ShuffleMaze, &mut state, &mut rng)
            .unwrap();
        assert_eq!(events, vec![GameEvent::MazeRegenerated { generation: 1 }]);
        assert_ne!(state.grid, old_grid);
        assert_eq!(state.player.health, 42);
        assert_eq!(state.player.position, state.grid.start());
        assert!(is_reachable(&state.grid, state.grid.start(), state.grid.exit()));
    }

    #[test]
    fn test_teleport_lands_on_free_cell() {
        let (dispatcher, mut state, mut rng) = setup();
        let from = state.player.position;

        let events = dispatcher
            .apply(BattleAction::Teleport, &mut state, &mut rng)
            .unwrap();
        let to = state.player.position;
        assert_eq!(events, vec![GameEvent::PlayerTeleported { from, to }]);
        assert!(state.grid.is_open(to));
        assert!(!state.grid.is_corner(to));
        assert!(!state.entities.is_occupied(to));
    }

    #[test]
    fn test_teleport_without_room_is_noop() {
        let (dispatcher, mut state, mut rng) = setup();
        let mut grid = Grid::new(3);
        grid.set(grid.start(), Cell::Open);
        grid.set(grid.exit(), Cell::Open);
        state.grid = grid;
        state.entities = EntitySets::new();
        state.player.position = state.grid.start();

        let events = dispatcher
            .apply(BattleAction::Teleport, &mut state, &mut rng)
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(state.player.position, Position::origin());
    }

    #[test]
    fn test_spawn_respects_spacing() {
        let (dispatcher, mut state, mut rng) = setup();
        let before: Vec<Position> = state.entities.all_positions().collect();
        let wolves = state.entities.count(EntityTag::Wolf);

        let events = dispatcher
            .apply(
                BattleAction::SpawnMob {
                    creature: EntityTag::Wolf,
                    count: 2,
                },
                &mut state,
                &mut rng,
            )
            .unwrap();

        assert_eq!(state.entities.count(EntityTag::Wolf), wolves + events.len());
        let min_distance = dispatcher.config().generation.min_distance;
        for event in &events {
            let GameEvent::EntitySpawned { tag, position } = event else {
                panic!("unexpected event {event:?}");
            };
            assert_eq!(*tag, EntityTag::Wolf);
            assert!(!state.grid.is_corner(*position));
            assert!(position.manhattan_distance(state.player.position) >= min_distance);
            for other in &before {
                assert!(position.manhattan_distance(*other) >= min_distance);
            }
        }
    }

    #[test]
    fn test_spawn_with_huge_amount_underfills() {
        let (dispatcher, mut state, mut rng) = setup();
        let open = state.grid.open_count();
        let option = OutcomeOption::new("Horde", "spawn_mob")
            .with_creature(EntityTag::Bones)
            .with_amount(i32::MAX);

        let events = dispatcher
            .apply_option(&option, EntityTag::Wolf, &mut state, &mut rng)
            .unwrap();

        let spawned = events
            .iter()
            .filter(|event| matches!(event, GameEvent::EntitySpawned { .. }))
            .count();
        assert!(spawned < open);
        assert!(state.entities.len() <= open);
        assert_eq!(state.result, GameResult::InProgress);
    }

    #[test]
    fn test_exit_flags_and_key() {
        let (dispatcher, mut state, mut rng) = setup();
        dispatcher
            .apply(BattleAction::RevealExit { turns: 5 }, &mut state, &mut rng)
            .unwrap();
        dispatcher
            .apply(BattleAction::LockExit, &mut state, &mut rng)
            .unwrap();
        dispatcher
            .apply(BattleAction::TakeKey, &mut state, &mut rng)
            .unwrap();

        assert_eq!(state.reveal_exit_turns, 5);
        assert!(state.exit_locked);
        assert!(state.player.has_key);
        assert_eq!(state.result, GameResult::InProgress);
    }

    #[test]
    fn test_unknown_option_is_noop() {
        let (dispatcher, mut state, mut rng) = setup();
        let before = state.clone();
        let option = OutcomeOption::new("Dance", "dance");

        let events = dispatcher
            .apply_option(&option, EntityTag::Bones, &mut state, &mut rng)
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(state, before);
    }
}
