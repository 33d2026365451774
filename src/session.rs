//! # Game Session
//!
//! Async driver around a [`GameController`].
//!
//! The session owns the controller and multiplexes player commands with roulette ticks.
//! After every change it publishes a fresh [`GameSnapshot`] on a watch channel and
//! forwards the produced [`GameEvent`]s. The session ends when every command sender
//! has been dropped.

use crate::{
    Command, GameConfig, GameController, GameEvent, GameSnapshot, GameStatistics, MazeError,
    MazeResult, SpinTick,
};
use log::{debug, info};
use tokio::sync::{mpsc, watch};

/// Capacity of the command queue.
const COMMAND_BUFFER: usize = 32;

/// Client side of a running [`GameSession`].
#[derive(Debug)]
pub struct SessionHandle {
    /// Command queue into the session
    pub commands: mpsc::Sender<Command>,
    /// Latest published snapshot
    pub snapshots: watch::Receiver<GameSnapshot>,
    /// Events in the order they happened
    pub events: mpsc::UnboundedReceiver<GameEvent>,
}

impl SessionHandle {
    /// Queues a command for the session.
    pub async fn send(&self, command: Command) -> MazeResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MazeError::InvalidState("game session has ended".to_string()))
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Waits for the next published snapshot.
    pub async fn next_snapshot(&mut self) -> MazeResult<GameSnapshot> {
        self.snapshots
            .changed()
            .await
            .map_err(|_| MazeError::InvalidState("game session has ended".to_string()))?;
        Ok(self.snapshots.borrow_and_update().clone())
    }
}

/// Owns the controller and runs it until the handle goes away.
#[derive(Debug)]
pub struct GameSession {
    controller: GameController,
    commands: mpsc::Receiver<Command>,
    ticks: mpsc::UnboundedReceiver<SpinTick>,
    snapshots: watch::Sender<GameSnapshot>,
    events: mpsc::UnboundedSender<GameEvent>,
}

impl GameSession {
    /// Starts a new game from `config`.
    pub fn new(config: GameConfig) -> MazeResult<(Self, SessionHandle)> {
        Ok(Self::from_controller(GameController::new(config)?))
    }

    /// Wraps an existing controller.
    pub fn from_controller(mut controller: GameController) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        controller.install_tick_sink(tick_tx);

        let session = Self {
            controller,
            commands: command_rx,
            ticks: tick_rx,
            snapshots: snapshot_tx,
            events: event_tx,
        };
        let handle = SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            events: event_rx,
        };
        (session, handle)
    }

    /// Runs until all command senders are dropped, returning the session statistics.
    pub async fn run(mut self) -> MazeResult<GameStatistics> {
        info!("Game session started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    debug!("Command: {command:?}");
                    let events = self.controller.handle(command)?;
                    self.publish(events);
                }
                Some(tick) = self.ticks.recv() => {
                    if let Some(event) = self.controller.tick(tick) {
                        self.publish(vec![event]);
                    }
                }
            }
        }

        let statistics = self.controller.state().statistics.clone();
        info!(
            "Game session ended after {} steps and {} mazes",
            statistics.steps_taken, statistics.mazes_generated
        );
        Ok(statistics)
    }

    fn publish(&mut self, events: Vec<GameEvent>) {
        if events.is_empty() {
            return;
        }
        for event in events {
            if self.events.send(event).is_err() {
                debug!("Event receiver dropped");
            }
        }
        self.snapshots.send_replace(self.controller.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Cell, Direction, EntityRecord, EntitySets, EntityTag, GameResult, GameState, Grid,
        OutcomeOption, PlayerState, Position,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn wolf_session() -> (GameSession, SessionHandle) {
        let mut config = GameConfig::default();
        config.entities.set_record(
            EntityTag::Wolf,
            EntityRecord::new(
                0,
                0,
                vec![
                    OutcomeOption::new("Drive Off", "defeat"),
                    OutcomeOption::new("Bitten", "hp_gain").with_amount(-20),
                ],
            ),
        );

        let mut grid = Grid::new(4);
        let positions: Vec<Position> = grid.positions().collect();
        for pos in positions {
            grid.set(pos, Cell::Open);
        }
        let mut entities = EntitySets::new();
        entities.insert(EntityTag::Wolf, Position::new(0, 1));
        let state = GameState {
            player: PlayerState::new(grid.start(), 100),
            grid,
            entities,
            forced_encounters: Vec::new(),
            result: GameResult::InProgress,
            exit_locked: false,
            reveal_exit_turns: 0,
            generation: 0,
            turn_number: 0,
            statistics: GameStatistics::new(),
        };

        let controller = GameController::with_state(config, state, StdRng::seed_from_u64(5));
        GameSession::from_controller(controller)
    }

    #[tokio::test(start_paused = true)]
    async fn test_encounter_through_session() {
        let (session, mut handle) = wolf_session();
        let task = tokio::spawn(session.run());

        handle.send(Command::Move(Direction::Right)).await.unwrap();
        let spinning = handle.next_snapshot().await.unwrap();
        assert!(spinning.spinning);
        assert_eq!(spinning.player, Position::new(0, 1));

        // One selection from the trigger, then at least two from the ticker.
        let mut selections = 0;
        while selections < 3 {
            if let Some(GameEvent::SelectionChanged { .. }) = handle.events.recv().await {
                selections += 1;
            }
        }

        handle.send(Command::Confirm).await.unwrap();
        handle
            .snapshots
            .wait_for(|snapshot| !snapshot.spinning && snapshot.selected_index.is_some())
            .await
            .unwrap();

        handle.send(Command::Confirm).await.unwrap();
        let done = handle
            .snapshots
            .wait_for(|snapshot| snapshot.encounter.is_none())
            .await
            .unwrap()
            .clone();
        assert!(done.entities.get(&EntityTag::Wolf).map_or(true, Vec::is_empty));

        // No ticks arrive once the roulette stopped.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.snapshot(), done);

        drop(handle);
        let statistics = task.await.unwrap().unwrap();
        assert_eq!(statistics.encounters_started, 1);
        assert_eq!(statistics.encounters_resolved, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_move_publishes_nothing() {
        let (session, mut handle) = wolf_session();
        let initial = handle.snapshot();
        let task = tokio::spawn(session.run());

        handle.send(Command::Move(Direction::Up)).await.unwrap();
        let changed = tokio::time::timeout(Duration::from_secs(1), handle.next_snapshot()).await;
        assert!(changed.is_err());
        assert_eq!(handle.snapshot(), initial);

        drop(handle);
        assert!(task.await.unwrap().is_ok());
    }

    #[test]
    fn test_no_snapshot_before_run() {
        let (_session, mut handle) = wolf_session();
        let mut changed = tokio_test::task::spawn(handle.snapshots.changed());
        tokio_test::assert_pending!(changed.poll());
    }

    #[tokio::test]
    async fn test_send_after_session_ended() {
        let (session, handle) = wolf_session();
        drop(session);
        assert!(matches!(
            handle.send(Command::Confirm).await,
            Err(MazeError::InvalidState(_))
        ));
    }
}
