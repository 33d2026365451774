//! # Encounter Engine
//!
//! The roulette state machine that runs whenever the player lands on an entity.
//!
//! ```text
//! Idle --trigger--> Spinning --stop--> Resolved(i) --take_resolved--> Applied --finish--> Idle
//!   ^                  |                   |
//!   +------cancel------+-------------------+
//! ```
//!
//! While spinning, a periodic [`SpinTicker`] emits [`SpinTick`]s tagged with the spin's
//! epoch. Ticks from an earlier spin carry a stale epoch and are ignored.

use crate::config::DEFAULT_SPIN_INTERVAL_MS;
use crate::{weighted_index, EntityTag, MazeError, MazeResult, OutcomeOption, Position};
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// The entity being resolved and the options on its roulette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterDescriptor {
    pub tag: EntityTag,
    pub position: Position,
    pub options: Vec<OutcomeOption>,
}

impl EncounterDescriptor {
    pub fn new(tag: EntityTag, position: Position, options: Vec<OutcomeOption>) -> Self {
        Self {
            tag,
            position,
            options,
        }
    }

    fn weights(&self) -> Vec<f64> {
        self.options.iter().map(|option| option.weight).collect()
    }
}

/// Phase of the encounter state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterPhase {
    Idle,
    Spinning,
    Resolved(usize),
    Applied,
}

/// A roulette redraw request for the spin identified by `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinTick {
    pub epoch: u64,
}

/// Periodic task that feeds [`SpinTick`]s to a channel until stopped.
///
/// The task is aborted when the ticker is stopped or dropped.
#[derive(Debug)]
pub struct SpinTicker {
    handle: JoinHandle<()>,
}

impl SpinTicker {
    /// Spawns the ticker on the current tokio runtime.
    ///
    /// Returns `None` outside a runtime; the roulette then only advances through
    /// explicit ticks.
    pub fn spawn(epoch: u64, period: Duration, sink: UnboundedSender<SpinTick>) -> Option<Self> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No tokio runtime available, spin ticker not started");
                return None;
            }
        };

        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial draw already happened.
            interval.tick().await;
            loop {
                interval.tick().await;
                if sink.send(SpinTick { epoch }).is_err() {
                    break;
                }
            }
        });

        Some(Self { handle })
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for SpinTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The modal encounter state machine.
#[derive(Debug)]
pub struct EncounterEngine {
    phase: EncounterPhase,
    active: Option<EncounterDescriptor>,
    highlighted: Option<usize>,
    epoch: u64,
    spin_interval: Duration,
    tick_sink: Option<UnboundedSender<SpinTick>>,
    ticker: Option<SpinTicker>,
}

impl Default for EncounterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EncounterEngine {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(DEFAULT_SPIN_INTERVAL_MS))
    }

    pub fn with_interval(spin_interval: Duration) -> Self {
        Self {
            phase: EncounterPhase::Idle,
            active: None,
            highlighted: None,
            epoch: 0,
            spin_interval,
            tick_sink: None,
            ticker: None,
        }
    }

    /// Routes spin ticks to `sink`. Without a sink no ticker task is started.
    pub fn install_tick_sink(&mut self, sink: UnboundedSender<SpinTick>) {
        self.tick_sink = Some(sink);
    }

    pub fn phase(&self) -> EncounterPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == EncounterPhase::Idle
    }

    pub fn is_spinning(&self) -> bool {
        self.phase == EncounterPhase::Spinning
    }

    /// Epoch of the current (or most recent) spin.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn active(&self) -> Option<&EncounterDescriptor> {
        self.active.as_ref()
    }

    /// The highlighted index while spinning, or the final one once resolved.
    pub fn selected_index(&self) -> Option<usize> {
        match self.phase {
            EncounterPhase::Spinning => self.highlighted,
            EncounterPhase::Resolved(index) => Some(index),
            EncounterPhase::Idle | EncounterPhase::Applied => None,
        }
    }

    /// Whether a ticker task is currently running.
    pub fn has_ticker(&self) -> bool {
        self.ticker.is_some()
    }

    /// Starts spinning for `descriptor` and draws the first highlighted option.
    pub fn trigger<R: Rng + ?Sized>(
        &mut self,
        descriptor: EncounterDescriptor,
        rng: &mut R,
    ) -> MazeResult<usize> {
        if !self.is_idle() {
            return Err(MazeError::InvalidState(format!(
                "cannot start an encounter while {:?}",
                self.phase
            )));
        }
        let first = weighted_index(&descriptor.weights(), rng).ok_or_else(|| {
            MazeError::InvalidAction(format!("{} has no outcomes", descriptor.tag))
        })?;

        self.epoch += 1;
        debug!(
            "Encounter with {} at {} (spin {})",
            descriptor.tag, descriptor.position, self.epoch
        );
        self.active = Some(descriptor);
        self.highlighted = Some(first);
        self.phase = EncounterPhase::Spinning;
        self.start_ticker();
        Ok(first)
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();
        if let Some(sink) = &self.tick_sink {
            self.ticker = SpinTicker::spawn(self.epoch, self.spin_interval, sink.clone());
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    /// Redraws the highlighted option. Returns the new index, or `None` when the tick is
    /// stale or the engine is not spinning.
    pub fn tick<R: Rng + ?Sized>(&mut self, epoch: u64, rng: &mut R) -> Option<usize> {
        if !self.is_spinning() || epoch != self.epoch {
            return None;
        }
        let weights = self.active.as_ref()?.weights();
        let index = weighted_index(&weights, rng)?;
        self.highlighted = Some(index);
        Some(index)
    }

    /// Freezes the roulette on the highlighted option.
    pub fn stop(&mut self) -> MazeResult<usize> {
        if !self.is_spinning() {
            return Err(MazeError::InvalidState(format!(
                "cannot stop a roulette while {:?}",
                self.phase
            )));
        }
        let index = self
            .highlighted
            .ok_or_else(|| MazeError::InvalidState("spinning without a selection".to_string()))?;

        self.stop_ticker();
        self.phase = EncounterPhase::Resolved(index);
        debug!("Roulette stopped on option {index}");
        Ok(index)
    }

    /// Hands out the resolved option exactly once, moving to `Applied`.
    pub fn take_resolved(&mut self) -> MazeResult<(EncounterDescriptor, OutcomeOption)> {
        let EncounterPhase::Resolved(index) = self.phase else {
            return Err(MazeError::InvalidState(format!(
                "no resolved outcome while {:?}",
                self.phase
            )));
        };
        let descriptor = self
            .active
            .clone()
            .ok_or_else(|| MazeError::InvalidState("resolved without an encounter".to_string()))?;
        let option = descriptor.options.get(index).cloned().ok_or_else(|| {
            MazeError::InvalidState(format!("resolved index {index} out of range"))
        })?;

        self.phase = EncounterPhase::Applied;
        Ok((descriptor, option))
    }

    /// Returns to `Idle` after the outcome was applied.
    pub fn finish(&mut self) {
        if self.phase == EncounterPhase::Applied {
            self.reset();
        }
    }

    /// Abandons any encounter in progress.
    pub fn cancel(&mut self) {
        if !self.is_idle() {
            debug!("Encounter cancelled while {:?}", self.phase);
            // Invalidate ticks already in flight.
            self.epoch += 1;
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.stop_ticker();
        self.phase = EncounterPhase::Idle;
        self.active = None;
        self.highlighted = None;
    }
}
