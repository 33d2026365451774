//! # Entity Placement
//!
//! Scatters creatures and items over a generated maze.
//!
//! Creatures keep a minimum Manhattan spacing from each other and from the player
//! start. A few cells on the shortest route to the exit are reserved as forced
//! encounters so the player cannot slip through untouched. Items follow the same
//! spacing and never sit on the exit.

use crate::config::{MAX_FORCED_ENCOUNTERS, MIN_FORCED_ENCOUNTERS};
use crate::utils::search::shortest_path;
use crate::{
    EntitySets, EntityTable, EntityTag, GenerationConfig, Grid, MazeError, MazeResult,
    Position,
};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive count range for one entity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub tag: EntityTag,
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub fn new(tag: EntityTag, min: u32, max: u32) -> Self {
        Self { tag, min, max }
    }

    /// Draws a count uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(self.min..=self.max.max(self.min)) as usize
    }
}

/// Placement rules for one maze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Creature ranges, placed in this order
    pub creatures: Vec<CountRange>,
    /// HP vial range
    pub vials: CountRange,
    /// Manhattan distance floor between entities and the player start
    pub min_distance: u32,
    /// Rejection-sampling attempts per batch
    pub max_attempts: u32,
}

impl PlacementConfig {
    /// Builds placement rules from the entity table and generation settings.
    pub fn from_tables(table: &EntityTable, generation: &GenerationConfig) -> Self {
        let range = |tag: EntityTag| {
            let (min, max) = table.count_range(tag);
            CountRange::new(tag, min, max)
        };

        Self {
            creatures: EntityTag::CREATURES.into_iter().map(range).collect(),
            vials: range(EntityTag::HpVial),
            min_distance: generation.min_distance,
            max_attempts: generation.placement_attempts,
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self::from_tables(&EntityTable::default(), &GenerationConfig::default())
    }
}

/// Result of placing entities on a maze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Every placed creature and item
    pub entities: EntitySets,
    /// Shortest-path cells that received a forced creature
    pub forced: Vec<Position>,
}

/// Draws up to `count` cells from `candidates` by rejection sampling.
///
/// A draw is accepted when it is not already taken and lies at least `min_distance`
/// away from every position in `keep_clear` and every earlier pick. Gives up after
/// `max_attempts` draws, so the result may be shorter than `count`. Never returns
/// more picks than there are candidates.
pub fn scatter<R: Rng + ?Sized>(
    candidates: &[Position],
    count: usize,
    keep_clear: &[Position],
    min_distance: u32,
    max_attempts: u32,
    rng: &mut R,
) -> Vec<Position> {
    let count = count.min(candidates.len());
    let mut chosen: Vec<Position> = Vec::with_capacity(count);
    let mut attempts = 0;

    while chosen.len() < count && attempts < max_attempts {
        attempts += 1;
        let Some(&pos) = candidates.choose(rng) else {
            break;
        };

        let clear = keep_clear
            .iter()
            .chain(chosen.iter())
            .all(|other| *other != pos && other.manhattan_distance(pos) >= min_distance);
        if clear {
            chosen.push(pos);
        }
    }

    chosen
}

/// Places creatures, forced encounters and items on a maze.
#[derive(Debug, Clone, Default)]
pub struct EntityPlacer;

impl EntityPlacer {
    pub fn new() -> Self {
        Self
    }

    /// Populates `grid` for a player starting at `player_start`.
    ///
    /// Under-filled creature batches and a missing key are degradations, not errors.
    /// Fails only when the exit cannot be reached, which the maze generator rules out.
    pub fn place<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        player_start: Position,
        config: &PlacementConfig,
        rng: &mut R,
    ) -> MazeResult<Placement> {
        let exit = grid.exit();
        let candidates: Vec<Position> = grid
            .open_positions()
            .into_iter()
            .filter(|pos| *pos != player_start && *pos != grid.start())
            .collect();

        let forced_targets = self.choose_forced(grid, player_start, rng)?;

        let mut entities = EntitySets::new();
        let mut keep_clear = vec![player_start];
        keep_clear.extend(forced_targets.iter().copied());

        for range in &config.creatures {
            let wanted = range.sample(rng);
            let chosen = scatter(
                &candidates,
                wanted,
                &keep_clear,
                config.min_distance,
                config.max_attempts,
                rng,
            );
            if chosen.len() < wanted {
                warn!(
                    "Placed {} of {} {} after {} attempts",
                    chosen.len(),
                    wanted,
                    range.tag,
                    config.max_attempts
                );
            }
            for pos in chosen {
                entities.insert(range.tag, pos);
                keep_clear.push(pos);
            }
        }

        let forced = self.assign_forced(&forced_targets, &mut entities, player_start, config, rng);
        self.place_items(&candidates, player_start, exit, &mut entities, config, rng);

        debug!(
            "Placed {} entities ({} forced) on {}x{} maze",
            entities.len(),
            forced.len(),
            grid.size(),
            grid.size()
        );
        Ok(Placement { entities, forced })
    }

    /// Picks 2 or 3 interior cells on the shortest route to the exit.
    fn choose_forced<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        player_start: Position,
        rng: &mut R,
    ) -> MazeResult<Vec<Position>> {
        let path = shortest_path(grid, player_start, grid.exit());
        if path.is_empty() {
            return Err(MazeError::Unsolvable { size: grid.size() });
        }

        let interior: Vec<Position> = path
            .into_iter()
            .filter(|pos| !grid.is_corner(*pos) && *pos != player_start)
            .collect();
        let count = (interior.len() / 5)
            .clamp(MIN_FORCED_ENCOUNTERS, MAX_FORCED_ENCOUNTERS)
            .min(interior.len());
        Ok(interior.choose_multiple(rng, count).copied().collect())
    }

    /// Hands each forced cell to a random creature if it still honours the spacing.
    fn assign_forced<R: Rng + ?Sized>(
        &self,
        targets: &[Position],
        entities: &mut EntitySets,
        player_start: Position,
        config: &PlacementConfig,
        rng: &mut R,
    ) -> Vec<Position> {
        let mut assigned = Vec::new();

        for &pos in targets {
            let Some(range) = config.creatures.choose(rng) else {
                debug!("No creature kinds configured; dropping forced encounter at {pos}");
                continue;
            };

            let clear = !entities.is_occupied(pos)
                && std::iter::once(player_start)
                    .chain(entities.all_positions())
                    .all(|other| other.manhattan_distance(pos) >= config.min_distance);
            if clear {
                entities.insert(range.tag, pos);
                assigned.push(pos);
            } else {
                debug!("Dropping forced {} at {pos}: too close to another entity", range.tag);
            }
        }

        assigned
    }

    /// Drops HP vials and then the key away from the exit, spaced like creatures.
    fn place_items<R: Rng + ?Sized>(
        &self,
        candidates: &[Position],
        player_start: Position,
        exit: Position,
        entities: &mut EntitySets,
        config: &PlacementConfig,
        rng: &mut R,
    ) {
        let free: Vec<Position> = candidates
            .iter()
            .copied()
            .filter(|pos| *pos != exit && !entities.is_occupied(*pos))
            .collect();
        let mut keep_clear: Vec<Position> = std::iter::once(player_start)
            .chain(entities.all_positions())
            .collect();

        let wanted = config.vials.sample(rng);
        let vials = scatter(
            &free,
            wanted,
            &keep_clear,
            config.min_distance,
            config.max_attempts,
            rng,
        );
        if vials.len() < wanted {
            warn!("Placed {} of {} HP vials", vials.len(), wanted);
        }
        for pos in vials {
            entities.insert(EntityTag::HpVial, pos);
            keep_clear.push(pos);
        }

        let key = scatter(&free, 1, &keep_clear, config.min_distance, config.max_attempts, rng);
        match key.first() {
            Some(&pos) => {
                entities.insert(EntityTag::Key, pos);
            }
            None => warn!("No free cell left for the key; the exit cannot be unlocked"),
        }
    }
}
