//! # Entities
//!
//! Creatures and items live in per-tag position sets. An entity has no identity
//! beyond its tag and cell.

use crate::Position;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kinds of entity that can occupy a maze cell.
///
/// The serialized names match the keys of the entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityTag {
    Bones,
    Wolf,
    Maw,
    #[serde(rename = "hp")]
    HpVial,
    Key,
}

impl EntityTag {
    /// All tags in collision priority order: creatures before items.
    pub const COLLISION_ORDER: [EntityTag; 5] = [
        EntityTag::Wolf,
        EntityTag::Bones,
        EntityTag::Maw,
        EntityTag::HpVial,
        EntityTag::Key,
    ];

    /// Creature tags in placement order.
    pub const CREATURES: [EntityTag; 3] = [EntityTag::Bones, EntityTag::Wolf, EntityTag::Maw];

    /// Whether this tag is an adversary rather than a pickup.
    pub fn is_creature(self) -> bool {
        matches!(self, EntityTag::Bones | EntityTag::Wolf | EntityTag::Maw)
    }

    /// Display name used in encounter titles.
    pub fn display_name(self) -> &'static str {
        match self {
            EntityTag::Bones => "Rustling Bones",
            EntityTag::Wolf => "Night Prowler",
            EntityTag::Maw => "The Maw",
            EntityTag::HpVial => "HP Vial",
            EntityTag::Key => "Exit Key",
        }
    }
}

impl std::fmt::Display for EntityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Every placed entity, grouped by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySets {
    sets: BTreeMap<EntityTag, BTreeSet<Position>>,
}

impl EntitySets {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity. Returns false if the tag already had an entity at `pos`.
    pub fn insert(&mut self, tag: EntityTag, pos: Position) -> bool {
        self.sets.entry(tag).or_default().insert(pos)
    }

    /// Removes the entity with this tag at `pos`. Returns whether one was present.
    pub fn remove(&mut self, tag: EntityTag, pos: Position) -> bool {
        let Some(set) = self.sets.get_mut(&tag) else {
            return false;
        };
        let removed = set.remove(&pos);
        if set.is_empty() {
            self.sets.remove(&tag);
        }
        removed
    }

    /// Whether an entity with this tag sits at `pos`.
    pub fn contains(&self, tag: EntityTag, pos: Position) -> bool {
        self.sets.get(&tag).is_some_and(|set| set.contains(&pos))
    }

    /// Whether any entity sits at `pos`.
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.sets.values().any(|set| set.contains(&pos))
    }

    /// The highest-priority entity at `pos`, creatures first.
    pub fn entity_at(&self, pos: Position) -> Option<EntityTag> {
        EntityTag::COLLISION_ORDER
            .into_iter()
            .find(|tag| self.contains(*tag, pos))
    }

    /// Positions holding `tag`, row-major.
    pub fn positions(&self, tag: EntityTag) -> impl Iterator<Item = Position> + '_ {
        self.sets.get(&tag).into_iter().flat_map(|set| set.iter().copied())
    }

    /// Every occupied position across all tags.
    pub fn all_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.sets.values().flat_map(|set| set.iter().copied())
    }

    /// Number of entities with `tag`.
    pub fn count(&self, tag: EntityTag) -> usize {
        self.sets.get(&tag).map_or(0, BTreeSet::len)
    }

    /// Total number of entities.
    pub fn len(&self) -> usize {
        self.sets.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positions grouped by tag, for snapshots.
    pub fn by_tag(&self) -> BTreeMap<EntityTag, Vec<Position>> {
        self.sets
            .iter()
            .map(|(tag, set)| (*tag, set.iter().copied().collect()))
            .collect()
    }
}
