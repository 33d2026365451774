//! # Encounter Tables
//!
//! Per-entity records describing how many of each entity to place and which
//! outcomes its roulette can land on.
//!
//! The built-in table mirrors the shipped creature data. A JSON table with the same
//! shape overrides individual records while keeping the defaults for the rest.

use crate::{EntityTag, MazeError, MazeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_weight() -> f64 {
    1.0
}

/// One segment of an encounter roulette.
///
/// # Examples
///
/// ```
/// use mazecrawl::OutcomeOption;
///
/// let option: OutcomeOption =
///     serde_json::from_str(r#"{"label": "Bitten", "action": "hp_gain", "amount": -20}"#)
///         .unwrap();
/// assert_eq!(option.amount, Some(-20));
/// assert_eq!(option.weight, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeOption {
    /// Text shown on the roulette segment
    pub label: String,
    /// Symbolic effect name resolved by the action dispatcher
    pub action: String,
    /// Optional signed magnitude for the effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i32>,
    /// Relative likelihood of landing on this segment
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Creature spawned by `spawn_mob`
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub creature: Option<EntityTag>,
}

impl OutcomeOption {
    /// Creates an option with weight 1 and no amount.
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
            amount: None,
            weight: default_weight(),
            creature: None,
        }
    }

    pub fn with_amount(mut self, amount: i32) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_creature(mut self, creature: EntityTag) -> Self {
        self.creature = Some(creature);
        self
    }
}

/// Placement range and roulette for one entity tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Fewest instances to place (inclusive)
    pub min: u32,
    /// Most instances to place (inclusive)
    pub max: u32,
    /// Roulette segments offered when the player collides with this entity
    #[serde(default)]
    pub outcomes: Vec<OutcomeOption>,
}

impl EntityRecord {
    pub fn new(min: u32, max: u32, outcomes: Vec<OutcomeOption>) -> Self {
        Self { min, max, outcomes }
    }

    fn validate(&self, tag: EntityTag) -> MazeResult<()> {
        if self.min > self.max {
            return Err(MazeError::InvalidState(format!(
                "{tag}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        if let Some(option) = self
            .outcomes
            .iter()
            .find(|option| !(option.weight.is_finite() && option.weight > 0.0))
        {
            return Err(MazeError::InvalidState(format!(
                "{tag}: outcome '{}' has non-positive weight {}",
                option.label, option.weight
            )));
        }
        Ok(())
    }
}

/// Records for every entity tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<EntityTag, EntityRecord>",
    into = "BTreeMap<EntityTag, EntityRecord>"
)]
pub struct EntityTable {
    records: BTreeMap<EntityTag, EntityRecord>,
}

impl EntityTable {
    /// Parses a table from JSON text, layered over the defaults.
    pub fn from_json_str(json: &str) -> MazeResult<Self> {
        let table: EntityTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// The record for `tag`, if any.
    pub fn record(&self, tag: EntityTag) -> Option<&EntityRecord> {
        self.records.get(&tag)
    }

    /// Replaces the record for `tag`.
    pub fn set_record(&mut self, tag: EntityTag, record: EntityRecord) {
        self.records.insert(tag, record);
    }

    /// Outcomes offered by `tag`, empty if it has no record.
    pub fn outcomes(&self, tag: EntityTag) -> &[OutcomeOption] {
        self.record(tag)
            .map(|record| record.outcomes.as_slice())
            .unwrap_or(&[])
    }

    /// Inclusive count range for `tag`, (0, 0) if it has no record.
    pub fn count_range(&self, tag: EntityTag) -> (u32, u32) {
        self.record(tag)
            .map(|record| (record.min, record.max))
            .unwrap_or((0, 0))
    }

    /// Checks every record for inverted ranges and bad weights.
    pub fn validate(&self) -> MazeResult<()> {
        for (tag, record) in &self.records {
            record.validate(*tag)?;
        }
        Ok(())
    }
}

impl Default for EntityTable {
    fn default() -> Self {
        let mut records = BTreeMap::new();

        records.insert(
            EntityTag::Bones,
            EntityRecord::new(
                5,
                10,
                vec![
                    OutcomeOption::new("Shatter", "defeat").with_weight(3.0),
                    OutcomeOption::new("Scratched", "hp_gain")
                        .with_amount(-10)
                        .with_weight(2.0),
                    OutcomeOption::new("Bone Storm", "hp_gain").with_amount(-25),
                    OutcomeOption::new("Rattled Loose", "teleport"),
                ],
            ),
        );

        records.insert(
            EntityTag::Wolf,
            EntityRecord::new(
                3,
                5,
                vec![
                    OutcomeOption::new("Drive Off", "defeat").with_weight(2.0),
                    OutcomeOption::new("Bitten", "hp_gain")
                        .with_amount(-20)
                        .with_weight(3.0),
                    OutcomeOption::new("Mauled", "hp_gain").with_amount(-40),
                    OutcomeOption::new("Pack Howl", "spawn_mob")
                        .with_amount(2)
                        .with_creature(EntityTag::Wolf),
                ],
            ),
        );

        records.insert(
            EntityTag::Maw,
            EntityRecord::new(
                0,
                1,
                vec![
                    OutcomeOption::new("Slip Past", "defeat"),
                    OutcomeOption::new("Devoured", "lose"),
                    OutcomeOption::new("The Walls Shift", "shuffle_maze").with_weight(2.0),
                    OutcomeOption::new("Swallowed Whole", "teleport"),
                    OutcomeOption::new("Hunger", "set_hp").with_amount(25),
                    OutcomeOption::new("Sealed In", "lock_exit"),
                ],
            ),
        );

        records.insert(
            EntityTag::HpVial,
            EntityRecord::new(
                1,
                3,
                vec![
                    OutcomeOption::new("+10", "hp_gain")
                        .with_amount(10)
                        .with_weight(3.0),
                    OutcomeOption::new("+25", "hp_gain")
                        .with_amount(25)
                        .with_weight(2.0),
                    OutcomeOption::new("Full Heal", "set_hp").with_amount(100),
                    OutcomeOption::new("Tainted", "hp_gain").with_amount(-10),
                    OutcomeOption::new("Clarity", "reveal_exit").with_amount(5),
                ],
            ),
        );

        records.insert(
            EntityTag::Key,
            EntityRecord::new(1, 1, vec![OutcomeOption::new("Take the Key", "take_key")]),
        );

        Self { records }
    }
}

impl From<BTreeMap<EntityTag, EntityRecord>> for EntityTable {
    fn from(overrides: BTreeMap<EntityTag, EntityRecord>) -> Self {
        let mut table = EntityTable::default();
        table.records.extend(overrides);
        table
    }
}

impl From<EntityTable> for BTreeMap<EntityTag, EntityRecord> {
    fn from(table: EntityTable) -> Self {
        table.records
    }
}
