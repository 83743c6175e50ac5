//! Game-wide settings and combat tuning.

use serde::{Deserialize, Serialize};

use crate::entities::{EnemyId, ItemId, LocationId, QuestId};

/// Penalty applied when a character is defeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathPenalty {
    /// Fraction of carried gold lost, rounded down.
    pub gold_loss_fraction: f64,
    /// Fraction of max hp restored on respawn, rounded down.
    pub hp_restore_fraction: f64,
    pub respawn_location: LocationId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingItem {
    pub item_id: ItemId,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Maximum number of distinct inventory rows.
    pub max_inventory_size: usize,
    pub starting_gold: u64,
    pub starting_location: LocationId,
    #[serde(default)]
    pub starting_quest: Option<QuestId>,
    #[serde(default)]
    pub starting_items: Vec<StartingItem>,
    pub death_penalty: DeathPenalty,
    #[serde(default)]
    pub shop_items: Vec<ItemId>,
    /// Defeating this enemy completes the game.
    #[serde(default)]
    pub final_boss: Option<EnemyId>,
}

/// Numeric knobs of the combat engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    pub crit_chance: f64,
    pub crit_multiplier: f64,
    pub variance_min: f64,
    pub variance_max: f64,
    /// Incoming damage multiplier while defending.
    pub defend_multiplier: f64,
    /// Per-ability trigger chance on a boss turn.
    pub ability_chance: f64,
    pub flee_chance: f64,
    /// Enemies at or above this level are bosses.
    pub boss_level: u32,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            crit_chance: 0.15,
            crit_multiplier: 1.5,
            variance_min: 0.9,
            variance_max: 1.1,
            defend_multiplier: 0.5,
            ability_chance: 0.3,
            flee_chance: 0.5,
            boss_level: 10,
        }
    }
}

impl CombatRules {
    pub fn is_boss(&self, level: u32) -> bool {
        level >= self.boss_level
    }

    /// Rules with all randomness pinned: no crits, no variance.
    pub fn deterministic() -> Self {
        Self {
            crit_chance: 0.0,
            variance_min: 1.0,
            variance_max: 1.0,
            ..Self::default()
        }
    }
}

fn one() -> u32 {
    1
}
