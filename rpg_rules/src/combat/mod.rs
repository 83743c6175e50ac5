//! Encounter state machine: `active -> victory | defeat | fled`.
//!
//! A [`CombatState`] is a value owned by whoever holds the encounter. The
//! [`CombatEngine`] mutates it together with the [`Character`] it concerns;
//! every player action resolves the enemy reply before returning.

pub mod damage;
mod engine;

pub use engine::{roll_loot, CombatEngine};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{CombatRules, EnemyDef};
use crate::entities::{Character, EnemyId, ItemId};

/// A player's choice for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CombatAction {
    Attack,
    Defend,
    Flee,
    UseItem { item_id: ItemId },
}

/// Action kinds offered to the player, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    Defend,
    Flee,
    UseItem,
}

/// The enemy as it stands in this encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: EnemyId,
    pub name: String,
    pub icon: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    /// Current attack, including phase multipliers.
    pub attack: u32,
    pub defense: u32,
    /// Number of phases already entered.
    pub phase: usize,
    /// Remaining cooldown per ability name.
    pub cooldowns: BTreeMap<String, u32>,
}

impl EnemySnapshot {
    pub fn new(def: &EnemyDef) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            icon: def.icon.clone(),
            level: def.level,
            hp: def.max_hp,
            max_hp: def.max_hp,
            attack: def.attack,
            defense: def.defense,
            phase: 0,
            cooldowns: BTreeMap::new(),
        }
    }

    pub fn cooldown(&self, ability: &str) -> u32 {
        self.cooldowns.get(ability).copied().unwrap_or(0)
    }
}

/// Read-only view of the character's combat stats, refreshed every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantStats {
    pub hp: u32,
    pub max_hp: u32,
    pub mp: u32,
    pub max_mp: u32,
    pub attack: u32,
    pub defense: u32,
}

impl CombatantStats {
    pub fn of(character: &Character) -> Self {
        Self {
            hp: character.stats.hp,
            max_hp: character.max_hp(),
            mp: character.stats.mp,
            max_mp: character.max_mp(),
            attack: character.attack(),
            defense: character.defense(),
        }
    }
}

/// What a victory paid out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRewards {
    pub experience: u64,
    pub gold: u64,
    pub level_ups: u32,
    /// Every item that dropped, duplicates included.
    pub loot: Vec<ItemId>,
    /// Drops that did not fit in the bag.
    pub unclaimed_loot: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory(CombatRewards),
    Defeat { gold_lost: u64 },
    Fled,
}

/// Result of a flee attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleeResult {
    Escaped,
    Failed,
    /// Bosses cannot be fled from.
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    pub active: bool,
    pub turn: u32,
    pub enemy: EnemySnapshot,
    pub character: CombatantStats,
    /// Append-only narrative of the encounter.
    pub log: Vec<String>,
    /// Only ever true while a defended enemy turn is being resolved.
    pub defending: bool,
    pub fled: bool,
    pub victory: Option<bool>,
    pub game_complete: bool,
    pub outcome: Option<CombatOutcome>,
}

impl CombatState {
    /// Actions the player may choose right now. Empty once combat is over.
    pub fn available_actions(&self, rules: &CombatRules) -> Vec<ActionKind> {
        if !self.active {
            return Vec::new();
        }
        let mut actions = vec![ActionKind::Attack, ActionKind::Defend];
        if !rules.is_boss(self.enemy.level) {
            actions.push(ActionKind::Flee);
        }
        actions.push(ActionKind::UseItem);
        actions
    }

    /// The most recent `n` log lines, oldest first.
    pub fn recent_log(&self, n: usize) -> &[String] {
        &self.log[self.log.len().saturating_sub(n)..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn state_for(enemy: &str) -> CombatState {
        let catalog = Catalog::builtin().unwrap();
        CombatState {
            active: true,
            turn: 1,
            enemy: EnemySnapshot::new(catalog.enemy(enemy).unwrap()),
            character: CombatantStats {
                hp: 1,
                max_hp: 1,
                mp: 0,
                max_mp: 0,
                attack: 1,
                defense: 1,
            },
            log: vec!["a".into(), "b".into(), "c".into()],
            defending: false,
            fled: false,
            victory: None,
            game_complete: false,
            outcome: None,
        }
    }

    #[test]
    fn test_action_wire_format() {
        let action: CombatAction =
            serde_json::from_str(r#"{"action":"use_item","item_id":"health_potion"}"#).unwrap();
        assert_eq!(
            action,
            CombatAction::UseItem {
                item_id: ItemId::from("health_potion")
            }
        );
        let attack: CombatAction = serde_json::from_str(r#"{"action":"attack"}"#).unwrap();
        assert_eq!(attack, CombatAction::Attack);
        assert!(serde_json::from_str::<CombatAction>(r#"{"action":"dance"}"#).is_err());
    }

    #[test]
    fn test_available_actions() {
        let rules = CombatRules::default();
        assert_eq!(
            state_for("slime").available_actions(&rules),
            vec![
                ActionKind::Attack,
                ActionKind::Defend,
                ActionKind::Flee,
                ActionKind::UseItem
            ]
        );
        assert!(!state_for("dragon")
            .available_actions(&rules)
            .contains(&ActionKind::Flee));

        let mut over = state_for("slime");
        over.active = false;
        assert!(over.available_actions(&rules).is_empty());
    }

    #[test]
    fn test_recent_log() {
        let state = state_for("slime");
        assert_eq!(state.recent_log(2), ["b", "c"]);
        assert_eq!(state.recent_log(10).len(), 3);
    }
}
