//! Component definitions for characters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{EntityId, ItemId, QuestId};

/// Core numeric stats. `max_mp`, `attack` and `defense` are base values;
/// equipment bonuses are layered on top by [`Equipment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsComponent {
    pub hp: u32,
    pub max_hp: u32,
    pub mp: u32,
    pub max_mp: u32,
    pub attack: u32,
    pub defense: u32,
}

impl Default for StatsComponent {
    fn default() -> Self {
        Self {
            hp: 100,
            max_hp: 100,
            mp: 50,
            max_mp: 50,
            attack: 10,
            defense: 5,
        }
    }
}

/// Additive stat deltas. Used for personality bonuses, level-up growth
/// and equipment bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBonus {
    pub hp: u32,
    pub mp: u32,
    pub attack: u32,
    pub defense: u32,
}

impl std::ops::Add for StatBonus {
    type Output = StatBonus;

    fn add(self, rhs: StatBonus) -> StatBonus {
        StatBonus {
            hp: self.hp + rhs.hp,
            mp: self.mp + rhs.mp,
            attack: self.attack + rhs.attack,
            defense: self.defense + rhs.defense,
        }
    }
}

/// Equipment slots for characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Armor,
}

/// An inventory row currently worn in a slot, with the bonus it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquippedItem {
    pub row: EntityId,
    pub item_id: ItemId,
    pub bonus: StatBonus,
}

/// What the character is wearing. Effective stats are always derived from
/// this, never accumulated into the base stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<EquippedItem>,
    pub armor: Option<EquippedItem>,
}

impl Equipment {
    pub fn slot(&self, slot: EquipmentSlot) -> Option<&EquippedItem> {
        match slot {
            EquipmentSlot::Weapon => self.weapon.as_ref(),
            EquipmentSlot::Armor => self.armor.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: EquipmentSlot) -> &mut Option<EquippedItem> {
        match slot {
            EquipmentSlot::Weapon => &mut self.weapon,
            EquipmentSlot::Armor => &mut self.armor,
        }
    }

    /// Sum of the bonuses of everything equipped.
    pub fn total_bonus(&self) -> StatBonus {
        [&self.weapon, &self.armor]
            .into_iter()
            .flatten()
            .fold(StatBonus::default(), |acc, item| acc + item.bonus)
    }
}

/// One row of a character's bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: EntityId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub equipped: bool,
}

impl InventoryItem {
    pub fn new(item_id: ItemId, quantity: u32) -> Self {
        Self {
            id: EntityId::new(),
            item_id,
            quantity,
            equipped: false,
        }
    }
}

/// A character's bag. Capacity is a catalog setting and counts rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub rows: Vec<InventoryItem>,
}

/// Quest lifecycle: `active` moves to exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Completed,
    Failed,
}

/// Progress of one quest for one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub quest_id: QuestId,
    pub status: QuestStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Quest-specific data, opaque to the engine.
    #[serde(default)]
    pub progress: HashMap<String, serde_json::Value>,
}

/// All quest records of a character, at most one per quest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestLog {
    pub entries: Vec<QuestProgress>,
}

/// Coarse story position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStage {
    #[default]
    Beginning,
    MidGame,
    LateGame,
    FinalBoss,
    Completed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equipped(attack: u32, defense: u32, mp: u32) -> EquippedItem {
        EquippedItem {
            row: EntityId::new(),
            item_id: ItemId::from("test"),
            bonus: StatBonus {
                attack,
                defense,
                mp,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_total_bonus_sums_slots() {
        let equipment = Equipment {
            weapon: Some(equipped(10, 0, 20)),
            armor: Some(equipped(0, 7, 30)),
        };
        let total = equipment.total_bonus();
        assert_eq!(total.attack, 10);
        assert_eq!(total.defense, 7);
        assert_eq!(total.mp, 50);
    }

    #[test]
    fn test_empty_equipment_has_no_bonus() {
        assert_eq!(Equipment::default().total_bonus(), StatBonus::default());
    }

    #[test]
    fn test_slot_mut_targets_right_slot() {
        let mut equipment = Equipment::default();
        *equipment.slot_mut(EquipmentSlot::Armor) = Some(equipped(0, 3, 0));
        assert!(equipment.slot(EquipmentSlot::Weapon).is_none());
        assert_eq!(equipment.slot(EquipmentSlot::Armor).unwrap().bonus.defense, 3);
    }
}
