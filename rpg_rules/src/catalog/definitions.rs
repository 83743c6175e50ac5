//! Static content definitions, deserialized from the catalog document.

use serde::{Deserialize, Serialize};

use crate::entities::{
    ClassId, EnemyId, EquipmentSlot, ItemId, LocationId, PersonalityId, QuestId, StatBonus,
};

/// Broad item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Armor,
    Consumable,
    Quest,
}

/// What a consumable does when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsumableEffect {
    Heal { amount: u32 },
    RestoreMp { amount: u32 },
    FullRestore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub attack_bonus: u32,
    #[serde(default)]
    pub defense_bonus: u32,
    #[serde(default)]
    pub mp_bonus: u32,
    #[serde(default)]
    pub effect: Option<ConsumableEffect>,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub stackable: bool,
}

impl ItemDef {
    /// The slot this item occupies when equipped, if any.
    pub fn slot(&self) -> Option<EquipmentSlot> {
        match self.kind {
            ItemKind::Weapon => Some(EquipmentSlot::Weapon),
            ItemKind::Armor => Some(EquipmentSlot::Armor),
            ItemKind::Consumable | ItemKind::Quest => None,
        }
    }

    /// Stat bonus granted while equipped.
    pub fn bonus(&self) -> StatBonus {
        StatBonus {
            hp: 0,
            mp: self.mp_bonus,
            attack: self.attack_bonus,
            defense: self.defense_bonus,
        }
    }

    pub fn is_consumable(&self) -> bool {
        self.kind == ItemKind::Consumable
    }
}

/// One independent drop roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item_id: ItemId,
    /// Drop probability from 0.0 to 1.0.
    pub chance: f64,
}

/// Boss phase, entered once when hp falls to the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDef {
    pub hp_threshold: u32,
    pub message: String,
    #[serde(default = "unit_multiplier")]
    pub attack_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    pub name: String,
    pub damage_multiplier: f64,
    /// Fraction of the damage dealt that the user heals back.
    #[serde(default)]
    pub heal_percent: Option<f64>,
    /// Turns the ability stays unavailable after use.
    pub cooldown: u32,
    #[serde(default)]
    pub mp_cost: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDef {
    pub id: EnemyId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub level: u32,
    pub max_hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub experience: u64,
    pub gold: u64,
    #[serde(default)]
    pub loot: Vec<LootEntry>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub phases: Vec<PhaseDef>,
    #[serde(default)]
    pub special_abilities: Vec<AbilityDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDef {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub encounters: Vec<EnemyId>,
    /// Probability that exploring here triggers a fight.
    #[serde(default)]
    pub encounter_rate: f64,
    #[serde(default)]
    pub shop_available: bool,
    /// Quest that must be completed before entering.
    #[serde(default)]
    pub requires_quest: Option<QuestId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestRewards {
    pub experience: u64,
    pub gold: u64,
    pub items: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDef {
    pub id: QuestId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub rewards: QuestRewards,
    #[serde(default)]
    pub next_quest: Option<QuestId>,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Starting hp, mp, attack and defense.
    pub base_stats: StatBonus,
    /// Gained on every level-up. `hp` and `mp` raise the maximums.
    pub growth: StatBonus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityDef {
    pub id: PersonalityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stat_bonus: StatBonus,
}

fn unit_multiplier() -> f64 {
    1.0
}
