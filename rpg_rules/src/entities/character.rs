//! Character definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    ClassId, EntityId, Equipment, GameStage, Inventory, LocationId, PersonalityId, QuestLog,
    StatsComponent,
};
use crate::catalog::Catalog;
use crate::error::{Result, RulesError};

/// A player character together with the rows it owns.
///
/// Inventory and quest records are embedded so that one read-modify-write of
/// a `Character` covers everything a single request may touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub account_id: String,
    pub name: String,
    pub personality: PersonalityId,
    pub class: ClassId,

    pub level: u32,
    pub experience: u64,
    pub gold: u64,

    // Core components stored directly for frequent access
    pub stats: StatsComponent,
    pub equipment: Equipment,
    pub inventory: Inventory,
    pub quests: QuestLog,

    pub current_location: LocationId,
    pub game_stage: GameStage,

    pub created_at: DateTime<Utc>,
    pub last_played: DateTime<Utc>,
}

impl Character {
    /// Create a character from a class and a personality template.
    ///
    /// Also starts the configured starting quest and hands out the
    /// configured starting items.
    pub fn create(
        catalog: &Catalog,
        account_id: impl Into<String>,
        name: impl Into<String>,
        class_id: &ClassId,
        personality_id: &PersonalityId,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RulesError::Validation("character name is required".into()));
        }
        let class = catalog.require_class(class_id)?;
        let personality = catalog.require_personality(personality_id)?;
        let base = class.base_stats + personality.stat_bonus;
        let settings = catalog.settings();

        let mut character = Self {
            id: EntityId::new(),
            account_id: account_id.into(),
            name,
            personality: personality.id.clone(),
            class: class.id.clone(),
            level: 1,
            experience: 0,
            gold: settings.starting_gold,
            stats: StatsComponent {
                hp: base.hp,
                max_hp: base.hp,
                mp: base.mp,
                max_mp: base.mp,
                attack: base.attack,
                defense: base.defense,
            },
            equipment: Equipment::default(),
            inventory: Inventory::default(),
            quests: QuestLog::default(),
            current_location: settings.starting_location.clone(),
            game_stage: GameStage::Beginning,
            created_at: now,
            last_played: now,
        };

        if let Some(quest) = &settings.starting_quest {
            character.start_quest(catalog, quest, now)?;
        }
        for item in &settings.starting_items {
            character.add_item(catalog, &item.item_id, item.quantity)?;
        }

        tracing::info!(
            character = %character.id,
            name = %character.name,
            class = %character.class,
            "character created"
        );
        Ok(character)
    }

    /// Check if the character is alive.
    pub fn is_alive(&self) -> bool {
        self.stats.hp > 0
    }

    pub fn max_hp(&self) -> u32 {
        self.stats.max_hp + self.equipment.total_bonus().hp
    }

    /// Base max mp plus equipment bonuses.
    pub fn max_mp(&self) -> u32 {
        self.stats.max_mp + self.equipment.total_bonus().mp
    }

    /// Base attack plus the equipped weapon's bonus.
    pub fn attack(&self) -> u32 {
        self.stats.attack + self.equipment.total_bonus().attack
    }

    pub fn defense(&self) -> u32 {
        self.stats.defense + self.equipment.total_bonus().defense
    }

    /// Experience required to reach the next level.
    pub fn experience_needed(&self) -> u64 {
        u64::from(self.level) * 100
    }

    /// Keep hp/mp within the effective maximums.
    pub(crate) fn clamp_resources(&mut self) {
        self.stats.hp = self.stats.hp.min(self.max_hp());
        self.stats.mp = self.stats.mp.min(self.max_mp());
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_played = now;
    }
}
