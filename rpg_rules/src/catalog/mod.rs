//! The catalog: immutable game content loaded once and shared by reference.
//!
//! Content lives in a TOML document. [`Catalog::builtin`] parses the copy
//! bundled with the crate; [`Catalog::from_toml_str`] accepts a substitute.
//! Every cross-reference is checked at load time so lookups made by the
//! engine afterwards only fail on ids that came from outside.

mod definitions;
mod settings;

pub use definitions::*;
pub use settings::*;

use serde::Deserialize;
use std::collections::HashMap;
use std::hash::Hash;

use crate::entities::{ClassId, EnemyId, ItemId, LocationId, PersonalityId, QuestId};
use crate::error::{Result, RulesError};

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.toml");

/// On-disk shape of the catalog document.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    settings: GameSettings,
    #[serde(default)]
    combat: CombatRules,
    #[serde(default)]
    personalities: Vec<PersonalityDef>,
    #[serde(default)]
    classes: Vec<ClassDef>,
    #[serde(default)]
    items: Vec<ItemDef>,
    #[serde(default)]
    enemies: Vec<EnemyDef>,
    #[serde(default)]
    locations: Vec<LocationDef>,
    #[serde(default)]
    quests: Vec<QuestDef>,
}

/// Read-only lookup tables for all game content.
#[derive(Debug, Clone)]
pub struct Catalog {
    settings: GameSettings,
    combat: CombatRules,
    personalities: HashMap<PersonalityId, PersonalityDef>,
    classes: HashMap<ClassId, ClassDef>,
    items: HashMap<ItemId, ItemDef>,
    enemies: HashMap<EnemyId, EnemyDef>,
    locations: HashMap<LocationId, LocationDef>,
    quests: HashMap<QuestId, QuestDef>,
}

impl Catalog {
    /// Load the content bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let doc: CatalogDocument =
            toml::from_str(source).map_err(|e| RulesError::InvalidCatalog(e.to_string()))?;

        let catalog = Self {
            settings: doc.settings,
            combat: doc.combat,
            personalities: index("personality", doc.personalities, |p| p.id.clone())?,
            classes: index("class", doc.classes, |c| c.id.clone())?,
            items: index("item", doc.items, |i| i.id.clone())?,
            enemies: index("enemy", doc.enemies, |e| e.id.clone())?,
            locations: index("location", doc.locations, |l| l.id.clone())?,
            quests: index("quest", doc.quests, |q| q.id.clone())?,
        };
        catalog.validate()?;

        tracing::debug!(
            items = catalog.items.len(),
            enemies = catalog.enemies.len(),
            locations = catalog.locations.len(),
            quests = catalog.quests.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Replace the combat tuning. Mostly useful for pinning randomness.
    pub fn with_combat_rules(mut self, rules: CombatRules) -> Self {
        self.combat = rules;
        self
    }

    /// Replace the game settings.
    pub fn with_settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn combat_rules(&self) -> &CombatRules {
        &self.combat
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyDef> {
        self.enemies.get(id)
    }

    pub fn location(&self, id: &str) -> Option<&LocationDef> {
        self.locations.get(id)
    }

    pub fn quest(&self, id: &str) -> Option<&QuestDef> {
        self.quests.get(id)
    }

    pub fn class(&self, id: &str) -> Option<&ClassDef> {
        self.classes.get(id)
    }

    pub fn personality(&self, id: &str) -> Option<&PersonalityDef> {
        self.personalities.get(id)
    }

    pub fn require_item(&self, id: &ItemId) -> Result<&ItemDef> {
        self.item(id.as_str())
            .ok_or_else(|| RulesError::UnknownItem(id.clone()))
    }

    pub fn require_enemy(&self, id: &EnemyId) -> Result<&EnemyDef> {
        self.enemy(id.as_str())
            .ok_or_else(|| RulesError::UnknownEnemy(id.clone()))
    }

    pub fn require_location(&self, id: &LocationId) -> Result<&LocationDef> {
        self.location(id.as_str())
            .ok_or_else(|| RulesError::UnknownLocation(id.clone()))
    }

    pub fn require_quest(&self, id: &QuestId) -> Result<&QuestDef> {
        self.quest(id.as_str())
            .ok_or_else(|| RulesError::UnknownQuest(id.clone()))
    }

    pub fn require_class(&self, id: &ClassId) -> Result<&ClassDef> {
        self.class(id.as_str())
            .ok_or_else(|| RulesError::UnknownClass(id.clone()))
    }

    pub fn require_personality(&self, id: &PersonalityId) -> Result<&PersonalityDef> {
        self.personality(id.as_str())
            .ok_or_else(|| RulesError::UnknownPersonality(id.clone()))
    }

    /// All locations, sorted by id.
    pub fn locations(&self) -> Vec<&LocationDef> {
        sorted(&self.locations)
    }

    /// All classes, sorted by id.
    pub fn classes(&self) -> Vec<&ClassDef> {
        sorted(&self.classes)
    }

    /// All personalities, sorted by id.
    pub fn personalities(&self) -> Vec<&PersonalityDef> {
        sorted(&self.personalities)
    }

    /// Shop stock in configured order.
    pub fn shop_listing(&self) -> Vec<&ItemDef> {
        self.settings
            .shop_items
            .iter()
            .filter_map(|id| self.item(id.as_str()))
            .collect()
    }

    pub fn in_shop(&self, id: &ItemId) -> bool {
        self.settings.shop_items.contains(id)
    }

    pub fn is_final_boss(&self, id: &EnemyId) -> bool {
        self.settings.final_boss.as_ref() == Some(id)
    }

    /// Check that every id referenced anywhere resolves.
    fn validate(&self) -> Result<()> {
        let s = &self.settings;
        self.expect_location(&s.starting_location, "settings.starting_location")?;
        self.expect_location(
            &s.death_penalty.respawn_location,
            "settings.death_penalty.respawn_location",
        )?;
        if let Some(quest) = &s.starting_quest {
            self.expect_quest(quest, "settings.starting_quest")?;
        }
        for item in &s.starting_items {
            self.expect_item(&item.item_id, "settings.starting_items")?;
        }
        for item in &s.shop_items {
            self.expect_item(item, "settings.shop_items")?;
        }
        if let Some(boss) = &s.final_boss {
            if !self.enemies.contains_key(boss) {
                return Err(dangling("settings.final_boss", boss));
            }
        }
        if s.max_inventory_size == 0 {
            return Err(RulesError::InvalidCatalog(
                "settings.max_inventory_size must be positive".into(),
            ));
        }
        for fraction in [
            s.death_penalty.gold_loss_fraction,
            s.death_penalty.hp_restore_fraction,
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(RulesError::InvalidCatalog(format!(
                    "death penalty fraction {fraction} outside [0, 1]"
                )));
            }
        }

        if let Some(item) = s.starting_items.iter().find(|i| i.quantity == 0) {
            return Err(RulesError::InvalidCatalog(format!(
                "settings.starting_items: {} has quantity 0",
                item.item_id
            )));
        }

        let rules = &self.combat;
        if rules.variance_min > rules.variance_max {
            return Err(RulesError::InvalidCatalog(format!(
                "combat.variance_min {} exceeds variance_max {}",
                rules.variance_min, rules.variance_max
            )));
        }
        expect_chance(rules.crit_chance, "combat.crit_chance")?;
        expect_chance(rules.ability_chance, "combat.ability_chance")?;
        expect_chance(rules.flee_chance, "combat.flee_chance")?;

        for enemy in self.enemies.values() {
            for entry in &enemy.loot {
                self.expect_item(&entry.item_id, &format!("enemy {} loot", enemy.id))?;
                expect_chance(entry.chance, &format!("enemy {} loot chance", enemy.id))?;
            }
        }
        for location in self.locations.values() {
            for enemy in &location.encounters {
                if !self.enemies.contains_key(enemy) {
                    return Err(dangling(&format!("location {} encounters", location.id), enemy));
                }
            }
            expect_chance(
                location.encounter_rate,
                &format!("location {} encounter_rate", location.id),
            )?;
            if let Some(quest) = &location.requires_quest {
                self.expect_quest(quest, &format!("location {} requires_quest", location.id))?;
            }
        }
        for quest in self.quests.values() {
            for item in &quest.rewards.items {
                self.expect_item(item, &format!("quest {} rewards", quest.id))?;
            }
            if let Some(next) = &quest.next_quest {
                self.expect_quest(next, &format!("quest {} next_quest", quest.id))?;
            }
        }
        for item in self.items.values() {
            if item.is_consumable() && item.effect.is_none() {
                return Err(RulesError::InvalidCatalog(format!(
                    "consumable {} has no effect",
                    item.id
                )));
            }
        }
        Ok(())
    }

    fn expect_item(&self, id: &ItemId, context: &str) -> Result<()> {
        if self.items.contains_key(id) {
            Ok(())
        } else {
            Err(dangling(context, id))
        }
    }

    fn expect_quest(&self, id: &QuestId, context: &str) -> Result<()> {
        if self.quests.contains_key(id) {
            Ok(())
        } else {
            Err(dangling(context, id))
        }
    }

    fn expect_location(&self, id: &LocationId, context: &str) -> Result<()> {
        if self.locations.contains_key(id) {
            Ok(())
        } else {
            Err(dangling(context, id))
        }
    }
}

fn expect_chance(chance: f64, context: &str) -> Result<()> {
    if (0.0..=1.0).contains(&chance) {
        Ok(())
    } else {
        Err(RulesError::InvalidCatalog(format!(
            "{context} {chance} outside [0, 1]"
        )))
    }
}

fn dangling(context: &str, id: &impl std::fmt::Display) -> RulesError {
    RulesError::InvalidCatalog(format!("{context} references unknown id '{id}'"))
}

fn index<K, V>(what: &str, defs: Vec<V>, key: impl Fn(&V) -> K) -> Result<HashMap<K, V>>
where
    K: Eq + Hash + std::fmt::Display,
{
    let mut map = HashMap::with_capacity(defs.len());
    for def in defs {
        let id = key(&def);
        if map.contains_key(&id) {
            return Err(RulesError::InvalidCatalog(format!("duplicate {what} id '{id}'")));
        }
        map.insert(id, def);
    }
    Ok(map)
}

fn sorted<K: Ord, V>(map: &HashMap<K, V>) -> Vec<&V> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.into_iter().map(|(_, v)| v).collect()
}
