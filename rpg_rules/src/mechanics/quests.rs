//! Per-character quest state machine: `none -> active -> completed | failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, QuestDef, QuestRewards};
use crate::entities::{Character, GameStage, QuestId, QuestLog, QuestProgress, QuestStatus};
use crate::error::{Result, RulesError};

/// Outcome of completing a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestCompletion {
    pub quest_id: QuestId,
    pub rewards: QuestRewards,
    pub level_ups: u32,
    /// Successor quest that was started automatically.
    pub next_quest: Option<QuestId>,
}

impl QuestLog {
    pub fn get(&self, quest_id: &QuestId) -> Option<&QuestProgress> {
        self.entries.iter().find(|q| &q.quest_id == quest_id)
    }

    fn get_mut(&mut self, quest_id: &QuestId) -> Option<&mut QuestProgress> {
        self.entries.iter_mut().find(|q| &q.quest_id == quest_id)
    }

    fn with_status(&self, status: QuestStatus) -> impl Iterator<Item = &QuestProgress> {
        self.entries.iter().filter(move |q| q.status == status)
    }

    pub fn active(&self) -> impl Iterator<Item = &QuestProgress> {
        self.with_status(QuestStatus::Active)
    }

    pub fn completed(&self) -> impl Iterator<Item = &QuestProgress> {
        self.with_status(QuestStatus::Completed)
    }

    pub fn is_completed(&self, quest_id: &QuestId) -> bool {
        self.get(quest_id)
            .is_some_and(|q| q.status == QuestStatus::Completed)
    }

    fn active_mut(&mut self, quest_id: &QuestId) -> Result<&mut QuestProgress> {
        match self.get_mut(quest_id) {
            Some(entry) if entry.status == QuestStatus::Active => Ok(entry),
            _ => Err(RulesError::NotActive(quest_id.clone())),
        }
    }
}

impl Character {
    pub fn start_quest(
        &mut self,
        catalog: &Catalog,
        quest_id: &QuestId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let quest = catalog.require_quest(quest_id)?;
        if self.quests.get(quest_id).is_some() {
            return Err(RulesError::AlreadyActiveOrCompleted(quest_id.clone()));
        }
        self.quests.entries.push(QuestProgress {
            quest_id: quest.id.clone(),
            status: QuestStatus::Active,
            started_at: now,
            completed_at: None,
            progress: Default::default(),
        });
        tracing::debug!(character = %self.id, quest = %quest.id, "quest started");
        Ok(())
    }

    /// Complete an active quest and pay out its rewards.
    ///
    /// Rewards are all-or-nothing: if the reward items do not fit in the
    /// bag the character is left untouched. A declared successor quest is
    /// started immediately unless it already has a record.
    pub fn complete_quest(
        &mut self,
        catalog: &Catalog,
        quest_id: &QuestId,
        now: DateTime<Utc>,
    ) -> Result<QuestCompletion> {
        self.quests.active_mut(quest_id)?;
        let quest = catalog.require_quest(quest_id)?;
        let rewards = quest.rewards.clone();

        let mut inventory = self.inventory.clone();
        for item in &rewards.items {
            inventory.add(catalog, item, 1)?;
        }
        self.inventory = inventory;

        self.gold += rewards.gold;
        let level_ups = self.gain_experience(catalog, rewards.experience)?;

        let entry = self.quests.active_mut(quest_id)?;
        entry.status = QuestStatus::Completed;
        entry.completed_at = Some(now);

        let next_quest = match &quest.next_quest {
            Some(next) if self.quests.get(next).is_none() => {
                self.start_quest(catalog, next, now)?;
                Some(next.clone())
            }
            _ => None,
        };
        if quest.is_final {
            self.game_stage = GameStage::Completed;
        }

        tracing::info!(
            character = %self.id,
            quest = %quest.id,
            level_ups,
            next = ?next_quest,
            "quest completed"
        );
        Ok(QuestCompletion {
            quest_id: quest.id.clone(),
            rewards,
            level_ups,
            next_quest,
        })
    }

    /// Mark an active quest as failed. Terminal, no rewards.
    pub fn fail_quest(&mut self, quest_id: &QuestId, now: DateTime<Utc>) -> Result<()> {
        let entry = self.quests.active_mut(quest_id)?;
        entry.status = QuestStatus::Failed;
        entry.completed_at = Some(now);
        Ok(())
    }

    /// Store a quest-specific progress value on an active quest.
    pub fn set_quest_progress(
        &mut self,
        quest_id: &QuestId,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let entry = self.quests.active_mut(quest_id)?;
        entry.progress.insert(key.into(), value);
        Ok(())
    }

    /// Active quests joined with their catalog definitions.
    pub fn active_quests<'c>(&self, catalog: &'c Catalog) -> Vec<(&QuestProgress, &'c QuestDef)> {
        self.quests
            .active()
            .filter_map(|p| catalog.quest(p.quest_id.as_str()).map(|def| (p, def)))
            .collect()
    }

    /// Completed quests joined with their catalog definitions.
    pub fn completed_quests<'c>(
        &self,
        catalog: &'c Catalog,
    ) -> Vec<(&QuestProgress, &'c QuestDef)> {
        self.quests
            .completed()
            .filter_map(|p| catalog.quest(p.quest_id.as_str()).map(|def| (p, def)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GameSettings;
    use crate::entities::{ClassId, ItemId, PersonalityId};

    fn hero(catalog: &Catalog) -> Character {
        Character::create(
            catalog,
            "acct",
            "Corin",
            &ClassId::from("mage"),
            &PersonalityId::from("wise"),
            Utc::now(),
        )
        .unwrap()
    }

    fn tutorial() -> QuestId {
        QuestId::from("tutorial")
    }

    #[test]
    fn test_start_quest_twice_fails() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        assert_eq!(
            hero.start_quest(&catalog, &tutorial(), Utc::now()),
            Err(RulesError::AlreadyActiveOrCompleted(tutorial()))
        );
        assert_eq!(
            hero.start_quest(&catalog, &QuestId::from("side_quest"), Utc::now()),
            Err(RulesError::UnknownQuest(QuestId::from("side_quest")))
        );
    }

    #[test]
    fn test_complete_pays_rewards_and_chains() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let potions = hero.inventory.count_of(&ItemId::from("health_potion"));

        let done = hero.complete_quest(&catalog, &tutorial(), Utc::now()).unwrap();
        assert_eq!(done.rewards.gold, 100);
        assert_eq!(done.level_ups, 0);
        assert_eq!(done.next_quest, Some(QuestId::from("goblin_threat")));

        assert_eq!(hero.gold, 200);
        assert_eq!(hero.experience, 50);
        assert_eq!(
            hero.inventory.count_of(&ItemId::from("health_potion")),
            potions + 1
        );
        assert!(hero.quests.is_completed(&tutorial()));
        assert!(hero.quests.get(&tutorial()).unwrap().completed_at.is_some());
        assert_eq!(
            hero.quests.get(&QuestId::from("goblin_threat")).unwrap().status,
            QuestStatus::Active
        );
        assert_eq!(hero.active_quests(&catalog).len(), 1);
        assert_eq!(hero.completed_quests(&catalog).len(), 1);
    }

    #[test]
    fn test_complete_twice_fails() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        hero.complete_quest(&catalog, &tutorial(), Utc::now()).unwrap();
        let gold = hero.gold;
        assert_eq!(
            hero.complete_quest(&catalog, &tutorial(), Utc::now()),
            Err(RulesError::NotActive(tutorial()))
        );
        assert_eq!(hero.gold, gold);
    }

    #[test]
    fn test_complete_unstarted_quest_fails() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        assert_eq!(
            hero.complete_quest(&catalog, &QuestId::from("final_battle"), Utc::now()),
            Err(RulesError::NotActive(QuestId::from("final_battle")))
        );
    }

    #[test]
    fn test_rewards_are_all_or_nothing() {
        let catalog = Catalog::builtin().unwrap();
        let settings = GameSettings {
            max_inventory_size: 3,
            ..catalog.settings().clone()
        };
        let catalog = catalog.with_settings(settings);
        // Three starting rows fill the bag, so even the stacking potion reward is refused.
        let mut hero = hero(&catalog);
        let before = hero.clone();
        assert_eq!(
            hero.complete_quest(&catalog, &tutorial(), Utc::now()),
            Err(RulesError::InventoryFull { capacity: 3 })
        );
        assert_eq!(hero, before);
    }

    #[test]
    fn test_completion_can_level_up() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        hero.experience = 60;
        hero.stats.hp = 1;
        let done = hero.complete_quest(&catalog, &tutorial(), Utc::now()).unwrap();
        assert_eq!(done.level_ups, 1);
        assert_eq!(hero.level, 2);
        assert_eq!(hero.experience, 10);
        assert_eq!(hero.stats.hp, hero.max_hp());
    }

    #[test]
    fn test_fail_quest_is_terminal() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        hero.fail_quest(&tutorial(), Utc::now()).unwrap();
        assert_eq!(
            hero.quests.get(&tutorial()).unwrap().status,
            QuestStatus::Failed
        );
        assert!(hero.active_quests(&catalog).is_empty());
        assert_eq!(
            hero.complete_quest(&catalog, &tutorial(), Utc::now()),
            Err(RulesError::NotActive(tutorial()))
        );
        assert_eq!(
            hero.start_quest(&catalog, &tutorial(), Utc::now()),
            Err(RulesError::AlreadyActiveOrCompleted(tutorial()))
        );
    }

    #[test]
    fn test_progress_payload() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        hero.set_quest_progress(&tutorial(), "slimes_defeated", serde_json::json!(2))
            .unwrap();
        let entry = hero.quests.get(&tutorial()).unwrap();
        assert_eq!(entry.progress["slimes_defeated"], serde_json::json!(2));

        assert!(matches!(
            hero.set_quest_progress(&QuestId::from("final_battle"), "x", serde_json::json!(1)),
            Err(RulesError::NotActive(_))
        ));
    }

    #[test]
    fn test_final_quest_completes_game() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let now = Utc::now();
        for quest in [
            "tutorial",
            "goblin_threat",
            "forest_exploration",
            "mountain_pass",
            "defeat_dragon",
        ] {
            hero.complete_quest(&catalog, &QuestId::from(quest), now).unwrap();
        }
        let done = hero
            .complete_quest(&catalog, &QuestId::from("final_battle"), now)
            .unwrap();
        assert_eq!(done.next_quest, None);
        assert_eq!(hero.game_stage, GameStage::Completed);
    }
}
