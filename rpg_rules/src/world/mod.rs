//! Locations: access rules, travel and exploration.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, LocationDef};
use crate::combat::{damage::roll, CombatEngine, CombatState};
use crate::entities::{Character, LocationId};
use crate::error::{Result, RulesError};

/// What exploring the current location turned up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Exploration {
    Encounter { combat: CombatState, message: String },
    Safe { message: String },
}

/// Fails while an encounter is still running.
pub fn ensure_idle(encounter: Option<&CombatState>) -> Result<()> {
    match encounter {
        Some(state) if state.active => Err(RulesError::CombatInProgress),
        _ => Ok(()),
    }
}

/// Roll for a random encounter at the character's location.
pub fn explore<R: Rng + ?Sized>(
    catalog: &Catalog,
    character: &Character,
    encounter: Option<&CombatState>,
    rng: &mut R,
) -> Result<Exploration> {
    ensure_idle(encounter)?;
    let location = catalog.require_location(&character.current_location)?;

    if roll(rng, location.encounter_rate) {
        if let Some(enemy) = location.encounters.choose(rng) {
            let combat = CombatEngine::new(catalog).start_combat(character, enemy)?;
            let message = format!(
                "While exploring you run into {} {}!",
                combat.enemy.icon, combat.enemy.name
            );
            return Ok(Exploration::Encounter { combat, message });
        }
    }
    Ok(Exploration::Safe {
        message: format!("You explore {} but find no danger", location.name),
    })
}

impl Character {
    /// Check a location exists and its prerequisite quest is done.
    pub fn can_access<'c>(
        &self,
        catalog: &'c Catalog,
        location_id: &LocationId,
    ) -> Result<&'c LocationDef> {
        let location = catalog.require_location(location_id)?;
        if let Some(quest_id) = &location.requires_quest {
            if !self.quests.is_completed(quest_id) {
                let quest_name = catalog
                    .quest(quest_id.as_str())
                    .map_or_else(|| quest_id.to_string(), |q| q.name.clone());
                return Err(RulesError::LocationLocked {
                    location: location.id.clone(),
                    quest_name,
                });
            }
        }
        Ok(location)
    }

    pub fn move_to<'c>(
        &mut self,
        catalog: &'c Catalog,
        location_id: &LocationId,
    ) -> Result<&'c LocationDef> {
        let location = self.can_access(catalog, location_id)?;
        self.current_location = location.id.clone();
        tracing::debug!(character = %self.id, location = %location.id, "moved");
        Ok(location)
    }
}
