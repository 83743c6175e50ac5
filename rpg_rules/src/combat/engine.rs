//! Turn resolution.

use rand::Rng;

use super::damage::{roll, roll_ability, roll_attack};
use super::{
    CombatAction, CombatOutcome, CombatRewards, CombatState, CombatantStats, EnemySnapshot,
    FleeResult,
};
use crate::catalog::{AbilityDef, Catalog, CombatRules, ConsumableEffect, EnemyDef, LootEntry};
use crate::entities::{Character, EnemyId, GameStage, ItemId};
use crate::error::{Result, RulesError};

/// Resolves encounters against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct CombatEngine<'a> {
    catalog: &'a Catalog,
}

impl<'a> CombatEngine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    fn rules(&self) -> &'a CombatRules {
        self.catalog.combat_rules()
    }

    /// Open an encounter with a fresh copy of the enemy.
    pub fn start_combat(&self, character: &Character, enemy_id: &EnemyId) -> Result<CombatState> {
        let def = self.catalog.require_enemy(enemy_id)?;
        let enemy = EnemySnapshot::new(def);
        tracing::info!(character = %character.id, enemy = %enemy.id, "combat started");

        Ok(CombatState {
            active: true,
            turn: 1,
            log: vec![format!("You encounter {} {}!", enemy.icon, enemy.name)],
            enemy,
            character: CombatantStats::of(character),
            defending: false,
            fled: false,
            victory: None,
            game_complete: false,
            outcome: None,
        })
    }

    /// Dispatch one player action. Flee attempts report how they went.
    pub fn act<R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        character: &mut Character,
        action: &CombatAction,
        rng: &mut R,
    ) -> Result<Option<FleeResult>> {
        match action {
            CombatAction::Attack => self.player_attack(state, character, rng).map(|()| None),
            CombatAction::Defend => self.player_defend(state, character, rng).map(|()| None),
            CombatAction::UseItem { item_id } => self
                .player_use_item(state, character, item_id, rng)
                .map(|()| None),
            CombatAction::Flee => self.attempt_flee(state, character, rng).map(Some),
        }
    }

    pub fn player_attack<R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        character: &mut Character,
        rng: &mut R,
    ) -> Result<()> {
        ensure_active(state)?;
        let hit = roll_attack(rng, self.rules(), character.attack(), state.enemy.defense, 1.0);
        state.enemy.hp = state.enemy.hp.saturating_sub(hit.damage);

        let name = &state.enemy.name;
        state.log.push(if hit.critical {
            format!("💥 Critical hit! You deal {} damage to {name}!", hit.damage)
        } else {
            format!("⚔️ You attack {name} for {} damage", hit.damage)
        });

        if state.enemy.hp == 0 {
            return self.end_combat(state, character, true, rng);
        }
        self.enemy_turn(state, character, 1.0, rng)
    }

    /// Halve the next enemy reply. The stance never outlives this call.
    pub fn player_defend<R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        character: &mut Character,
        rng: &mut R,
    ) -> Result<()> {
        ensure_active(state)?;
        state.defending = true;
        state.log.push("🛡️ You take a defensive stance".to_string());
        let result = self.enemy_turn(state, character, self.rules().defend_multiplier, rng);
        state.defending = false;
        result
    }

    /// Apply a consumable's effect. The caller removes it from the bag.
    pub fn player_use_item<R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        character: &mut Character,
        item_id: &ItemId,
        rng: &mut R,
    ) -> Result<()> {
        ensure_active(state)?;
        let item = self.catalog.require_item(item_id)?;
        let effect = item
            .effect
            .filter(|_| item.is_consumable())
            .ok_or_else(|| RulesError::NotConsumable(item_id.clone()))?;

        state.log.push(match effect {
            ConsumableEffect::Heal { amount } => {
                character.heal(amount);
                format!("💊 You use {} and recover {amount} HP", item.name)
            }
            ConsumableEffect::RestoreMp { amount } => {
                character.restore_mp(amount);
                format!("💙 You use {} and recover {amount} MP", item.name)
            }
            ConsumableEffect::FullRestore => {
                character.full_restore();
                format!("✨ You use {} and are fully restored!", item.name)
            }
        });
        state.character = CombatantStats::of(character);

        self.enemy_turn(state, character, 1.0, rng)
    }

    /// Try to run. Bosses always block the attempt; the enemy does not get
    /// a free attack when that happens.
    pub fn attempt_flee<R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        character: &Character,
        rng: &mut R,
    ) -> Result<FleeResult> {
        ensure_active(state)?;
        if self.rules().is_boss(state.enemy.level) {
            state
                .log
                .push(format!("❌ {} blocks your escape!", state.enemy.name));
            return Ok(FleeResult::Blocked);
        }

        if roll(rng, self.rules().flee_chance) {
            state.log.push("🏃 You escape from the fight!".to_string());
            state.active = false;
            state.fled = true;
            state.outcome = Some(CombatOutcome::Fled);
            tracing::info!(character = %character.id, enemy = %state.enemy.id, "fled combat");
            Ok(FleeResult::Escaped)
        } else {
            state.log.push("❌ You fail to get away!".to_string());
            Ok(FleeResult::Failed)
        }
    }

    /// The enemy's reply. `multiplier` scales incoming damage.
    fn enemy_turn<R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        character: &mut Character,
        multiplier: f64,
        rng: &mut R,
    ) -> Result<()> {
        let def = self.catalog.require_enemy(&state.enemy.id)?;

        if self.rules().is_boss(state.enemy.level) && !def.special_abilities.is_empty() {
            if let Some(ability) = self.pick_ability(state, def, rng) {
                return self.use_ability(state, character, ability, multiplier, rng);
            }
        }

        let hit = roll_attack(
            rng,
            self.rules(),
            state.enemy.attack,
            character.defense(),
            multiplier,
        );
        let died = character.take_damage(hit.damage);
        state.character = CombatantStats::of(character);

        let name = &state.enemy.name;
        state.log.push(if hit.critical {
            format!("💥 {name} lands a critical hit for {} damage!", hit.damage)
        } else {
            format!("👹 {name} attacks you for {} damage", hit.damage)
        });

        if died {
            return self.end_combat(state, character, false, rng);
        }
        check_phase_transition(state, def);
        state.turn += 1;
        Ok(())
    }

    /// First ready ability whose trigger roll succeeds. When none fires,
    /// every running cooldown ticks down by one.
    fn pick_ability<'d, R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        def: &'d EnemyDef,
        rng: &mut R,
    ) -> Option<&'d AbilityDef> {
        let chance = self.rules().ability_chance;
        let ready = def
            .special_abilities
            .iter()
            .find(|a| state.enemy.cooldown(&a.name) == 0 && roll(rng, chance));
        if ready.is_none() {
            for remaining in state.enemy.cooldowns.values_mut() {
                *remaining = remaining.saturating_sub(1);
            }
        }
        ready
    }

    fn use_ability<R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        character: &mut Character,
        ability: &AbilityDef,
        multiplier: f64,
        rng: &mut R,
    ) -> Result<()> {
        let damage = roll_ability(
            rng,
            self.rules(),
            state.enemy.attack,
            character.defense(),
            ability.damage_multiplier * multiplier,
        );
        let died = character.take_damage(damage);
        state.character = CombatantStats::of(character);
        state.log.push(format!(
            "🔥 {} uses {}! You take {damage} damage!",
            state.enemy.name, ability.name
        ));

        if let Some(fraction) = ability.heal_percent {
            let healed = (f64::from(damage) * fraction) as u32;
            state.enemy.hp = state.enemy.hp.saturating_add(healed).min(state.enemy.max_hp);
            state.log.push(format!(
                "💚 {} drains {healed} HP",
                state.enemy.name
            ));
        }
        state
            .enemy
            .cooldowns
            .insert(ability.name.clone(), ability.cooldown);

        if died {
            return self.end_combat(state, character, false, rng);
        }
        state.turn += 1;
        Ok(())
    }

    /// Settle the encounter and fold rewards or penalties into the character.
    fn end_combat<R: Rng + ?Sized>(
        &self,
        state: &mut CombatState,
        character: &mut Character,
        victory: bool,
        rng: &mut R,
    ) -> Result<()> {
        state.active = false;
        state.victory = Some(victory);

        if victory {
            let def = self.catalog.require_enemy(&state.enemy.id)?;
            let level_ups = character.gain_experience(self.catalog, def.experience)?;
            character.gold += def.gold;

            let loot = roll_loot(&def.loot, rng);
            let mut unclaimed_loot = Vec::new();
            for item in &loot {
                match character.add_item(self.catalog, item, 1) {
                    Ok(()) => {}
                    Err(RulesError::InventoryFull { .. }) => unclaimed_loot.push(item.clone()),
                    Err(e) => return Err(e),
                }
            }

            state.log.push("🎉 Victory!".to_string());
            state
                .log
                .push(format!("📈 Gained {} experience", def.experience));
            state.log.push(format!("💰 Gained {} gold", def.gold));
            if level_ups > 0 {
                state
                    .log
                    .push(format!("⬆️ Level up! You are now level {}", character.level));
            }
            if !loot.is_empty() {
                let names: Vec<&str> = loot
                    .iter()
                    .filter_map(|id| self.catalog.item(id.as_str()))
                    .map(|item| item.name.as_str())
                    .collect();
                state.log.push(format!("🎁 Loot: {}", names.join(", ")));
            }
            if !unclaimed_loot.is_empty() {
                state
                    .log
                    .push("🎒 Your bag is full; some loot was left behind".to_string());
            }
            if self.catalog.is_final_boss(&def.id) {
                state.game_complete = true;
                character.game_stage = GameStage::Completed;
                state
                    .log
                    .push(format!("👑 You defeated {} and saved the world!", def.name));
            }

            tracing::info!(
                character = %character.id,
                enemy = %def.id,
                level_ups,
                loot = loot.len(),
                "combat won"
            );
            state.outcome = Some(CombatOutcome::Victory(CombatRewards {
                experience: def.experience,
                gold: def.gold,
                level_ups,
                loot,
                unclaimed_loot,
            }));
        } else {
            let penalty = &self.catalog.settings().death_penalty;
            let gold_lost = character.apply_death_penalty(penalty);
            let respawn = self
                .catalog
                .location(penalty.respawn_location.as_str())
                .map_or(penalty.respawn_location.as_str(), |l| l.name.as_str());

            state.log.push("💀 You have been defeated...".to_string());
            state.log.push(format!("💸 Lost {gold_lost} gold"));
            state.log.push(format!("You wake up in {respawn}"));

            tracing::info!(
                character = %character.id,
                enemy = %state.enemy.id,
                gold_lost,
                "combat lost"
            );
            state.outcome = Some(CombatOutcome::Defeat { gold_lost });
        }

        state.character = CombatantStats::of(character);
        Ok(())
    }
}

/// Independent drop roll per loot entry. Duplicates are kept.
pub fn roll_loot<R: Rng + ?Sized>(table: &[LootEntry], rng: &mut R) -> Vec<ItemId> {
    table
        .iter()
        .filter(|entry| roll(rng, entry.chance))
        .map(|entry| entry.item_id.clone())
        .collect()
}

fn ensure_active(state: &CombatState) -> Result<()> {
    if state.active {
        Ok(())
    } else {
        Err(RulesError::CombatInactive)
    }
}

/// Enter the next phase if hp has fallen to its threshold. At most one
/// phase per turn; each multiplier compounds on the current attack.
fn check_phase_transition(state: &mut CombatState, def: &EnemyDef) {
    let Some(phase) = def.phases.get(state.enemy.phase) else {
        return;
    };
    if state.enemy.hp <= phase.hp_threshold {
        state.enemy.attack = (f64::from(state.enemy.attack) * phase.attack_multiplier) as u32;
        state.enemy.phase += 1;
        state.log.push(format!("⚠️ {}", phase.message));
    }
}
