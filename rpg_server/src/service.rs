//! Request dispatch.
//!
//! Every character-scoped operation runs as one store transaction, so a
//! rules error leaves the character exactly as it was. Narration runs
//! outside the transaction and can never fail a request.

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rpg_narrator::{ContextAssembler, HistoryTurn, NarrationAdapter, NarrativeBackend, Speaker};
use rpg_rules::catalog::{ClassDef, ItemDef, LocationDef, PersonalityDef, QuestDef};
use rpg_rules::combat::{ActionKind, CombatantStats, FleeResult};
use rpg_rules::world::{ensure_idle, explore};
use rpg_rules::{
    Catalog, Character, CombatAction, CombatEngine, CombatState, EquipmentSlot, Exploration,
    InventoryItem, ItemId, QuestProgress, RulesError,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::error::{Result, ServiceError};
use crate::protocol::{combat_action, Request, Response};
use crate::store::{MemoryStore, Session};

#[derive(Serialize)]
struct CharacterView<'a> {
    #[serde(flatten)]
    character: &'a Character,
    effective: CombatantStats,
    experience_needed: u64,
}

impl<'a> CharacterView<'a> {
    fn of(character: &'a Character) -> Self {
        Self {
            character,
            effective: CombatantStats::of(character),
            experience_needed: character.experience_needed(),
        }
    }
}

#[derive(Serialize)]
struct CombatView<'a> {
    combat: &'a CombatState,
    available_actions: Vec<ActionKind>,
    character: CharacterView<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flee_result: Option<FleeResult>,
}

impl<'a> CombatView<'a> {
    fn of(catalog: &Catalog, combat: &'a CombatState, character: &'a Character) -> Self {
        Self {
            combat,
            available_actions: combat.available_actions(catalog.combat_rules()),
            character: CharacterView::of(character),
            flee_result: None,
        }
    }
}

/// An exploration that turned into a fight carries the full combat view.
#[derive(Serialize)]
struct EncounterView<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'a str,
    #[serde(flatten)]
    combat: CombatView<'a>,
}

#[derive(Serialize)]
struct InventoryRow<'a> {
    #[serde(flatten)]
    row: &'a InventoryItem,
    item: Option<&'a ItemDef>,
}

#[derive(Serialize)]
struct QuestEntry<'a> {
    #[serde(flatten)]
    progress: &'a QuestProgress,
    quest: &'a QuestDef,
}

#[derive(Serialize)]
struct LocationEntry<'a> {
    #[serde(flatten)]
    location: &'a LocationDef,
    #[serde(skip_serializing_if = "Option::is_none")]
    accessible: Option<bool>,
}

#[derive(Serialize)]
struct Templates<'a> {
    classes: Vec<&'a ClassDef>,
    personalities: Vec<&'a PersonalityDef>,
}

fn to_data(value: impl Serialize) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn quest_entries<'a>(pairs: Vec<(&'a QuestProgress, &'a QuestDef)>) -> Vec<QuestEntry<'a>> {
    pairs
        .into_iter()
        .map(|(progress, quest)| QuestEntry { progress, quest })
        .collect()
}

/// The game server's request handler.
pub struct GameService<B> {
    catalog: Arc<Catalog>,
    store: MemoryStore,
    seeder: Mutex<ChaCha8Rng>,
    narrator: NarrationAdapter<B>,
    assembler: ContextAssembler,
    history_limit: usize,
}

impl<B: NarrativeBackend> GameService<B> {
    pub fn new(catalog: Arc<Catalog>, backend: B, seed: Option<u64>) -> Self {
        let seeder = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            catalog,
            store: MemoryStore::new(),
            seeder: Mutex::new(seeder),
            narrator: NarrationAdapter::new(backend),
            assembler: ContextAssembler::with_defaults(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Handle one request. Never panics on bad input.
    pub async fn handle(&self, request: Request) -> Response {
        let op = request.name();
        let result = self.dispatch(request).await;
        if let Err(e) = &result {
            match e {
                ServiceError::Internal(_) => tracing::error!(op, error = %e, "request failed"),
                _ => tracing::debug!(op, error = %e, "request rejected"),
            }
        }
        result.into()
    }

    async fn dispatch(&self, request: Request) -> Result<Value> {
        match request {
            Request::CreateCharacter {
                account_id,
                name,
                class_id,
                personality_id,
            } => {
                let character = Character::create(
                    &self.catalog,
                    account_id.as_str(),
                    name,
                    &class_id,
                    &personality_id,
                    Utc::now(),
                )?;
                let rng = ChaCha8Rng::seed_from_u64(self.seeder.lock().await.gen());
                let data = to_data(CharacterView::of(&character))?;
                self.store
                    .insert(&account_id, Session::new(character, rng))
                    .await?;
                Ok(data)
            }
            Request::GetCharacter { account_id } => {
                let session = self.store.read(&account_id).await?;
                to_data(serde_json::json!({
                    "character": CharacterView::of(&session.character),
                    "combat": session.encounter,
                }))
            }
            Request::Explore { account_id } => self.explore(&account_id).await,
            Request::Move {
                account_id,
                location_id,
            } => {
                let catalog = &self.catalog;
                self.store
                    .transact(&account_id, |session| {
                        ensure_idle(session.encounter.as_ref())?;
                        let location = session.character.move_to(catalog, &location_id)?;
                        session.character.touch(Utc::now());
                        to_data(serde_json::json!({
                            "location": location,
                            "message": format!("You travel to {} {}", location.icon, location.name),
                        }))
                    })
                    .await
            }
            Request::StartCombat {
                account_id,
                enemy_id,
            } => {
                let catalog = &self.catalog;
                self.store
                    .transact(&account_id, |session| {
                        ensure_idle(session.encounter.as_ref())?;
                        let state =
                            CombatEngine::new(catalog).start_combat(&session.character, &enemy_id)?;
                        let data = to_data(CombatView::of(catalog, &state, &session.character))?;
                        session.encounter = Some(state);
                        Ok(data)
                    })
                    .await
            }
            Request::CombatAction {
                account_id,
                action,
                item_id,
            } => {
                let action = combat_action(action, item_id)?;
                self.combat_action(&account_id, action).await
            }
            Request::Equip { account_id, row_id } => {
                let catalog = &self.catalog;
                self.store
                    .transact(&account_id, |session| {
                        let slot = session.character.equip(catalog, row_id)?;
                        session.character.touch(Utc::now());
                        to_data(serde_json::json!({
                            "slot": slot,
                            "character": CharacterView::of(&session.character),
                        }))
                    })
                    .await
            }
            Request::Unequip { account_id, slot } => self.unequip(&account_id, slot).await,
            Request::Inventory { account_id } => {
                let session = self.store.read(&account_id).await?;
                let character = &session.character;
                let rows: Vec<InventoryRow<'_>> = character
                    .inventory
                    .rows
                    .iter()
                    .map(|row| InventoryRow {
                        row,
                        item: self.catalog.item(row.item_id.as_str()),
                    })
                    .collect();
                to_data(serde_json::json!({
                    "items": rows,
                    "equipment": character.equipment,
                    "capacity": self.catalog.settings().max_inventory_size,
                    "gold": character.gold,
                }))
            }
            Request::Shop => to_data(self.catalog.shop_listing()),
            Request::Buy {
                account_id,
                item_id,
                quantity,
            } => {
                let catalog = &self.catalog;
                self.store
                    .transact(&account_id, |session| {
                        let purchase = session.character.buy(catalog, &item_id, quantity)?;
                        session.character.touch(Utc::now());
                        to_data(serde_json::json!({
                            "purchase": purchase,
                            "gold": session.character.gold,
                        }))
                    })
                    .await
            }
            Request::Quests { account_id } => {
                let session = self.store.read(&account_id).await?;
                let character = &session.character;
                to_data(serde_json::json!({
                    "active": quest_entries(character.active_quests(&self.catalog)),
                    "completed": quest_entries(character.completed_quests(&self.catalog)),
                }))
            }
            Request::StartQuest {
                account_id,
                quest_id,
            } => {
                let catalog = &self.catalog;
                self.store
                    .transact(&account_id, |session| {
                        let now = Utc::now();
                        session.character.start_quest(catalog, &quest_id, now)?;
                        session.character.touch(now);
                        to_data(session.character.quests.get(&quest_id))
                    })
                    .await
            }
            Request::CompleteQuest {
                account_id,
                quest_id,
            } => {
                let catalog = &self.catalog;
                self.store
                    .transact(&account_id, |session| {
                        let now = Utc::now();
                        let completion = session.character.complete_quest(catalog, &quest_id, now)?;
                        session.character.touch(now);
                        to_data(serde_json::json!({
                            "completion": completion,
                            "character": CharacterView::of(&session.character),
                        }))
                    })
                    .await
            }
            Request::Chat {
                account_id,
                message,
            } => self.chat(&account_id, message).await,
            Request::Locations { account_id } => {
                let session = match account_id {
                    Some(account_id) => Some(self.store.read(&account_id).await?),
                    None => None,
                };
                let entries: Vec<LocationEntry<'_>> = self
                    .catalog
                    .locations()
                    .into_iter()
                    .map(|location| LocationEntry {
                        location,
                        accessible: session.as_ref().map(|s| {
                            s.character.can_access(&self.catalog, &location.id).is_ok()
                        }),
                    })
                    .collect();
                to_data(entries)
            }
            Request::Templates => to_data(Templates {
                classes: self.catalog.classes(),
                personalities: self.catalog.personalities(),
            }),
        }
    }

    async fn explore(&self, account_id: &str) -> Result<Value> {
        let catalog = &self.catalog;
        self.store
            .transact(account_id, |session| {
                let Session {
                    character,
                    encounter,
                    rng,
                    ..
                } = session;
                let exploration = explore(catalog, character, encounter.as_ref(), rng)?;
                character.touch(Utc::now());
                match exploration {
                    Exploration::Encounter { combat, message } => {
                        let data = to_data(EncounterView {
                            kind: "encounter",
                            message: &message,
                            combat: CombatView::of(catalog, &combat, character),
                        })?;
                        *encounter = Some(combat);
                        Ok(data)
                    }
                    safe @ Exploration::Safe { .. } => to_data(&safe),
                }
            })
            .await
    }

    /// Resolve one player action plus the enemy reply.
    ///
    /// Items are consumed in the same transaction that applies them. A
    /// finished encounter is returned once and then dropped.
    async fn combat_action(&self, account_id: &str, action: CombatAction) -> Result<Value> {
        let catalog = &self.catalog;
        self.store
            .transact(account_id, |session| {
                let Session {
                    character,
                    encounter,
                    rng,
                    ..
                } = session;
                let state = encounter
                    .as_mut()
                    .filter(|state| state.active)
                    .ok_or(RulesError::CombatInactive)?;

                if let CombatAction::UseItem { item_id } = &action {
                    consume(catalog, character, item_id)?;
                }
                let flee_result = CombatEngine::new(catalog).act(state, character, &action, rng)?;
                character.touch(Utc::now());

                let data = to_data(CombatView {
                    flee_result,
                    ..CombatView::of(catalog, state, character)
                })?;
                if !state.active {
                    *encounter = None;
                }
                Ok(data)
            })
            .await
    }

    async fn unequip(&self, account_id: &str, slot: EquipmentSlot) -> Result<Value> {
        self.store
            .transact(account_id, |session| {
                let item_id = session.character.unequip(slot);
                session.character.touch(Utc::now());
                to_data(serde_json::json!({
                    "slot": slot,
                    "item_id": item_id,
                    "character": CharacterView::of(&session.character),
                }))
            })
            .await
    }

    async fn chat(&self, account_id: &str, message: String) -> Result<Value> {
        if message.trim().is_empty() {
            return Err(ServiceError::Validation("message is required".into()));
        }
        let session = self.store.read(account_id).await?;
        let context = self.assembler.assemble(
            &self.catalog,
            &session.character,
            session.encounter.as_ref(),
            &session.history,
            &message,
        );
        let narration = self.narrator.narrate(&context).await;

        let limit = self.history_limit;
        let reply = narration.message.clone();
        self.store
            .transact(account_id, move |session| {
                session.history.push(HistoryTurn {
                    role: Speaker::User,
                    message,
                });
                session.history.push(HistoryTurn {
                    role: Speaker::Narrator,
                    message: reply,
                });
                let excess = session.history.len().saturating_sub(limit);
                session.history.drain(..excess);
                Ok(())
            })
            .await?;
        to_data(narration)
    }

    #[cfg(test)]
    async fn session(&self, account_id: &str) -> Session {
        self.store.read(account_id).await.unwrap()
    }
}

/// Take one consumable out of the bag. Equipment is rejected before
/// anything is removed.
fn consume(catalog: &Catalog, character: &mut Character, item_id: &ItemId) -> Result<()> {
    let item = catalog.require_item(item_id)?;
    if !item.is_consumable() {
        return Err(RulesError::NotConsumable(item_id.clone()).into());
    }
    character.remove_item(item_id, 1)?;
    Ok(())
}
