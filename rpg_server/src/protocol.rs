//! Line-delimited JSON protocol spoken on stdin/stdout.

use rpg_rules::combat::ActionKind;
use rpg_rules::{
    ClassId, CombatAction, EnemyId, EntityId, EquipmentSlot, ItemId, LocationId, PersonalityId,
    QuestId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorBody, Result, ServiceError};

fn one() -> u32 {
    1
}

/// One client request. Character-scoped operations name the owning account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateCharacter {
        account_id: String,
        name: String,
        class_id: ClassId,
        personality_id: PersonalityId,
    },
    GetCharacter {
        account_id: String,
    },
    Explore {
        account_id: String,
    },
    Move {
        account_id: String,
        location_id: LocationId,
    },
    StartCombat {
        account_id: String,
        enemy_id: EnemyId,
    },
    CombatAction {
        account_id: String,
        action: ActionKind,
        #[serde(default)]
        item_id: Option<ItemId>,
    },
    Equip {
        account_id: String,
        row_id: EntityId,
    },
    Unequip {
        account_id: String,
        slot: EquipmentSlot,
    },
    Inventory {
        account_id: String,
    },
    Shop,
    Buy {
        account_id: String,
        item_id: ItemId,
        #[serde(default = "one")]
        quantity: u32,
    },
    Quests {
        account_id: String,
    },
    StartQuest {
        account_id: String,
        quest_id: QuestId,
    },
    CompleteQuest {
        account_id: String,
        quest_id: QuestId,
    },
    Chat {
        account_id: String,
        message: String,
    },
    Locations {
        #[serde(default)]
        account_id: Option<String>,
    },
    Templates,
}

impl Request {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| ServiceError::Validation(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::CreateCharacter { .. } => "create_character",
            Request::GetCharacter { .. } => "get_character",
            Request::Explore { .. } => "explore",
            Request::Move { .. } => "move",
            Request::StartCombat { .. } => "start_combat",
            Request::CombatAction { .. } => "combat_action",
            Request::Equip { .. } => "equip",
            Request::Unequip { .. } => "unequip",
            Request::Inventory { .. } => "inventory",
            Request::Shop => "shop",
            Request::Buy { .. } => "buy",
            Request::Quests { .. } => "quests",
            Request::StartQuest { .. } => "start_quest",
            Request::CompleteQuest { .. } => "complete_quest",
            Request::Chat { .. } => "chat",
            Request::Locations { .. } => "locations",
            Request::Templates => "templates",
        }
    }
}

/// Turn the wire form of a combat action into a typed one.
///
/// `use_item` is the only kind that carries a payload.
pub fn combat_action(kind: ActionKind, item_id: Option<ItemId>) -> Result<CombatAction> {
    match (kind, item_id) {
        (ActionKind::Attack, _) => Ok(CombatAction::Attack),
        (ActionKind::Defend, _) => Ok(CombatAction::Defend),
        (ActionKind::Flee, _) => Ok(CombatAction::Flee),
        (ActionKind::UseItem, Some(item_id)) => Ok(CombatAction::UseItem { item_id }),
        (ActionKind::UseItem, None) => Err(ServiceError::Validation(
            "use_item requires an item_id".into(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: &ServiceError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody::from(error)),
        }
    }
}

impl From<Result<Value>> for Response {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(data) => Response::success(data),
            Err(e) => Response::failure(&e),
        }
    }
}
