//! Domain errors for the rules engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{ClassId, EnemyId, EntityId, ItemId, LocationId, PersonalityId, QuestId};

/// Coarse classification used by the boundary to pick a response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed input the caller can correct.
    Validation,
    /// An id that does not resolve.
    NotFound,
    /// The request is well-formed but the current state forbids it.
    StateConflict,
    /// The narrative generator failed.
    Upstream,
    /// Anything unexpected. Never shown to the caller in detail.
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RulesError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("Unknown enemy: {0}")]
    UnknownEnemy(EnemyId),

    #[error("Unknown location: {0}")]
    UnknownLocation(LocationId),

    #[error("Unknown quest: {0}")]
    UnknownQuest(QuestId),

    #[error("Unknown class: {0}")]
    UnknownClass(ClassId),

    #[error("Unknown personality: {0}")]
    UnknownPersonality(PersonalityId),

    #[error("Inventory item not found: {0}")]
    ItemNotFound(EntityId),

    #[error("Inventory is full ({capacity} slots)")]
    InventoryFull { capacity: usize },

    #[error("Not enough {item}: have {available}, need {requested}")]
    InsufficientQuantity {
        item: ItemId,
        available: u32,
        requested: u32,
    },

    #[error("{0} cannot be equipped")]
    NotEquippable(ItemId),

    #[error("{0} is not sold in the shop")]
    NotInShop(ItemId),

    #[error("Not enough gold: need {required}, have {available}")]
    InsufficientGold { required: u64, available: u64 },

    #[error("Quest {0} is already active or completed")]
    AlreadyActiveOrCompleted(QuestId),

    #[error("Quest {0} is not active")]
    NotActive(QuestId),

    #[error("{0} cannot be used in combat")]
    NotConsumable(ItemId),

    #[error("Location locked: complete quest '{quest_name}' first")]
    LocationLocked { location: LocationId, quest_name: String },

    #[error("Combat is already over")]
    CombatInactive,

    #[error("An encounter is already in progress")]
    CombatInProgress,

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),
}

impl RulesError {
    /// Classify this error for the boundary layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RulesError::Validation(_) => ErrorKind::Validation,
            RulesError::UnknownItem(_)
            | RulesError::UnknownEnemy(_)
            | RulesError::UnknownLocation(_)
            | RulesError::UnknownQuest(_)
            | RulesError::UnknownClass(_)
            | RulesError::UnknownPersonality(_)
            | RulesError::ItemNotFound(_) => ErrorKind::NotFound,
            RulesError::InventoryFull { .. }
            | RulesError::InsufficientQuantity { .. }
            | RulesError::NotEquippable(_)
            | RulesError::NotInShop(_)
            | RulesError::InsufficientGold { .. }
            | RulesError::AlreadyActiveOrCompleted(_)
            | RulesError::NotActive(_)
            | RulesError::NotConsumable(_)
            | RulesError::LocationLocked { .. }
            | RulesError::CombatInactive
            | RulesError::CombatInProgress => ErrorKind::StateConflict,
            RulesError::InvalidCatalog(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, RulesError>;
