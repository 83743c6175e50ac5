//! Error types for the boundary layer and their wire form.

use rpg_narrator::NarrationError;
use rpg_rules::{ErrorKind, RulesError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("catalog: {0}")]
    Catalog(#[from] RulesError),

    #[error("narrator: {0}")]
    Narrator(#[from] NarrationError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No character for account {0}")]
    NoCharacter(String),

    #[error("Account {0} already has a character")]
    CharacterExists(String),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Rules(e) => e.kind(),
            ServiceError::Store(StoreError::NoCharacter(_)) => ErrorKind::NotFound,
            ServiceError::Store(StoreError::CharacterExists(_)) => ErrorKind::StateConflict,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Error half of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ServiceError> for ErrorBody {
    fn from(e: &ServiceError) -> Self {
        let kind = e.kind();
        let message = match kind {
            ErrorKind::Internal => "Something went wrong. Please try again.".to_string(),
            _ => e.to_string(),
        };
        Self { kind, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpg_rules::ItemId;

    #[test]
    fn test_internal_details_hidden() {
        let err = ServiceError::Internal("catalog lookup failed for row 7".into());
        let body = ErrorBody::from(&err);
        assert_eq!(body.kind, ErrorKind::Internal);
        assert!(!body.message.contains("row 7"));
    }

    #[test]
    fn test_domain_errors_keep_message() {
        let err = ServiceError::from(RulesError::NotInShop(ItemId::from("legendary_sword")));
        let body = ErrorBody::from(&err);
        assert_eq!(body.kind, ErrorKind::StateConflict);
        assert!(body.message.contains("legendary_sword"));
    }

    #[test]
    fn test_store_error_kinds() {
        assert_eq!(
            ServiceError::from(StoreError::NoCharacter("a".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::from(StoreError::CharacterExists("a".into())).kind(),
            ErrorKind::StateConflict
        );
    }
}
