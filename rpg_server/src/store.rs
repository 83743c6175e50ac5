//! In-memory character store with per-character transactions.
//!
//! Each record sits behind its own async mutex, so requests for one
//! character are serialized while different characters never contend.
//! A transaction works on a copy and only commits it when the closure
//! succeeds.

use rand_chacha::ChaCha8Rng;
use rpg_narrator::HistoryTurn;
use rpg_rules::combat::CombatState;
use rpg_rules::{Character, EntityId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, StoreError};

/// Everything held for one character between requests.
#[derive(Debug, Clone)]
pub struct Session {
    pub character: Character,
    /// The running encounter. Never persisted with the character.
    pub encounter: Option<CombatState>,
    pub history: Vec<HistoryTurn>,
    /// Per-character random source.
    pub rng: ChaCha8Rng,
}

impl Session {
    pub fn new(character: Character, rng: ChaCha8Rng) -> Self {
        Self {
            character,
            encounter: None,
            history: Vec::new(),
            rng,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, EntityId>>,
    records: RwLock<HashMap<EntityId, Arc<Mutex<Session>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session. One character per account.
    pub async fn insert(&self, account_id: &str, session: Session) -> Result<EntityId> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(account_id) {
            return Err(StoreError::CharacterExists(account_id.to_string()).into());
        }
        let id = session.character.id;
        self.records
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        accounts.insert(account_id.to_string(), id);
        Ok(id)
    }

    async fn record(&self, account_id: &str) -> Result<Arc<Mutex<Session>>> {
        let id = self
            .accounts
            .read()
            .await
            .get(account_id)
            .copied()
            .ok_or_else(|| StoreError::NoCharacter(account_id.to_string()))?;
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NoCharacter(account_id.to_string()).into())
    }

    /// Snapshot of a session.
    pub async fn read(&self, account_id: &str) -> Result<Session> {
        let record = self.record(account_id).await?;
        let session = record.lock().await;
        Ok(session.clone())
    }

    /// Run `f` against a draft of the session and commit it on success.
    ///
    /// On error the stored session is left exactly as it was.
    pub async fn transact<T, F>(&self, account_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let record = self.record(account_id).await?;
        let mut session = record.lock().await;
        let mut draft = session.clone();
        match f(&mut draft) {
            Ok(value) => {
                *session = draft;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(account = account_id, error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }
}
