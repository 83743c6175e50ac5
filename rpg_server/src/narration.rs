//! Picks the narrative backend the service talks to.

use async_trait::async_trait;
use rpg_narrator::client::{DEFAULT_API_URL, DEFAULT_MODEL};
use rpg_narrator::{LlmClient, NarrationError, NarrativeBackend};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::ConfigError;

pub type SharedBackend = Arc<dyn NarrativeBackend>;

/// Backend used when no model is configured. Every call fails, so the
/// adapter always answers with its fallback text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

#[async_trait]
impl NarrativeBackend for Silent {
    async fn generate(&self, _prompt: &str) -> rpg_narrator::Result<String> {
        Err(NarrationError::MissingApiKey)
    }
}

pub fn backend(config: &LlmConfig, offline: bool) -> Result<SharedBackend, ConfigError> {
    let api_key = match (&config.api_key, offline) {
        (Some(key), false) if !key.is_empty() => key.clone(),
        _ => {
            tracing::info!("narration disabled, using fallback text");
            return Ok(Arc::new(Silent));
        }
    };
    let api_url = config.api_url.as_deref().unwrap_or(DEFAULT_API_URL).to_string();
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL).to_string();
    let client = LlmClient::new(api_key, api_url, model)?;
    tracing::info!(format = ?client.api_format(), "narration enabled");
    Ok(Arc::new(client))
}
