//! Server configuration: an optional TOML file, then environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use rpg_rules::Catalog;

use crate::error::ConfigError;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Language model settings. Narration is disabled without an API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Substitute catalog document. The built-in one is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Seed for the game's random source. Drawn from entropy when unset.
    pub seed: Option<u64>,
    /// Conversation turns kept per character.
    pub history_limit: usize,
    pub llm: LlmConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            seed: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            llm: LlmConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read a config file, or start from defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Self::from_toml_str(&source)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(key) = lookup("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("LLM_API_URL") {
            self.llm.api_url = Some(url);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(path) = lookup("RPG_CATALOG") {
            self.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(seed) = lookup("RPG_SEED") {
            let seed = seed.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RPG_SEED",
                value: seed,
            })?;
            self.seed = Some(seed);
        }
        Ok(self)
    }
}

/// Load the catalog named by the config, or the built-in one.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, ConfigError> {
    let Some(path) = path else {
        return Ok(Catalog::builtin()?);
    };
    let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(Catalog::from_toml_str(&source)?)
}
