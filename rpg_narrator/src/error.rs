//! Errors raised while talking to the language model.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("LLM_API_KEY not set")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("LLM request failed: {0}")]
    Transport(String),

    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for NarrationError {
    fn from(e: reqwest::Error) -> Self {
        NarrationError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NarrationError>;
