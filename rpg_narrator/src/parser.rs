//! Turn the model's free text into a [`Narration`].
//!
//! Parsing never fails: anything that is not the expected JSON envelope
//! becomes the message verbatim and the scene stays where it was.

use serde::{Deserialize, Serialize};

/// Message used when the model gave us nothing usable.
pub const FALLBACK_MESSAGE: &str = "The narrator pauses, lost for words.";
pub const DEFAULT_EMOJI: &str = "default";

/// Flavor text for one player turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    pub message: String,
    pub emoji: String,
    /// Location id the story is set in.
    pub scene: String,
    pub mcp_command: Option<String>,
}

impl Narration {
    /// Plain fallback that keeps the current scene.
    pub fn fallback(message: impl Into<String>, current_scene: &str) -> Self {
        Self {
            message: message.into(),
            emoji: DEFAULT_EMOJI.to_string(),
            scene: current_scene.to_string(),
            mcp_command: None,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    message: Option<String>,
    emoji: Option<String>,
    scene: Option<String>,
    mcp_command: Option<String>,
}

/// Parse a model reply, falling back to the raw text.
pub fn parse_narration(raw: &str, current_scene: &str) -> Narration {
    let text = strip_code_fences(raw);

    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => Narration {
            message: non_empty(envelope.message).unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            emoji: non_empty(envelope.emoji).unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
            scene: non_empty(envelope.scene).unwrap_or_else(|| current_scene.to_string()),
            mcp_command: non_empty(envelope.mcp_command),
        },
        Err(e) => {
            tracing::debug!(error = %e, "narration was not JSON, using raw text");
            let message = if text.is_empty() {
                FALLBACK_MESSAGE
            } else {
                text
            };
            Narration::fallback(message, current_scene)
        }
    }
}

/// Remove a surrounding markdown code fence, with or without a language tag.
fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
