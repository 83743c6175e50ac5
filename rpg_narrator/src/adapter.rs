//! The narration boundary: prompt in, flavor text out, never an error.

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::LlmClient;
use crate::context_assembler::NarrationContext;
use crate::error::Result;
use crate::parser::{parse_narration, Narration};

/// Shown when the model cannot be reached.
pub const UNAVAILABLE_MESSAGE: &str = "The narrator is silent for a moment. The adventure goes on.";

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl NarrativeBackend for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }
}

#[async_trait]
impl<T: NarrativeBackend + ?Sized> NarrativeBackend for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt).await
    }
}

/// Wraps a backend so that failures degrade to fallback text.
pub struct NarrationAdapter<B> {
    backend: B,
}

impl<B: NarrativeBackend> NarrationAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Narrate one turn. Upstream errors are logged and replaced by a
    /// fallback that keeps the current scene.
    pub async fn narrate(&self, context: &NarrationContext) -> Narration {
        let prompt = context.to_prompt_string();
        let scene = context.location.id.as_str();

        match self.backend.generate(&prompt).await {
            Ok(raw) => parse_narration(&raw, scene),
            Err(e) => {
                tracing::warn!(error = %e, "narration unavailable, using fallback");
                Narration::fallback(UNAVAILABLE_MESSAGE, scene)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_assembler::ContextAssembler;
    use crate::error::NarrationError;
    use chrono::Utc;
    use rpg_rules::{Catalog, Character, ClassId, PersonalityId};
    use std::sync::Mutex;

    struct Canned(String);

    #[async_trait]
    impl NarrativeBackend for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct Down;

    #[async_trait]
    impl NarrativeBackend for Down {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(NarrationError::Transport("connection refused".into()))
        }
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl NarrativeBackend for Recording {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.0.lock().unwrap().push(prompt.to_string());
            Ok("{\"message\": \"ok\"}".into())
        }
    }

    fn context() -> NarrationContext {
        let catalog = Catalog::builtin().unwrap();
        let hero = Character::create(
            &catalog,
            "acct",
            "Hale",
            &ClassId::from("ranger"),
            &PersonalityId::from("cautious"),
            Utc::now(),
        )
        .unwrap();
        ContextAssembler::with_defaults().assemble(&catalog, &hero, None, &[], "Look around")
    }

    #[tokio::test]
    async fn test_narrate_parses_reply() {
        let adapter = NarrationAdapter::new(Canned(
            r#"{"message": "Smoke rises from the chimneys.", "emoji": "relaxed"}"#.into(),
        ));
        let narration = adapter.narrate(&context()).await;
        assert_eq!(narration.message, "Smoke rises from the chimneys.");
        assert_eq!(narration.emoji, "relaxed");
        assert_eq!(narration.scene, "village");
    }

    #[tokio::test]
    async fn test_narrate_survives_upstream_failure() {
        let narration = NarrationAdapter::new(Down).narrate(&context()).await;
        assert_eq!(narration.message, UNAVAILABLE_MESSAGE);
        assert_eq!(narration.scene, "village");
    }

    #[tokio::test]
    async fn test_prompt_reaches_backend() {
        let adapter = NarrationAdapter::new(Recording::default());
        adapter.narrate(&context()).await;
        let prompts = adapter.backend.0.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Look around"));
    }
}
