//! # Narrator
//!
//! Flavor text for Emberfall. This crate reads engine state, assembles a
//! prompt, asks a language model for narration and parses the reply. It
//! never writes to game state and never fails the enclosing action.
//!
//! ## Core Components
//!
//! - **context_assembler**: Renders character, location, quests and combat into a prompt
//! - **client**: HTTP client for Gemini and OpenAI-compatible APIs
//! - **parser**: Tolerant parsing of the model's JSON envelope
//! - **adapter**: The [`NarrativeBackend`] seam and the never-failing [`NarrationAdapter`]

pub mod adapter;
pub mod client;
pub mod context_assembler;
pub mod error;
pub mod parser;

pub use adapter::{NarrationAdapter, NarrativeBackend};
pub use client::LlmClient;
pub use context_assembler::{ContextAssembler, HistoryTurn, NarrationContext, Speaker};
pub use error::{NarrationError, Result};
pub use parser::{parse_narration, Narration};
