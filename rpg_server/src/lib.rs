//! # Server
//!
//! The boundary of Emberfall. Requests arrive as JSON lines, run against
//! a per-character transactional store, and leave as JSON lines. Combat
//! sessions live here and never inside the character record.

pub mod config;
pub mod error;
pub mod narration;
pub mod protocol;
pub mod service;
pub mod store;

pub use config::ServerConfig;
pub use error::{ConfigError, ServiceError};
pub use protocol::{Request, Response};
pub use service::GameService;
