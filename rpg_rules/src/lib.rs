//! # Game Rules
//!
//! The rules crate of Emberfall: catalog content, character progression,
//! inventory and equipment, quests, locations and the combat engine.
//! Every number the game shows is computed here. Nothing in this crate
//! performs I/O or talks to the narrator.

pub mod catalog;
pub mod combat;
pub mod entities;
pub mod error;
pub mod mechanics;
pub mod world;

pub use catalog::Catalog;
pub use combat::{CombatAction, CombatEngine, CombatOutcome, CombatState};
pub use entities::*;
pub use error::{ErrorKind, Result, RulesError};
pub use mechanics::*;
pub use world::Exploration;
