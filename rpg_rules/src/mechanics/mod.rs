//! Game mechanics that mutate a character outside of combat: progression,
//! inventory and equipment, quests.
//!
//! Everything here is implemented as inherent methods on
//! [`Character`](crate::entities::Character), split by concern.

mod inventory;
mod progression;
mod quests;

pub use inventory::Purchase;
pub use quests::QuestCompletion;
