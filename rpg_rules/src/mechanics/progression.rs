//! Experience, levelling, hp/mp mutation and the death payout.

use crate::catalog::{Catalog, DeathPenalty};
use crate::entities::Character;
use crate::error::Result;

impl Character {
    /// Add experience and apply every level-up it pays for.
    ///
    /// Each level costs `level * 100` experience at the level being left.
    /// When at least one level is gained, hp and mp are refilled to the new
    /// maximums. Returns the number of levels gained.
    pub fn gain_experience(&mut self, catalog: &Catalog, amount: u64) -> Result<u32> {
        let growth = catalog.require_class(&self.class)?.growth;

        self.experience += amount;
        let mut level_ups = 0;
        while self.experience >= self.experience_needed() {
            self.experience -= self.experience_needed();
            self.level += 1;
            self.stats.max_hp += growth.hp;
            self.stats.max_mp += growth.mp;
            self.stats.attack += growth.attack;
            self.stats.defense += growth.defense;
            level_ups += 1;
        }

        if level_ups > 0 {
            self.stats.hp = self.max_hp();
            self.stats.mp = self.max_mp();
            tracing::info!(
                character = %self.id,
                level = self.level,
                gained = level_ups,
                "level up"
            );
        }
        Ok(level_ups)
    }

    /// Apply incoming damage after this character's defense.
    ///
    /// At least 1 point always lands. Returns `true` if hp reached 0.
    pub fn take_damage(&mut self, raw_damage: u32) -> bool {
        let effective = raw_damage.saturating_sub(self.defense()).max(1);
        self.stats.hp = self.stats.hp.saturating_sub(effective);
        self.stats.hp == 0
    }

    pub fn heal(&mut self, amount: u32) {
        self.stats.hp = self.stats.hp.saturating_add(amount).min(self.max_hp());
    }

    pub fn restore_mp(&mut self, amount: u32) {
        self.stats.mp = self.stats.mp.saturating_add(amount).min(self.max_mp());
    }

    pub fn full_restore(&mut self) {
        self.stats.hp = self.max_hp();
        self.stats.mp = self.max_mp();
    }

    /// Defeat payout: lose a fraction of gold, wake up at the respawn point
    /// with a fraction of max hp. Returns the gold lost.
    pub fn apply_death_penalty(&mut self, penalty: &DeathPenalty) -> u64 {
        let gold_lost = (self.gold as f64 * penalty.gold_loss_fraction).floor() as u64;
        self.gold -= gold_lost.min(self.gold);
        self.stats.hp = (f64::from(self.max_hp()) * penalty.hp_restore_fraction).floor() as u32;
        self.current_location = penalty.respawn_location.clone();
        gold_lost
    }
}
