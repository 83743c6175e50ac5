//! Damage formula and random rolls.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::CombatRules;

/// Result of one damage roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub damage: u32,
    pub critical: bool,
}

/// Bernoulli trial. `0.0` never fires and `1.0` always fires.
pub fn roll<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    if chance <= 0.0 {
        false
    } else if chance >= 1.0 {
        true
    } else {
        rng.gen::<f64>() < chance
    }
}

/// Uniform variance factor. A degenerate range yields its lower bound.
pub fn variance<R: Rng + ?Sized>(rng: &mut R, rules: &CombatRules) -> f64 {
    if rules.variance_max <= rules.variance_min {
        rules.variance_min
    } else {
        rng.gen_range(rules.variance_min..=rules.variance_max)
    }
}

/// The damage formula with every random input already drawn.
///
/// `max(1, attack - defense)` scaled by variance and multiplier, truncated,
/// then scaled by the critical multiplier and truncated again. Never below 1.
pub fn calculate_damage(
    attack: u32,
    defense: u32,
    variance: f64,
    multiplier: f64,
    critical: Option<f64>,
) -> u32 {
    let base = attack.saturating_sub(defense).max(1);
    let mut damage = (f64::from(base) * variance * multiplier) as u32;
    if let Some(crit_multiplier) = critical {
        damage = (f64::from(damage) * crit_multiplier) as u32;
    }
    damage.max(1)
}

/// Roll a regular attack: critical check, then variance.
pub fn roll_attack<R: Rng + ?Sized>(
    rng: &mut R,
    rules: &CombatRules,
    attack: u32,
    defense: u32,
    multiplier: f64,
) -> Hit {
    let critical = roll(rng, rules.crit_chance);
    let factor = variance(rng, rules);
    Hit {
        damage: calculate_damage(
            attack,
            defense,
            factor,
            multiplier,
            critical.then_some(rules.crit_multiplier),
        ),
        critical,
    }
}

/// Roll a special ability. Abilities never crit.
pub fn roll_ability<R: Rng + ?Sized>(
    rng: &mut R,
    rules: &CombatRules,
    attack: u32,
    defense: u32,
    multiplier: f64,
) -> u32 {
    let factor = variance(rng, rules);
    calculate_damage(attack, defense, factor, multiplier, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_base_damage() {
        assert_eq!(calculate_damage(15, 2, 1.0, 1.0, None), 13);
    }

    #[test]
    fn test_defense_above_attack_still_hurts() {
        assert_eq!(calculate_damage(5, 8, 1.0, 1.0, None), 1);
        assert_eq!(calculate_damage(5, 8, 0.9, 0.5, None), 1);
    }

    #[test]
    fn test_multiplier_then_critical() {
        // 20 * 1.0 * 0.5 = 10, then 10 * 1.5 = 15
        assert_eq!(calculate_damage(25, 5, 1.0, 0.5, Some(1.5)), 15);
        // truncation happens before the critical scaling: 11 * 0.95 = 10.45 -> 10 -> 15
        assert_eq!(calculate_damage(21, 10, 0.95, 1.0, Some(1.5)), 15);
    }

    #[test]
    fn test_roll_extremes_are_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..1_000 {
            assert!(!roll(&mut rng, 0.0));
            assert!(roll(&mut rng, 1.0));
        }
    }

    #[test]
    fn test_degenerate_variance() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let rules = CombatRules::deterministic();
        assert_eq!(variance(&mut rng, &rules), 1.0);
    }

    #[test]
    fn test_deterministic_attack() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let rules = CombatRules::deterministic();
        for _ in 0..100 {
            let hit = roll_attack(&mut rng, &rules, 15, 2, 1.0);
            assert_eq!(hit, Hit { damage: 13, critical: false });
        }
    }

    #[test]
    fn test_crit_rate_close_to_configured() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rules = CombatRules::default();
        let trials = 20_000;
        let crits = (0..trials)
            .filter(|_| roll_attack(&mut rng, &rules, 30, 0, 1.0).critical)
            .count();
        let rate = crits as f64 / trials as f64;
        assert!((rate - 0.15).abs() < 0.02, "crit rate {rate}");
    }

    proptest! {
        #[test]
        fn prop_damage_within_variance_band(
            attack in 0u32..1000,
            defense in 0u32..1000,
            seed in any::<u64>(),
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let rules = CombatRules { crit_chance: 0.0, ..CombatRules::default() };
            let base = attack.saturating_sub(defense).max(1);
            let hit = roll_attack(&mut rng, &rules, attack, defense, 1.0);

            prop_assert!(hit.damage >= 1);
            prop_assert!(f64::from(hit.damage) <= f64::from(base) * 1.1);
            prop_assert!(f64::from(hit.damage) >= (f64::from(base) * 0.9).floor().max(1.0));
        }
    }
}
