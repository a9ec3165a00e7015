//! Dice rolling and combat resolution
//!
//! Dice are six-sided. Each roll is drawn from a named channel; tests and the
//! debug tooling can queue values on a channel, which are then returned in
//! order (one per roll) before the random generator is used again.

use std::collections::{HashMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::domain::errors::GameError;
use crate::domain::value_objects::{CombatFace, DefenderKind, DiceChannel};

pub struct DiceResolver {
    rng: StdRng,
    overrides: HashMap<DiceChannel, VecDeque<u8>>,
}

impl DiceResolver {
    /// Seeded for reproducible games, otherwise seeded from the OS
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            overrides: HashMap::new(),
        }
    }

    /// Queue forced results for the next rolls on `channel`
    pub fn queue_override(&mut self, channel: DiceChannel, values: &[u8]) -> Result<(), GameError> {
        if let Some(bad) = values.iter().find(|v| !(1..=6).contains(*v)) {
            return Err(GameError::InvalidDieValue(*bad));
        }
        self.overrides
            .entry(channel)
            .or_default()
            .extend(values.iter().copied());
        tracing::debug!("Queued {} dice override(s) on {} channel", values.len(), channel);
        Ok(())
    }

    #[cfg(test)]
    pub fn pending_overrides(&self, channel: DiceChannel) -> usize {
        self.overrides.get(&channel).map_or(0, VecDeque::len)
    }

    pub fn roll(&mut self, channel: DiceChannel) -> u8 {
        if let Some(value) = self.overrides.get_mut(&channel).and_then(VecDeque::pop_front) {
            return value;
        }
        self.rng.gen_range(1..=6)
    }

    pub fn roll_many(&mut self, channel: DiceChannel, count: u32) -> Vec<u8> {
        (0..count).map(|_| self.roll(channel)).collect()
    }

    /// Rolls attack and defence dice and resolves the exchange
    pub fn roll_combat(&mut self, attack_dice: u32, defend_dice: u32, defender: DefenderKind) -> CombatOutcome {
        let attack_rolls = self.roll_many(DiceChannel::Attack, attack_dice);
        let defense_rolls = self.roll_many(DiceChannel::Defense, defend_dice);
        resolve_combat(attack_rolls, defense_rolls, defender)
    }
}

impl std::fmt::Debug for DiceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiceResolver")
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

/// Result of one attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombatOutcome {
    pub attack_rolls: Vec<u8>,
    pub defense_rolls: Vec<u8>,
    pub skulls: u32,
    pub shields: u32,
    pub damage: u32,
}

/// Damage is skulls minus the shields that count for this defender, never negative
pub fn resolve_combat(attack_rolls: Vec<u8>, defense_rolls: Vec<u8>, defender: DefenderKind) -> CombatOutcome {
    let skulls = attack_rolls
        .iter()
        .filter(|v| CombatFace::from_attack(**v) == CombatFace::Skull)
        .count() as u32;
    let shields = defense_rolls
        .iter()
        .filter(|v| CombatFace::from_defense(**v).blocks_for(defender))
        .count() as u32;

    CombatOutcome {
        attack_rolls,
        defense_rolls,
        skulls,
        shields,
        damage: skulls.saturating_sub(shields),
    }
}
