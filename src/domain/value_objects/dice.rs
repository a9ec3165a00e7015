//! Dice channels and combat die faces

use serde::{Deserialize, Serialize};

/// Named stream a die is rolled on; debug overrides are queued per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceChannel {
    Movement,
    Attack,
    Defense,
}

impl std::fmt::Display for DiceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiceChannel::Movement => write!(f, "movement"),
            DiceChannel::Attack => write!(f, "attack"),
            DiceChannel::Defense => write!(f, "defense"),
        }
    }
}

/// Who is rolling defence; decides which shields count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenderKind {
    Hero,
    Monster,
}

/// Symbol shown by a combat die
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatFace {
    Skull,
    WhiteShield,
    BlackShield,
    Blank,
}

impl CombatFace {
    /// Attack die: 4 and up is a skull
    pub fn from_attack(value: u8) -> Self {
        if value >= 4 {
            CombatFace::Skull
        } else {
            CombatFace::Blank
        }
    }

    /// Defence die: 6 is a black shield, 4-5 a white shield
    pub fn from_defense(value: u8) -> Self {
        match value {
            6 => CombatFace::BlackShield,
            4 | 5 => CombatFace::WhiteShield,
            _ => CombatFace::Blank,
        }
    }

    /// Monsters only block with black shields; heroes with either colour
    pub fn blocks_for(self, defender: DefenderKind) -> bool {
        match (self, defender) {
            (CombatFace::BlackShield, _) => true,
            (CombatFace::WhiteShield, DefenderKind::Hero) => true,
            _ => false,
        }
    }
}
