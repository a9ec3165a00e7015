//! Monster entity - board occupants controlled by the game master

use crate::domain::value_objects::EntityId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monster {
    pub id: EntityId,
    pub kind: String,
    pub body_points: u32,
    pub attack_dice: u32,
    pub defend_dice: u32,
}

impl Monster {
    pub fn new(id: EntityId, kind: impl Into<String>, body_points: u32, attack_dice: u32, defend_dice: u32) -> Self {
        Self {
            id,
            kind: kind.into(),
            body_points,
            attack_dice,
            defend_dice,
        }
    }

    /// Returns the damage actually applied
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.body_points);
        self.body_points -= applied;
        applied
    }

    pub fn is_defeated(&self) -> bool {
        self.body_points == 0
    }
}
