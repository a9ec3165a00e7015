//! Player entity - a hero taking part in the quest

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, PlayerId};

/// Hero archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeroClass {
    Barbarian,
    Dwarf,
    Elf,
    Wizard,
}

/// Bonuses granted by carried equipment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentModifiers {
    #[serde(default)]
    pub attack_dice: u32,
    #[serde(default)]
    pub defend_dice: u32,
}

/// Character sheet numbers the rules read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub body_points: u32,
    pub max_body_points: u32,
    pub mind_points: u32,
    pub max_mind_points: u32,
    pub attack_dice: u32,
    pub defend_dice: u32,
    pub movement_dice: u32,
    #[serde(default)]
    pub modifiers: EquipmentModifiers,
}

impl CharacterStats {
    /// Starting sheet for each class
    pub fn for_class(class: HeroClass) -> Self {
        let (body, mind, attack) = match class {
            HeroClass::Barbarian => (8, 2, 3),
            HeroClass::Dwarf => (7, 3, 2),
            HeroClass::Elf => (6, 4, 2),
            HeroClass::Wizard => (4, 6, 1),
        };
        Self {
            body_points: body,
            max_body_points: body,
            mind_points: mind,
            max_mind_points: mind,
            attack_dice: attack,
            defend_dice: 2,
            movement_dice: 2,
            modifiers: EquipmentModifiers::default(),
        }
    }

    pub fn total_attack_dice(&self) -> u32 {
        self.attack_dice + self.modifiers.attack_dice
    }

    pub fn total_defend_dice(&self) -> u32 {
        self.defend_dice + self.modifiers.defend_dice
    }
}

/// A hero player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub entity_id: EntityId,
    pub class: HeroClass,
    pub stats: CharacterStats,
}

impl Player {
    pub fn new(id: PlayerId, entity_id: EntityId, class: HeroClass) -> Self {
        Self {
            id,
            entity_id,
            class,
            stats: CharacterStats::for_class(class),
        }
    }

    pub fn with_stats(mut self, stats: CharacterStats) -> Self {
        self.stats = stats;
        self
    }

    /// Returns the damage actually applied
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.stats.body_points);
        self.stats.body_points -= applied;
        applied
    }

    /// Returns the body points actually restored
    pub fn heal(&mut self, amount: u32) -> u32 {
        let missing = self
            .stats
            .max_body_points
            .saturating_sub(self.stats.body_points);
        let applied = amount.min(missing);
        self.stats.body_points += applied;
        applied
    }

    pub fn is_defeated(&self) -> bool {
        self.stats.body_points == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barbarian() -> Player {
        Player::new(PlayerId::new("p1"), EntityId::new("hero-1"), HeroClass::Barbarian)
    }

    #[test]
    fn test_damage_stops_at_zero() {
        let mut hero = barbarian();
        assert_eq!(hero.take_damage(3), 3);
        assert_eq!(hero.stats.body_points, 5);
        assert_eq!(hero.take_damage(10), 5);
        assert!(hero.is_defeated());
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut hero = barbarian();
        hero.take_damage(2);
        assert_eq!(hero.heal(5), 2);
        assert_eq!(hero.stats.body_points, hero.stats.max_body_points);
    }

    #[test]
    fn test_equipment_adds_dice() {
        let mut stats = CharacterStats::for_class(HeroClass::Dwarf);
        stats.modifiers.attack_dice = 1;
        assert_eq!(stats.total_attack_dice(), 3);
        assert_eq!(stats.total_defend_dice(), 2);
    }
}
