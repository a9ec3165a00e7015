//! Action payloads - one tagged variant per action kind
//!
//! Decoded once at the WebSocket boundary, e.g.
//! `{"type": "attack", "targetId": "orc-1"}`.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, ItemId, PlayerId};

/// Main actions; each one uses up the hero's action for the turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HeroActionPayload {
    Attack {
        target_id: EntityId,
    },
    SearchTreasure,
    SearchTraps,
    SearchSecretDoors,
    CastSpell {
        spell_id: String,
        #[serde(default)]
        target_id: Option<EntityId>,
    },
    Pass,
}

impl HeroActionPayload {
    pub fn name(&self) -> &'static str {
        match self {
            HeroActionPayload::Attack { .. } => "attack",
            HeroActionPayload::SearchTreasure => "search_treasure",
            HeroActionPayload::SearchTraps => "search_traps",
            HeroActionPayload::SearchSecretDoors => "search_secret_doors",
            HeroActionPayload::CastSpell { .. } => "cast_spell",
            HeroActionPayload::Pass => "pass",
        }
    }
}

/// Actions that cost neither movement nor the main action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InstantActionPayload {
    DrinkPotion { item_id: ItemId, heal: u32 },
    Trade { with_player_id: PlayerId, item_id: ItemId },
}

impl InstantActionPayload {
    pub fn name(&self) -> &'static str {
        match self {
            InstantActionPayload::DrinkPotion { .. } => "drink_potion",
            InstantActionPayload::Trade { .. } => "trade",
        }
    }
}

/// What the game master tells one monster to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum MonsterActionPayload {
    Move { dx: i32, dy: i32 },
    Attack { target_id: EntityId },
}

impl MonsterActionPayload {
    pub fn name(&self) -> &'static str {
        match self {
            MonsterActionPayload::Move { .. } => "move",
            MonsterActionPayload::Attack { .. } => "attack",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hero_actions() {
        let attack: HeroActionPayload =
            serde_json::from_str(r#"{"type": "attack", "targetId": "orc-1"}"#).unwrap();
        assert_eq!(
            attack,
            HeroActionPayload::Attack {
                target_id: EntityId::new("orc-1")
            }
        );

        let spell: HeroActionPayload =
            serde_json::from_str(r#"{"type": "cast_spell", "spellId": "fire"}"#).unwrap();
        assert_eq!(spell.name(), "cast_spell");

        let pass: HeroActionPayload = serde_json::from_str(r#"{"type": "pass"}"#).unwrap();
        assert_eq!(pass, HeroActionPayload::Pass);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = serde_json::from_str::<HeroActionPayload>(r#"{"type": "dance"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_instant_and_monster_actions() {
        let potion: InstantActionPayload =
            serde_json::from_str(r#"{"type": "drink_potion", "itemId": "potion-1", "heal": 4}"#).unwrap();
        assert_eq!(potion.name(), "drink_potion");

        let step: MonsterActionPayload = serde_json::from_str(r#"{"type": "move", "dx": 1, "dy": 0}"#).unwrap();
        assert_eq!(step, MonsterActionPayload::Move { dx: 1, dy: 0 });
        assert_eq!(step.name(), "move");
    }
}
