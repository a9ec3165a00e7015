//! WebSocket message types
//!
//! Every frame is `{ "type": ..., "payload": { ... } }`. Client payload fields
//! are camelCase. Game events are forwarded in the same envelope.

use serde::{Deserialize, Serialize};

use crate::application::dto::{HeroActionPayload, InstantActionPayload, MonsterActionPayload};
use crate::application::services::{EntityView, KnownSets, PlayerView, QuestSummary};
use crate::domain::entities::{HeroClass, MovementTiming};
use crate::domain::events::{GameEvent, TurnSnapshot};
use crate::domain::value_objects::{DiceChannel, DoorId, EntityId, PlayerId, Tile, TurnCapability};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Hero,
    GameMaster,
    Spectator,
}

/// When a requested move happens relative to the hero's action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementAction {
    MoveBefore,
    MoveAfter,
}

impl From<MovementAction> for MovementTiming {
    fn from(action: MovementAction) -> Self {
        match action {
            MovementAction::MoveBefore => MovementTiming::BeforeAction,
            MovementAction::MoveAfter => MovementTiming::AfterAction,
        }
    }
}

/// Messages from clients
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join the running quest. Heroes join with their player id as `userId`;
    /// `heroClass` claims a new seat when the quest has none for them.
    JoinSession {
        user_id: String,
        role: ParticipantRole,
        #[serde(default)]
        hero_class: Option<HeroClass>,
    },
    Heartbeat,
    RequestSelectStartingPosition {
        player_id: PlayerId,
        tile: Tile,
    },
    RollMovementDice {
        player_id: PlayerId,
    },
    /// Single step for the sender's own hero
    RequestMove {
        entity_id: EntityId,
        dx: i32,
        dy: i32,
    },
    MovementRequest {
        player_id: PlayerId,
        entity_id: EntityId,
        action: MovementAction,
        dx: i32,
        dy: i32,
    },
    MovementPath {
        player_id: PlayerId,
        entity_id: EntityId,
        action: MovementAction,
        path: Vec<Tile>,
    },
    CompleteMovement {
        player_id: PlayerId,
    },
    HeroAction {
        player_id: PlayerId,
        entity_id: EntityId,
        action: HeroActionPayload,
    },
    InstantActionRequest {
        player_id: PlayerId,
        action: InstantActionPayload,
    },
    RequestToggleDoor {
        threshold_id: DoorId,
    },
    MonsterAction {
        monster_id: EntityId,
        action: MonsterActionPayload,
    },
    EndTurn {},
    #[serde(rename = "PassGMTurn")]
    PassGmTurn {},
    ElectSelf {
        player_id: PlayerId,
    },
    CancelElection {
        player_id: PlayerId,
    },
    ConfirmElection {
        player_id: PlayerId,
    },
    DebugQueueDice {
        channel: DiceChannel,
        values: Vec<u8>,
    },
    DebugForceDoorClosed {
        threshold_id: DoorId,
    },
    DebugGrantCapability {
        player_id: PlayerId,
        capability: TurnCapability,
    },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::JoinSession { .. } => "JoinSession",
            ClientMessage::Heartbeat => "Heartbeat",
            ClientMessage::RequestSelectStartingPosition { .. } => "RequestSelectStartingPosition",
            ClientMessage::RollMovementDice { .. } => "RollMovementDice",
            ClientMessage::RequestMove { .. } => "RequestMove",
            ClientMessage::MovementRequest { .. } => "MovementRequest",
            ClientMessage::MovementPath { .. } => "MovementPath",
            ClientMessage::CompleteMovement { .. } => "CompleteMovement",
            ClientMessage::HeroAction { .. } => "HeroAction",
            ClientMessage::InstantActionRequest { .. } => "InstantActionRequest",
            ClientMessage::RequestToggleDoor { .. } => "RequestToggleDoor",
            ClientMessage::MonsterAction { .. } => "MonsterAction",
            ClientMessage::EndTurn {} => "EndTurn",
            ClientMessage::PassGmTurn {} => "PassGMTurn",
            ClientMessage::ElectSelf { .. } => "ElectSelf",
            ClientMessage::CancelElection { .. } => "CancelElection",
            ClientMessage::ConfirmElection { .. } => "ConfirmElection",
            ClientMessage::DebugQueueDice { .. } => "DebugQueueDice",
            ClientMessage::DebugForceDoorClosed { .. } => "DebugForceDoorClosed",
            ClientMessage::DebugGrantCapability { .. } => "DebugGrantCapability",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: String,
    pub role: ParticipantRole,
}

/// Session-level messages from the server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Everything a client needs to draw the quest after joining
    SessionJoined {
        client_id: String,
        role: ParticipantRole,
        participants: Vec<ParticipantInfo>,
        quest: QuestSummary,
        turn: TurnSnapshot,
        known: KnownSets,
        entities: Vec<EntityView>,
        players: Vec<PlayerView>,
    },
    ParticipantJoined {
        user_id: String,
        role: ParticipantRole,
    },
    ParticipantLeft {
        user_id: String,
        role: ParticipantRole,
    },
    Error {
        code: String,
        message: String,
    },
    Pong,
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Anything written to a client socket
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Session(ServerMessage),
    Game(GameEvent),
}

impl From<ServerMessage> for OutboundMessage {
    fn from(message: ServerMessage) -> Self {
        OutboundMessage::Session(message)
    }
}

impl From<GameEvent> for OutboundMessage {
    fn from(event: GameEvent) -> Self {
        OutboundMessage::Game(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_client_envelopes() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "MovementRequest", "payload": {"playerId": "p1", "entityId": "hero-p1",
                "action": "move_after", "dx": 0, "dy": -1}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::MovementRequest { action, dy, .. } => {
                assert_eq!(MovementTiming::from(action), MovementTiming::AfterAction);
                assert_eq!(dy, -1);
            }
            other => panic!("unexpected message {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "HeroAction", "payload": {"playerId": "p1", "entityId": "hero-p1",
                "action": {"type": "attack", "targetId": "orc-1"}}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), "HeroAction");

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "PassGMTurn", "payload": {}}"#).unwrap();
        assert_eq!(msg.kind(), "PassGMTurn");

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "Heartbeat"}"#).unwrap();
        assert_eq!(msg.kind(), "Heartbeat");
    }

    #[test]
    fn test_unknown_message_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "Teleport", "payload": {}}"#).is_err());
    }

    #[test]
    fn test_outbound_envelopes_match() {
        let error = OutboundMessage::from(ServerMessage::error("not_your_turn", "It is not your turn"));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["payload"]["code"], "not_your_turn");

        let event = OutboundMessage::from(GameEvent::EntityRemoved {
            id: EntityId::new("orc-1"),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "EntityRemoved");
        assert_eq!(json["payload"]["id"], "orc-1");

        let json = serde_json::to_value(OutboundMessage::from(ServerMessage::Pong)).unwrap();
        assert_eq!(json["type"], "Pong");
    }
}
