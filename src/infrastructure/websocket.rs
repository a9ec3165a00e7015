//! WebSocket handler for game clients
//!
//! Each connection joins the running quest once and then sends game requests.
//! Accepted requests answer through broadcast game events; rejected ones get
//! an `Error { code, message }` back on the same socket.

pub mod messages;

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::services::{Actor, QuestService};
use crate::domain::entities::HeroClass;
use crate::domain::errors::GameError;
use crate::domain::value_objects::{PlayerId, Step};
use crate::infrastructure::session::{ClientId, SessionError};
use crate::infrastructure::state::AppState;

use messages::{ClientMessage, OutboundMessage, ParticipantRole, ServerMessage};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let client_id = ClientId::new();

    // Game events and direct replies share one outbound queue
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();

    tracing::info!("New WebSocket connection established: {}", client_id);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Failed to serialize outbound message: {}", e),
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => handle_message(msg, &state, client_id, tx.clone()).await,
                    Err(e) => {
                        tracing::warn!("Failed to parse message: {}", e);
                        Some(ServerMessage::error("parse_error", format!("Invalid message format: {}", e)))
                    }
                };
                if let Some(reply) = reply {
                    if tx.send(reply.into()).is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket connection closed by client: {}", client_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                let _ = tx.send(ServerMessage::Pong.into());
            }
            Err(e) => {
                tracing::error!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    {
        let mut sessions = state.sessions.write().await;
        if let Some(participant) = sessions.leave(client_id) {
            let left = ServerMessage::ParticipantLeft {
                user_id: participant.user_id,
                role: participant.role,
            };
            sessions.broadcast(&left.into());
        }
    }

    send_task.abort();
    tracing::info!("WebSocket connection terminated: {}", client_id);
}

/// Rejections reported back to the sender
#[derive(Debug, thiserror::Error)]
enum RequestError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RequestError {
    fn code(&self) -> &'static str {
        match self {
            RequestError::Game(e) => e.code(),
            RequestError::Session(e) => e.code(),
        }
    }
}

impl From<RequestError> for ServerMessage {
    fn from(error: RequestError) -> Self {
        ServerMessage::error(error.code(), error.to_string())
    }
}

async fn handle_message(
    msg: ClientMessage,
    state: &AppState,
    client_id: ClientId,
    sender: mpsc::UnboundedSender<OutboundMessage>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Heartbeat => Some(ServerMessage::Pong),

        ClientMessage::JoinSession {
            user_id,
            role,
            hero_class,
        } => {
            tracing::info!("User {} joining as {:?}", user_id, role);
            match join_session(state, client_id, user_id, role, hero_class, sender).await {
                Ok(joined) => Some(joined),
                Err(e) => {
                    tracing::warn!("Join rejected for client {}: {}", client_id, e);
                    Some(e.into())
                }
            }
        }

        msg => {
            let caller = {
                let sessions = state.sessions.read().await;
                sessions.participant(client_id).map(|p| Caller {
                    user_id: p.user_id.clone(),
                    role: p.role,
                })
            };
            let Some(caller) = caller else {
                return Some(RequestError::from(SessionError::NotJoined(client_id)).into());
            };

            let kind = msg.kind();
            tracing::debug!("{} from {} ({:?})", kind, caller.user_id, caller.role);
            match dispatch(&state.quest, &caller, msg) {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!("{} from {} rejected: {}", kind, caller.user_id, e);
                    Some(RequestError::from(e).into())
                }
            }
        }
    }
}

async fn join_session(
    state: &AppState,
    client_id: ClientId,
    user_id: String,
    role: ParticipantRole,
    hero_class: Option<HeroClass>,
    sender: mpsc::UnboundedSender<OutboundMessage>,
) -> Result<ServerMessage, RequestError> {
    if user_id.trim().is_empty() {
        return Err(SessionError::EmptyUserId.into());
    }
    if role == ParticipantRole::Hero {
        let player_id = PlayerId::new(user_id.clone());
        if !state.quest.has_player(&player_id) {
            match hero_class {
                Some(class) => {
                    state.quest.register_hero(player_id, class)?;
                }
                None => return Err(GameError::UnknownPlayer(player_id).into()),
            }
        }
    }

    let participants = {
        let mut sessions = state.sessions.write().await;
        sessions.join(client_id, user_id.clone(), role, sender)?;
        sessions.broadcast_except(&ServerMessage::ParticipantJoined { user_id, role }.into(), client_id);
        sessions.participants()
    };

    let quest = &state.quest;
    Ok(ServerMessage::SessionJoined {
        client_id: client_id.to_string(),
        role,
        participants,
        quest: quest.summary(),
        turn: quest.turn_snapshot(),
        known: quest.known_sets(),
        entities: quest.visible_entities(),
        players: quest.players(),
    })
}

/// Who sent a request, as recorded when they joined
#[derive(Debug, Clone)]
struct Caller {
    user_id: String,
    role: ParticipantRole,
}

impl Caller {
    /// The caller must be the hero `player_id`
    fn hero(&self, player_id: &PlayerId) -> Result<(), GameError> {
        if self.role != ParticipantRole::Hero || self.user_id != player_id.as_str() {
            return Err(GameError::PermissionDenied(format!(
                "{} cannot act for {}",
                self.user_id, player_id
            )));
        }
        Ok(())
    }

    fn own_hero(&self) -> Result<PlayerId, GameError> {
        let player_id = PlayerId::new(self.user_id.clone());
        self.hero(&player_id)?;
        Ok(player_id)
    }

    fn game_master(&self) -> Result<(), GameError> {
        if self.role != ParticipantRole::GameMaster {
            return Err(GameError::PermissionDenied("game master only".to_string()));
        }
        Ok(())
    }

    fn actor(&self) -> Result<Actor, GameError> {
        match self.role {
            ParticipantRole::Hero => Ok(Actor::Hero(PlayerId::new(self.user_id.clone()))),
            ParticipantRole::GameMaster => Ok(Actor::GameMaster),
            ParticipantRole::Spectator => Err(GameError::PermissionDenied("spectators cannot act".to_string())),
        }
    }
}

/// Routes one game request to the quest service
fn dispatch(quest: &QuestService, caller: &Caller, msg: ClientMessage) -> Result<(), GameError> {
    match msg {
        ClientMessage::JoinSession { .. } | ClientMessage::Heartbeat => {}

        ClientMessage::RequestSelectStartingPosition { player_id, tile } => {
            caller.hero(&player_id)?;
            quest.select_starting_position(&player_id, tile)?;
        }
        ClientMessage::RollMovementDice { player_id } => {
            caller.hero(&player_id)?;
            quest.roll_movement_dice(&player_id)?;
        }
        ClientMessage::RequestMove { entity_id, dx, dy } => {
            let player_id = caller.own_hero()?;
            quest.request_move(&player_id, &entity_id, Step::new(dx, dy), None)?;
        }
        ClientMessage::MovementRequest {
            player_id,
            entity_id,
            action,
            dx,
            dy,
        } => {
            caller.hero(&player_id)?;
            quest.request_move(&player_id, &entity_id, Step::new(dx, dy), Some(action.into()))?;
        }
        ClientMessage::MovementPath {
            player_id,
            entity_id,
            action,
            path,
        } => {
            caller.hero(&player_id)?;
            quest.move_along_path(&player_id, &entity_id, &path, Some(action.into()))?;
        }
        ClientMessage::CompleteMovement { player_id } => {
            caller.hero(&player_id)?;
            quest.complete_movement(&player_id)?;
        }
        ClientMessage::HeroAction {
            player_id,
            entity_id,
            action,
        } => {
            caller.hero(&player_id)?;
            quest.hero_action(&player_id, &entity_id, action)?;
        }
        ClientMessage::InstantActionRequest { player_id, action } => {
            caller.hero(&player_id)?;
            quest.instant_action(&player_id, action)?;
        }
        ClientMessage::RequestToggleDoor { threshold_id } => {
            quest.toggle_door(&caller.actor()?, &threshold_id)?;
        }
        ClientMessage::MonsterAction { monster_id, action } => {
            caller.game_master()?;
            quest.monster_action(&monster_id, action)?;
        }
        ClientMessage::EndTurn {} => {
            quest.end_turn(&caller.actor()?)?;
        }
        ClientMessage::PassGmTurn {} => {
            caller.game_master()?;
            quest.pass_gm_turn()?;
        }
        ClientMessage::ElectSelf { player_id } => {
            caller.hero(&player_id)?;
            quest.elect(&player_id)?;
        }
        ClientMessage::CancelElection { player_id } => {
            caller.hero(&player_id)?;
            quest.cancel_election(&player_id)?;
        }
        ClientMessage::ConfirmElection { player_id } => {
            caller.hero(&player_id)?;
            quest.confirm_election(&player_id)?;
        }
        ClientMessage::DebugQueueDice { channel, values } => {
            caller.game_master()?;
            quest.queue_dice_override(channel, &values)?;
        }
        ClientMessage::DebugForceDoorClosed { threshold_id } => {
            caller.game_master()?;
            quest.force_door_closed(&threshold_id)?;
        }
        ClientMessage::DebugGrantCapability { player_id, capability } => {
            caller.game_master()?;
            quest.grant_capability(&player_id, capability)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::QuestSettings;
    use crate::domain::entities::TurnType;
    use crate::domain::events::GameEvent;
    use crate::infrastructure::quest_loader::demo_quest;
    use crate::infrastructure::session::ChannelBroadcaster;

    fn quest() -> (QuestService, mpsc::UnboundedReceiver<GameEvent>) {
        let (broadcaster, events) = ChannelBroadcaster::channel();
        let settings = QuestSettings {
            debug_tools: true,
            ..Default::default()
        };
        let quest = QuestService::new(&demo_quest().unwrap(), settings, Arc::new(broadcaster)).unwrap();
        quest.register_hero(PlayerId::new("p1"), HeroClass::Dwarf).unwrap();
        (quest, events)
    }

    fn hero(user: &str) -> Caller {
        Caller {
            user_id: user.to_string(),
            role: ParticipantRole::Hero,
        }
    }

    fn game_master() -> Caller {
        Caller {
            user_id: "gm".to_string(),
            role: ParticipantRole::GameMaster,
        }
    }

    fn decode(json: &str) -> ClientMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_hero_cannot_act_for_someone_else() {
        let (quest, _events) = quest();
        let err = dispatch(
            &quest,
            &hero("p2"),
            decode(r#"{"type": "RollMovementDice", "payload": {"playerId": "p1"}}"#),
        )
        .unwrap_err();
        assert_eq!(err.code(), "permission_denied");
    }

    #[test]
    fn test_hero_flow_through_messages() {
        let (quest, _events) = quest();
        let p1 = hero("p1");
        dispatch(
            &quest,
            &p1,
            decode(r#"{"type": "RequestSelectStartingPosition", "payload": {"playerId": "p1", "tile": {"x": 1, "y": 8}}}"#),
        )
        .unwrap();
        dispatch(
            &quest,
            &game_master(),
            decode(r#"{"type": "DebugQueueDice", "payload": {"channel": "movement", "values": [2, 2]}}"#),
        )
        .unwrap();
        dispatch(&quest, &p1, decode(r#"{"type": "RollMovementDice", "payload": {"playerId": "p1"}}"#)).unwrap();
        dispatch(
            &quest,
            &p1,
            decode(r#"{"type": "RequestMove", "payload": {"entityId": "hero-p1", "dx": 1, "dy": 0}}"#),
        )
        .unwrap();
        assert_eq!(quest.turn_snapshot().movement_left, 3);

        dispatch(
            &quest,
            &p1,
            decode(
                r#"{"type": "MovementPath", "payload": {"playerId": "p1", "entityId": "hero-p1",
                    "action": "move_before", "path": [{"x": 3, "y": 8}, {"x": 3, "y": 7}]}}"#,
            ),
        )
        .unwrap();
        assert_eq!(quest.turn_snapshot().movement_left, 1);

        dispatch(
            &quest,
            &p1,
            decode(
                r#"{"type": "HeroAction", "payload": {"playerId": "p1", "entityId": "hero-p1",
                    "action": {"type": "search_treasure"}}}"#,
            ),
        )
        .unwrap();
        dispatch(&quest, &p1, decode(r#"{"type": "EndTurn", "payload": {}}"#)).unwrap();
        assert_eq!(quest.turn_snapshot().turn_type, TurnType::Gamemaster);
    }

    #[test]
    fn test_game_master_only_messages() {
        let (quest, _events) = quest();
        let err = dispatch(
            &quest,
            &hero("p1"),
            decode(r#"{"type": "PassGMTurn", "payload": {}}"#),
        )
        .unwrap_err();
        assert_eq!(err.code(), "permission_denied");

        let err = dispatch(
            &quest,
            &game_master(),
            decode(r#"{"type": "MonsterAction", "payload": {"monsterId": "goblin-1", "action": {"type": "move", "dx": 1, "dy": 0}}}"#),
        )
        .unwrap_err();
        assert_eq!(err, GameError::NotGameMasterTurn);
    }

    #[test]
    fn test_game_master_grants_capability() {
        let (quest, _events) = quest();
        let grant = r#"{"type": "DebugGrantCapability", "payload": {"playerId": "p1", "capability": "extra_action"}}"#;
        let err = dispatch(&quest, &hero("p1"), decode(grant)).unwrap_err();
        assert_eq!(err.code(), "permission_denied");

        dispatch(&quest, &game_master(), decode(grant)).unwrap();
        assert_eq!(quest.turn_snapshot().actions_left, 2);
    }

    #[test]
    fn test_spectators_cannot_end_turns() {
        let (quest, _events) = quest();
        let spectator = Caller {
            user_id: "watcher".to_string(),
            role: ParticipantRole::Spectator,
        };
        let err = dispatch(&quest, &spectator, decode(r#"{"type": "EndTurn", "payload": {}}"#)).unwrap_err();
        assert_eq!(err.code(), "permission_denied");
    }
}
