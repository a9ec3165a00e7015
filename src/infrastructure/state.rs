//! Shared application state

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, RwLock};

use crate::application::ports::outbound::QuestRepository;
use crate::application::services::QuestService;
use crate::domain::events::GameEvent;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::quest_loader::{demo_quest, FileQuestRepository};
use crate::infrastructure::session::{ChannelBroadcaster, SessionManager};

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    /// The running quest
    pub quest: Arc<QuestService>,
    pub quests: Arc<dyn QuestRepository>,
    /// Connected WebSocket clients
    pub sessions: Arc<RwLock<SessionManager>>,
}

impl AppState {
    /// Loads the configured quest. Also returns the event stream the
    /// fan-out worker must drain.
    pub async fn new(config: AppConfig) -> Result<(Self, mpsc::UnboundedReceiver<GameEvent>)> {
        let quests: Arc<dyn QuestRepository> = Arc::new(FileQuestRepository::new(&config.quest_dir));

        let definition = match &config.quest_name {
            Some(name) => quests
                .load_quest(name)
                .await
                .with_context(|| format!("Failed to load quest '{}'", name))?,
            None => {
                tracing::info!("No quest configured, using the demo quest");
                demo_quest().context("Built-in demo quest is invalid")?
            }
        };

        let (broadcaster, events) = ChannelBroadcaster::channel();
        let quest = QuestService::new(&definition, config.quest_settings(), Arc::new(broadcaster))
            .with_context(|| format!("Quest '{}' cannot be started", definition.name))?;

        Ok((
            Self {
                config,
                quest: Arc::new(quest),
                quests,
                sessions: Arc::new(RwLock::new(SessionManager::new())),
            },
            events,
        ))
    }
}
