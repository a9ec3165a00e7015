//! Quest repository port - Where quest definitions come from

use async_trait::async_trait;

use crate::application::dto::QuestDefinition;

#[derive(Debug, thiserror::Error)]
pub enum QuestLoadError {
    #[error("Quest not found: {0}")]
    NotFound(String),

    #[error("Invalid quest name: {0}")]
    InvalidName(String),

    #[error("Failed to read quest {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse quest {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Repository port for quest content
#[async_trait]
pub trait QuestRepository: Send + Sync {
    /// Load a quest by name
    async fn load_quest(&self, name: &str) -> Result<QuestDefinition, QuestLoadError>;

    /// Names of the quests that can be loaded
    async fn list_quests(&self) -> Result<Vec<String>, QuestLoadError>;
}
