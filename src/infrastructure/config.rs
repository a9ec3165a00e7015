//! Application configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::application::services::QuestSettings;
use crate::domain::services::TurnOrderMode;

/// Application configuration loaded from `DUNGEON_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// WebSocket/HTTP server port
    pub server_port: u16,
    /// Directory holding `<name>.json` quest files
    pub quest_dir: PathBuf,
    /// Quest to run; the built-in demo quest when unset
    #[serde(default)]
    pub quest_name: Option<String>,
    pub turn_order: TurnOrderMode,
    /// Fixed seed for reproducible dice
    #[serde(default)]
    pub dice_seed: Option<u64>,
    /// Enables dice overrides and forced door closing
    pub debug_tools: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(Environment::with_prefix("DUNGEON"))
    }

    fn load(environment: Environment) -> Result<Self> {
        Config::builder()
            .set_default("server_port", 3000)?
            .set_default("quest_dir", "quests")?
            .set_default("turn_order", "round_robin")?
            .set_default("debug_tools", false)?
            .add_source(environment.try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid DUNGEON_* configuration")
    }

    pub fn quest_settings(&self) -> QuestSettings {
        QuestSettings {
            turn_order: self.turn_order,
            dice_seed: self.dice_seed,
            debug_tools: self.debug_tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::load(Environment::with_prefix("DUNGEON").source(Some(source)))
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.quest_dir, PathBuf::from("quests"));
        assert_eq!(config.quest_name, None);
        assert_eq!(config.turn_order, TurnOrderMode::RoundRobin);
        assert!(!config.debug_tools);
    }

    #[test]
    fn test_environment_overrides() {
        let config = load(&[
            ("DUNGEON_SERVER_PORT", "4000"),
            ("DUNGEON_QUEST_NAME", "the-maze"),
            ("DUNGEON_TURN_ORDER", "election"),
            ("DUNGEON_DICE_SEED", "42"),
            ("DUNGEON_DEBUG_TOOLS", "true"),
        ])
        .unwrap();
        assert_eq!(config.server_port, 4000);
        assert_eq!(config.quest_name.as_deref(), Some("the-maze"));
        assert_eq!(config.turn_order, TurnOrderMode::Election);

        let settings = config.quest_settings();
        assert_eq!(settings.dice_seed, Some(42));
        assert!(settings.debug_tools);
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!(load(&[("DUNGEON_SERVER_PORT", "not-a-port")]).is_err());
    }
}
