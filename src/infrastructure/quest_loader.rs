//! Quest files on disk
//!
//! Each quest is a JSON file `<name>.json` inside the configured quest
//! directory. A demo quest is compiled into the binary for runs without one.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::application::dto::QuestDefinition;
use crate::application::ports::outbound::{QuestLoadError, QuestRepository};

const DEMO_QUEST: &str = include_str!("../../quests/demo.json");

/// The quest used when no quest name is configured
pub fn demo_quest() -> Result<QuestDefinition, QuestLoadError> {
    serde_json::from_str(DEMO_QUEST).map_err(|source| QuestLoadError::Parse {
        name: "demo".to_string(),
        source,
    })
}

/// Loads quests from a directory of JSON files
#[derive(Debug, Clone)]
pub struct FileQuestRepository {
    dir: PathBuf,
}

impl FileQuestRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, QuestLoadError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(QuestLoadError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }
}

#[async_trait]
impl QuestRepository for FileQuestRepository {
    async fn load_quest(&self, name: &str) -> Result<QuestDefinition, QuestLoadError> {
        let path = self.path_for(name)?;
        tracing::debug!("Loading quest from {}", path.display());

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(QuestLoadError::NotFound(name.to_string()));
            }
            Err(source) => {
                return Err(QuestLoadError::Io {
                    name: name.to_string(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| QuestLoadError::Parse {
            name: name.to_string(),
            source,
        })
    }

    async fn list_quests(&self) -> Result<Vec<String>, QuestLoadError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(QuestLoadError::Io {
                    name: self.dir.display().to_string(),
                    source,
                });
            }
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(QuestLoadError::Io {
                        name: self.dir.display().to_string(),
                        source,
                    });
                }
            };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{DoorId, Tile};

    #[test]
    fn test_demo_quest_builds() {
        let quest = demo_quest().unwrap();
        let board = quest.build_board().unwrap();
        assert_eq!(board.width(), 14);
        assert!(board.door(&DoorId::new("door-west")).is_some());
        assert!(board.starting_tiles().contains(&Tile::new(1, 8)));
    }

    #[tokio::test]
    async fn test_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("crypt.json"), DEMO_QUEST).await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "ignored").await.unwrap();

        let repo = FileQuestRepository::new(dir.path());
        let quest = repo.load_quest("crypt").await.unwrap();
        assert_eq!(quest.name, "demo");
        assert_eq!(repo.list_quests().await.unwrap(), vec!["crypt".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileQuestRepository::new(dir.path());

        let err = repo.load_quest("nowhere").await.unwrap_err();
        assert!(matches!(err, QuestLoadError::NotFound(_)));

        let err = repo.load_quest("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, QuestLoadError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_malformed_quest() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("broken.json"), "{ not json").await.unwrap();

        let repo = FileQuestRepository::new(dir.path());
        let err = repo.load_quest("broken").await.unwrap_err();
        assert!(matches!(err, QuestLoadError::Parse { .. }));
    }
}
