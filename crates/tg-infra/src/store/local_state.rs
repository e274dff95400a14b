//! File-based local onboarding cache
//!
//! One pretty-printed JSON file per user under the state directory. Writes go
//! through a temp file and a rename so a crash never leaves a torn record.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use tg_core::ports::LocalStatePort;
use tg_core::{OnboardingState, UserId};

use super::write_atomic;
use crate::fs::user_file_name;

pub struct FileLocalStateRepository {
    state_dir: PathBuf,
}

impl FileLocalStateRepository {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    fn state_file(&self, user_id: &UserId) -> PathBuf {
        self.state_dir.join(user_file_name(user_id, "json"))
    }
}

#[async_trait]
impl LocalStatePort for FileLocalStateRepository {
    async fn load(&self, user_id: &UserId) -> anyhow::Result<Option<OnboardingState>> {
        let path = self.state_file(user_id);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let state: OnboardingState = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse onboarding state: {}", e))?;
        Ok(Some(state))
    }

    async fn store(&self, user_id: &UserId, state: &OnboardingState) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| anyhow::anyhow!("Failed to serialize onboarding state: {}", e))?;
        let path = self.state_file(user_id);
        write_atomic(&path, json.as_bytes()).await?;
        debug!(%user_id, path = %path.display(), "local onboarding state written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn state() -> OnboardingState {
        let mut state = OnboardingState {
            has_seen_welcome: true,
            selected_path: Some("creator".into()),
            current_tour_id: Some("prompt-creation".into()),
            current_step: Some(2),
            updated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            ..Default::default()
        };
        state.completed_tours.insert("first-time-user".into());
        state.dismissed_suggestions.insert("try-templates".into());
        state
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileLocalStateRepository::new(temp_dir.path());

        assert!(repo.load(&"u1".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileLocalStateRepository::new(temp_dir.path().join("nested"));

        repo.store(&"u1".into(), &state()).await.unwrap();

        assert_eq!(repo.load(&"u1".into()).await.unwrap(), Some(state()));
        assert!(repo.load(&"u2".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_replaces_previous_record() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileLocalStateRepository::new(temp_dir.path());

        repo.store(&"u1".into(), &state()).await.unwrap();
        let mut newer = state();
        newer.current_step = Some(3);
        repo.store(&"u1".into(), &newer).await.unwrap();

        assert_eq!(repo.load(&"u1".into()).await.unwrap(), Some(newer));
        let leftovers = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn empty_file_loads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("u1.json"), "").await.unwrap();
        let repo = FileLocalStateRepository::new(temp_dir.path());

        assert!(repo.load(&"u1".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_json_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("u1.json"), "{invalid json")
            .await
            .unwrap();
        let repo = FileLocalStateRepository::new(temp_dir.path());

        let err = repo.load(&"u1".into()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[tokio::test]
    async fn record_written_by_older_build_gets_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("u1.json"),
            r#"{"hasSeenWelcome": true, "currentTourId": "first-time-user", "currentStep": 1}"#,
        )
        .await
        .unwrap();
        let repo = FileLocalStateRepository::new(temp_dir.path());

        let state = repo.load(&"u1".into()).await.unwrap().unwrap();
        assert!(state.has_seen_welcome);
        assert_eq!(state.current_step, Some(1));
        assert!(state.completed_tours.is_empty());
    }
}
