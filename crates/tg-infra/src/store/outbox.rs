//! File-backed event outbox
//!
//! Undelivered events as JSONL in `<state_dir>/outbox.jsonl`. Pushes append a
//! line; removals rewrite the file through [`write_atomic`].

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use tg_core::ports::EventOutboxPort;
use tg_core::{EventId, OnboardingEvent};

use super::{read_event_lines, write_atomic};

pub const OUTBOX_FILE: &str = "outbox.jsonl";

pub struct FileEventOutbox {
    path: PathBuf,
    /// Serializes appends with the read-filter-rewrite of `remove`.
    lock: Mutex<()>,
}

impl FileEventOutbox {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: state_dir.into().join(OUTBOX_FILE),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl EventOutboxPort for FileEventOutbox {
    async fn push(&self, event: &OnboardingEvent) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open event outbox: {}", e))?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn pending(&self) -> anyhow::Result<Vec<OnboardingEvent>> {
        let _guard = self.lock.lock().await;
        read_event_lines(&self.path).await
    }

    async fn remove(&self, id: &EventId) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let events = read_event_lines(&self.path).await?;
        if !events.iter().any(|event| &event.id == id) {
            return Ok(());
        }
        let mut content = String::new();
        let mut remaining = 0usize;
        for event in events.iter().filter(|event| &event.id != id) {
            content.push_str(&serde_json::to_string(event)?);
            content.push('\n');
            remaining += 1;
        }
        write_atomic(&self.path, content.as_bytes()).await?;
        debug!(event_id = %id, remaining, "event removed from outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use tg_core::onboarding::EventDraft;
    use tg_core::OnboardingEventKind;

    fn event(kind: OnboardingEventKind) -> OnboardingEvent {
        OnboardingEvent::from_draft(EventDraft::new(kind), "u1".into(), Utc::now())
    }

    #[tokio::test]
    async fn empty_outbox_has_nothing_pending() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = FileEventOutbox::new(temp_dir.path());

        assert!(outbox.pending().await.unwrap().is_empty());
        outbox.remove(&EventId::new()).await.unwrap();
        assert!(!temp_dir.path().join(OUTBOX_FILE).exists());
    }

    #[tokio::test]
    async fn pending_survives_reopening_until_removed() {
        let temp_dir = TempDir::new().unwrap();
        let started = event(OnboardingEventKind::TourStarted);
        let viewed = event(OnboardingEventKind::StepViewed);
        {
            let outbox = FileEventOutbox::new(temp_dir.path().join("state"));
            outbox.push(&started).await.unwrap();
            outbox.push(&viewed).await.unwrap();
        }

        let outbox = FileEventOutbox::new(temp_dir.path().join("state"));
        assert_eq!(outbox.pending().await.unwrap(), vec![started.clone(), viewed.clone()]);

        outbox.remove(&started.id).await.unwrap();
        assert_eq!(outbox.pending().await.unwrap(), vec![viewed.clone()]);
        outbox.remove(&viewed.id).await.unwrap();
        assert!(outbox.pending().await.unwrap().is_empty());
    }
}
