//! File-backed document store
//!
//! Stand-in for the hosted document database:
//! `<root>/records/<user>.json` holds the per-user record and
//! `<root>/events.jsonl` the append-only event log.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use tg_core::ports::DocumentStorePort;
use tg_core::{OnboardingEvent, OnboardingState, UserId};

use super::{read_event_lines, write_atomic};
use crate::fs::user_file_name;

pub const EVENTS_FILE: &str = "events.jsonl";

pub struct FileDocumentStore {
    root: PathBuf,
    /// Serializes appends so concurrent writers never interleave lines.
    append_lock: Mutex<()>,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            append_lock: Mutex::new(()),
        }
    }

    fn record_file(&self, user_id: &UserId) -> PathBuf {
        self.root
            .join("records")
            .join(user_file_name(user_id, "json"))
    }

    fn events_file(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    /// Every event in the log, oldest first. Unparseable lines are skipped.
    pub async fn events(&self) -> anyhow::Result<Vec<OnboardingEvent>> {
        read_event_lines(&self.events_file()).await
    }
}

#[async_trait]
impl DocumentStorePort for FileDocumentStore {
    async fn get_record(&self, user_id: &UserId) -> anyhow::Result<Option<OnboardingState>> {
        let path = self.record_file(user_id);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        let state = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse onboarding record: {}", e))?;
        Ok(Some(state))
    }

    async fn put_record(&self, user_id: &UserId, state: &OnboardingState) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.record_file(user_id), json.as_bytes()).await
    }

    async fn append_event(&self, event: &OnboardingEvent) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.append_lock.lock().await;
        fs::create_dir_all(&self.root).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.events_file())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open event log: {}", e))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
