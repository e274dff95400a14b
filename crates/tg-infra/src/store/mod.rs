mod document_store;
mod local_state;
mod memory;
mod outbox;

pub use document_store::FileDocumentStore;
pub use local_state::FileLocalStateRepository;
pub use memory::{InMemoryDocumentStore, InMemoryEventOutbox};
pub use outbox::FileEventOutbox;

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use tg_core::OnboardingEvent;

/// Every event in a JSONL file, oldest first. A missing file is empty and
/// unparseable lines are skipped.
pub(crate) async fn read_event_lines(path: &Path) -> anyhow::Result<Vec<OnboardingEvent>> {
    if !fs::try_exists(path).await? {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).await?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping malformed event line");
                None
            }
        })
        .collect())
}

/// Write `content` to a sibling temp file, sync it and rename it over `path`.
/// Every call gets its own temp file, so concurrent writers to one path never
/// share a half-written file; the last rename wins.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp = temp_sibling(path);
    let mut file = fs::File::create(&tmp)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", tmp.display(), e))?;
    file.write_all(content)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", tmp.display(), e))?;
    file.sync_all()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to sync {}: {}", tmp.display(), e))?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(anyhow::anyhow!("Failed to replace {}: {}", path.display(), e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_leave_one_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("u1.json");
        let bodies: Vec<String> = (0..16)
            .map(|i| format!("{{\"step\":{i},\"pad\":\"{}\"}}", "x".repeat(4096)))
            .collect();

        let writes = bodies.iter().map(|body| {
            let path = path.clone();
            let body = body.clone();
            tokio::spawn(async move { write_atomic(&path, body.as_bytes()).await })
        });
        for write in writes.collect::<Vec<_>>() {
            write.await.unwrap().unwrap();
        }

        let written = fs::read_to_string(&path).await.unwrap();
        assert!(bodies.contains(&written));
        let mut entries = fs::read_dir(temp_dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["u1.json".to_string()]);
    }
}
