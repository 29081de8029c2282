//! Local tracker for uploads awaiting a manual comment pin.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One video whose pinned comment still needs manual attention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinEntry {
    pub video_id: String,
    pub channel: String,
    pub title: String,
    pub comment: String,
    pub pinned: bool,
    pub created_at: String,
}

impl PinEntry {
    pub fn new(video_id: &str, channel: &str, title: &str, comment: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            channel: channel.to_string(),
            title: title.to_string(),
            comment: comment.to_string(),
            pinned: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only JSONL pin queue. Best-effort like the failure log: an
/// unwritable queue warns and moves on.
pub struct PinQueue {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PinQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn append(&self, entry: PinEntry) {
        if let Err(e) = self.try_append(&entry) {
            warn!("Failed to append pin queue entry: {}", e);
        }
    }

    fn try_append(&self, entry: &PinEntry) -> anyhow::Result<()> {
        let line = serde_json::to_string(entry)?;
        let _guard = self.write_lock.lock().expect("pin queue lock poisoned");
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{line}\n").as_bytes())?;
        Ok(())
    }

    /// All queued entries, oldest first.
    pub fn entries(&self) -> Vec<PinEntry> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let queue = PinQueue::new(dir.path().join("pin_queue.jsonl"));
        queue.append(PinEntry::new("vid-1", "Main", "Title", "Nice stem!"));
        queue.append(PinEntry::new("vid-2", "Drums", "Title 2", "More!"));

        let entries = queue.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].video_id, "vid-1");
        assert!(!entries[0].pinned);
        assert_eq!(entries[1].channel, "Drums");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let queue = PinQueue::new(dir.path().join("absent.jsonl"));
        assert!(queue.entries().is_empty());
    }
}
