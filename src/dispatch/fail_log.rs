//! Append-only failure log.
//!
//! One JSONL file per batch under the configured directory. Every failure the
//! pipeline absorbs (channel, track, or batch level) lands here as a
//! self-contained entry; this log and the progress store are the only
//! failure signals observable from outside.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::models::FailureReason;

/// One logged failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEntry {
    pub ts: i64,
    pub track_id: String,
    pub reason: FailureReason,
    #[serde(default)]
    pub details: Value,
}

/// Append-only JSONL failure sink keyed by batch id.
pub struct FailureLog {
    dir: PathBuf,
    // Serializes appends so concurrent entries never interleave.
    write_lock: Mutex<()>,
}

impl FailureLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, batch_id: &str) -> PathBuf {
        self.dir.join(format!("{batch_id}.jsonl"))
    }

    /// Append one entry. Never returns an error: a sink that cannot be
    /// written to must not take the pipeline down with it.
    pub fn log(&self, batch_id: &str, track_id: &str, reason: FailureReason, details: Value) {
        let entry = FailureEntry {
            ts: chrono::Utc::now().timestamp(),
            track_id: track_id.to_string(),
            reason,
            details,
        };
        if let Err(e) = self.append(batch_id, &entry) {
            warn!(
                "Failed to append failure log entry for batch {} ({}): {}",
                batch_id,
                reason.as_str(),
                e
            );
        }
    }

    fn append(&self, batch_id: &str, entry: &FailureEntry) -> anyhow::Result<()> {
        let line = serde_json::to_string(entry)?;
        let _guard = self.write_lock.lock().expect("failure log lock poisoned");
        std::fs::create_dir_all(&self.dir)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(batch_id))?;
        // Single write call per entry.
        file.write_all(format!("{line}\n").as_bytes())?;
        Ok(())
    }

    /// Read back all entries for a batch. Unparseable lines are skipped.
    pub fn entries(&self, batch_id: &str) -> Vec<FailureEntry> {
        let path = self.path_for(batch_id);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}
