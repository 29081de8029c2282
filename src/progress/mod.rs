//! Shared progress store for dispatch sessions.
//!
//! A process-wide key-value store mapping session ids to progress records.
//! Written by every pipeline layer (scheduler, dispatcher, separation engine,
//! channel processors) and read concurrently by the HTTP transport for live
//! progress feeds. Owned explicitly and passed by `Arc` handle rather than
//! accessed as global state so tests can inject a fresh instance.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Auxiliary fields attached to a progress record.
///
/// The known fields are populated by the pipeline layers; anything else a
/// caller attaches survives round-trips through the flattened `extra` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A session's current progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub message: String,
    pub percent: f64,
    #[serde(default)]
    pub meta: ProgressMeta,
}

impl ProgressRecord {
    pub fn new(message: impl Into<String>, percent: f64) -> Self {
        Self {
            message: message.into(),
            percent,
            meta: ProgressMeta::default(),
        }
    }

    /// The record returned for sessions that have not reported anything yet.
    /// Absence of a record is a valid state, not an error.
    pub fn waiting() -> Self {
        Self::new("Waiting...", 0.0)
    }
}

/// Thread-safe in-memory progress store.
///
/// Operations are serialized per call so readers never observe a partially
/// written record. Records persist until explicitly deleted or the process
/// exits; there is no expiry.
#[derive(Default)]
pub struct ProgressStore {
    records: Mutex<HashMap<String, ProgressRecord>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored record for a session. Whole-record replace; callers
    /// that want to preserve `meta` merge it before calling.
    pub fn set(&self, session_id: &str, mut record: ProgressRecord) {
        record.percent = record.percent.clamp(0.0, 100.0);
        self.records
            .lock()
            .expect("progress store lock poisoned")
            .insert(session_id.to_string(), record);
    }

    /// Current record for a session, or the default "Waiting..." record if
    /// the session has never reported.
    pub fn get(&self, session_id: &str) -> ProgressRecord {
        self.records
            .lock()
            .expect("progress store lock poisoned")
            .get(session_id)
            .cloned()
            .unwrap_or_else(ProgressRecord::waiting)
    }

    /// Remove a session's record. A subsequent `get` returns the default.
    pub fn delete(&self, session_id: &str) {
        self.records
            .lock()
            .expect("progress store lock poisoned")
            .remove(session_id);
    }

    /// Read-modify-write helper. The closure runs under the store lock, so
    /// concurrent updates to the same session cannot interleave.
    pub fn update<F>(&self, session_id: &str, f: F)
    where
        F: FnOnce(&mut ProgressRecord),
    {
        let mut records = self.records.lock().expect("progress store lock poisoned");
        let record = records
            .entry(session_id.to_string())
            .or_insert_with(ProgressRecord::waiting);
        f(record);
        record.percent = record.percent.clamp(0.0, 100.0);
    }
}
