//! Data models for track dispatching.

use serde::{Deserialize, Serialize};

/// Track metadata from the external track-info provider.
///
/// Immutable once fetched for a given track within one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Genre tags.
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub popularity: i64,
    /// Artwork URL.
    #[serde(default)]
    pub img: String,
    /// BPM.
    #[serde(default)]
    pub tempo: f64,
    /// Musical key name, or "Unknown".
    #[serde(default = "unknown_key")]
    pub key: String,
}

fn unknown_key() -> String {
    "Unknown".to_string()
}

impl TrackRecord {
    /// BPM as used in titles and tags.
    pub fn bpm(&self) -> i64 {
        self.tempo.round() as i64
    }
}

/// Why a unit of work failed. One entry per failure in the append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    TrackInfo,
    DownloadAudio,
    SeparationFailed,
    ChannelProcessing,
    UnknownChannel,
    DispatchUncaught,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::TrackInfo => "track_info",
            FailureReason::DownloadAudio => "download_audio",
            FailureReason::SeparationFailed => "separation_failed",
            FailureReason::ChannelProcessing => "channel_processing",
            FailureReason::UnknownChannel => "unknown_channel",
            FailureReason::DispatchUncaught => "dispatch_uncaught",
        }
    }
}

/// Fatal-to-track failure. Terminates that track's dispatch; siblings and the
/// batch continue. Converted to a failure-log entry one level up.
#[derive(Debug, Clone, thiserror::Error)]
#[error("dispatch failed ({})", .reason.as_str())]
pub struct DispatchError {
    pub reason: FailureReason,
    pub details: serde_json::Value,
}

impl DispatchError {
    pub fn new(reason: FailureReason, details: serde_json::Value) -> Self {
        Self { reason, details }
    }
}

/// Publishing knobs forwarded to the upload planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// RFC3339 start time for scheduled publishing; absent means publish
    /// immediately with the configured privacy status.
    pub schedule_start: Option<String>,
    /// Minutes between consecutive artists' publish slots.
    pub schedule_interval_minutes: i64,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: String,
    pub made_for_kids: bool,
    /// Post a templated top-level comment after each upload.
    pub auto_comment: bool,
    /// "acapella" or "drumz" playlist auto-add selection.
    pub playlist_selection: Option<String>,
    /// Position of this track's artist in the batch-wide schedule.
    pub artist_index: i64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            schedule_start: None,
            schedule_interval_minutes: 0,
            description: String::new(),
            tags: Vec::new(),
            privacy: "private".to_string(),
            made_for_kids: false,
            auto_comment: true,
            playlist_selection: None,
            artist_index: 0,
        }
    }
}

/// Per-dispatch options shared by every channel processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    pub genre: String,
    /// Separation device, e.g. "cpu" or "cuda:0".
    pub device: String,
    /// When set, stems are trimmed to this many seconds before rendering.
    pub trim_length_secs: Option<u64>,
    /// Hand rendered videos to the publisher at the end of each channel.
    pub publish: bool,
    pub upload: UploadOptions,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            genre: "Other".to_string(),
            device: "cpu".to_string(),
            trim_length_secs: None,
            publish: false,
            upload: UploadOptions::default(),
        }
    }
}

/// Track-specific overrides merged over the batch-wide options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackOverrides {
    pub genre: Option<String>,
    pub trim_length_secs: Option<u64>,
    pub publish: Option<bool>,
    pub artist_index: Option<i64>,
}

impl TrackOverrides {
    /// Apply these overrides on top of the shared options.
    pub fn merged_into(&self, shared: &DispatchOptions) -> DispatchOptions {
        let mut options = shared.clone();
        if let Some(genre) = &self.genre {
            options.genre = genre.clone();
        }
        if let Some(trim) = self.trim_length_secs {
            options.trim_length_secs = Some(trim);
        }
        if let Some(publish) = self.publish {
            options.publish = publish;
        }
        if let Some(index) = self.artist_index {
            options.upload.artist_index = index;
        }
        options
    }
}

/// What one track's dispatch accomplished. Observable through the scheduler
/// for tests; production callers watch the progress store instead.
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub uid: String,
    /// Model whose output was used, or `None` when served from cache.
    pub model_used: Option<String>,
    pub cached: bool,
    pub channels_ok: Vec<String>,
    pub channels_failed: Vec<String>,
}
