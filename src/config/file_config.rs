use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::channels::ChannelSpec;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub work_dir: Option<String>,
    pub port: Option<u16>,
    pub metadata_url: Option<String>,
    pub metadata_timeout_sec: Option<u64>,
    pub device: Option<String>,

    // Feature configs
    pub separation: Option<SeparationConfig>,
    pub scheduler: Option<SchedulerConfig>,

    /// `[[channel]]` entries replacing the built-in channel lineup.
    #[serde(rename = "channel")]
    pub channels: Option<Vec<ChannelSpec>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SeparationConfig {
    /// Candidate models in fallback order.
    pub models: Option<Vec<String>>,
    pub min_stem_bytes: Option<u64>,
    pub min_stem_duration_secs: Option<f64>,
    pub min_stem_rms: Option<f64>,
    pub min_prepared_bytes: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub default_max_concurrent: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
