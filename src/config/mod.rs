mod file_config;

pub use file_config::{FileConfig, SchedulerConfig, SeparationConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::channels::{default_channels, ChannelSpec};
use crate::stems::ValidatorSettings;

/// CLI arguments that can be used for config resolution.
/// Mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub work_dir: Option<PathBuf>,
    pub port: u16,
    pub metadata_url: Option<String>,
    pub metadata_timeout_sec: u64,
    pub device: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            port: 3004,
            metadata_url: None,
            metadata_timeout_sec: 300,
            device: "cpu".to_string(),
        }
    }
}

/// Fallback-ordered separation settings.
#[derive(Debug, Clone)]
pub struct SeparationSettings {
    /// Candidate models; first-listed is tried first and order encodes the
    /// quality preference.
    pub models: Vec<String>,
    pub validator: ValidatorSettings,
    /// Prepared audio below this size falls back to the original file.
    pub min_prepared_bytes: u64,
}

impl Default for SeparationSettings {
    fn default() -> Self {
        Self {
            models: vec![
                "htdemucs_6s".to_string(),
                "htdemucs_ft".to_string(),
                "htdemucs".to_string(),
            ],
            validator: ValidatorSettings::default(),
            min_prepared_bytes: 150_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Concurrency bound applied when a dispatch request does not set one.
    pub default_max_concurrent: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_max_concurrent: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub work_dir: PathBuf,
    pub port: u16,
    pub metadata_url: Option<String>,
    pub metadata_timeout_sec: u64,
    /// Default separation device, e.g. "cpu" or "cuda:0".
    pub device: String,

    // Feature configs (with defaults)
    pub separation: SeparationSettings,
    pub scheduler: SchedulerSettings,
    pub channels: Vec<ChannelSpec>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let work_dir = file
            .work_dir
            .map(PathBuf::from)
            .or_else(|| cli.work_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("work_dir must be specified via --work-dir or in config file")
            })?;

        let port = file.port.unwrap_or(cli.port);
        let metadata_url = file.metadata_url.or_else(|| cli.metadata_url.clone());
        let metadata_timeout_sec = file.metadata_timeout_sec.unwrap_or(cli.metadata_timeout_sec);
        let device = file.device.unwrap_or_else(|| cli.device.clone());

        let sep_file = file.separation.unwrap_or_default();
        let sep_defaults = SeparationSettings::default();
        let models = sep_file.models.unwrap_or(sep_defaults.models);
        if models.is_empty() {
            bail!("separation.models must not be empty");
        }
        let separation = SeparationSettings {
            models,
            validator: ValidatorSettings {
                min_bytes: sep_file
                    .min_stem_bytes
                    .unwrap_or(sep_defaults.validator.min_bytes),
                min_duration_secs: sep_file
                    .min_stem_duration_secs
                    .unwrap_or(sep_defaults.validator.min_duration_secs),
                min_rms: sep_file
                    .min_stem_rms
                    .unwrap_or(sep_defaults.validator.min_rms),
            },
            min_prepared_bytes: sep_file
                .min_prepared_bytes
                .unwrap_or(sep_defaults.min_prepared_bytes),
        };

        let sched_file = file.scheduler.unwrap_or_default();
        let scheduler = SchedulerSettings {
            default_max_concurrent: sched_file
                .default_max_concurrent
                .unwrap_or_else(|| SchedulerSettings::default().default_max_concurrent)
                .max(1),
        };

        let channels = match file.channels {
            Some(channels) if !channels.is_empty() => channels,
            _ => default_channels(),
        };

        Ok(Self {
            work_dir,
            port,
            metadata_url,
            metadata_timeout_sec,
            device,
            separation,
            scheduler,
            channels,
        })
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.work_dir.join("MP3")
    }

    pub fn prep_dir(&self) -> PathBuf {
        self.work_dir.join("prep")
    }

    pub fn stems_root(&self) -> PathBuf {
        self.work_dir.join("separated")
    }

    pub fn fail_log_dir(&self) -> PathBuf {
        self.work_dir.join("fail_logs")
    }

    pub fn thumbs_dir(&self) -> PathBuf {
        self.work_dir.join("Thumbnails")
    }

    pub fn video_dir(&self) -> PathBuf {
        self.work_dir.join("MP4")
    }

    pub fn library_dir(&self) -> PathBuf {
        self.work_dir.join("Library")
    }

    pub fn pin_queue_path(&self) -> PathBuf {
        self.work_dir.join("pin_queue.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_work_dir() -> CliConfig {
        CliConfig {
            work_dir: Some(PathBuf::from("/data")),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only_uses_defaults() {
        let config = AppConfig::resolve(&cli_with_work_dir(), None).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("/data"));
        assert_eq!(config.port, 3004);
        assert_eq!(config.device, "cpu");
        assert_eq!(
            config.separation.models,
            vec!["htdemucs_6s", "htdemucs_ft", "htdemucs"]
        );
        assert_eq!(config.scheduler.default_max_concurrent, 2);
        assert_eq!(config.channels.len(), 5);
    }

    #[test]
    fn test_resolve_missing_work_dir_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("work_dir must be specified"));
    }

    #[test]
    fn test_toml_overrides_cli() {
        let toml = r#"
            work_dir = "/other"
            port = 4000
            device = "cuda:0"

            [separation]
            models = ["htdemucs"]
            min_stem_bytes = 10000

            [scheduler]
            default_max_concurrent = 4
        "#;
        let file: FileConfig = toml::from_str(toml).unwrap();
        let config = AppConfig::resolve(&cli_with_work_dir(), Some(file)).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("/other"));
        assert_eq!(config.port, 4000);
        assert_eq!(config.device, "cuda:0");
        assert_eq!(config.separation.models, vec!["htdemucs"]);
        assert_eq!(config.separation.validator.min_bytes, 10_000);
        // Unset thresholds keep their defaults.
        assert_eq!(config.separation.validator.min_duration_secs, 20.0);
        assert_eq!(config.scheduler.default_max_concurrent, 4);
    }

    #[test]
    fn test_empty_model_list_rejected() {
        let toml = r#"
            [separation]
            models = []
        "#;
        let file: FileConfig = toml::from_str(toml).unwrap();
        let result = AppConfig::resolve(&cli_with_work_dir(), Some(file));
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_channels_replace_defaults() {
        let toml = r#"
            [[channel]]
            key = "loops"
            label = "Loops"
            stems = ["bass", "melody"]
            tint = [10, 20, 30]
        "#;
        let file: FileConfig = toml::from_str(toml).unwrap();
        let config = AppConfig::resolve(&cli_with_work_dir(), Some(file)).unwrap();
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].key, "loops");
        assert_eq!(config.channels[0].tint, Some([10, 20, 30]));
    }

    #[test]
    fn test_path_helpers_under_work_dir() {
        let config = AppConfig::resolve(&cli_with_work_dir(), None).unwrap();
        assert_eq!(config.audio_dir(), PathBuf::from("/data/MP3"));
        assert_eq!(config.stems_root(), PathBuf::from("/data/separated"));
        assert_eq!(config.fail_log_dir(), PathBuf::from("/data/fail_logs"));
        assert_eq!(config.pin_queue_path(), PathBuf::from("/data/pin_queue.jsonl"));
    }
}
