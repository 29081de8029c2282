//! Validation of separated stem output directories.
//!
//! A separation run only counts as usable when every expected stem file is
//! present, large enough, and contains real signal. Directories found on disk
//! are never trusted as cache without passing this check first.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::probe::AudioProbe;

/// Stem files the separation tool is expected to produce.
pub const EXPECTED_STEMS: [&str; 4] = ["vocals.mp3", "drums.mp3", "bass.mp3", "other.mp3"];

/// Why a stem file failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemProblem {
    Missing,
    TooSmall,
    SilentOrShort,
}

impl StemProblem {
    pub fn as_str(&self) -> &'static str {
        match self {
            StemProblem::Missing => "missing",
            StemProblem::TooSmall => "too_small",
            StemProblem::SilentOrShort => "silent_or_short",
        }
    }
}

/// Outcome of validating one stem directory. Produced fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    /// Stem filename -> reason, empty when `ok`.
    pub problems: BTreeMap<String, StemProblem>,
}

impl ValidationResult {
    pub fn from_problems(problems: BTreeMap<String, StemProblem>) -> Self {
        Self {
            ok: problems.is_empty(),
            problems,
        }
    }

    /// Failing stem filenames, for progress messages.
    pub fn failing_stems(&self) -> Vec<String> {
        self.problems.keys().cloned().collect()
    }
}

/// Tunable thresholds for stem validation.
#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    /// Files below this size are rejected without decoding.
    pub min_bytes: u64,
    /// Stems shorter than this are suspicious.
    pub min_duration_secs: f64,
    /// Very low RMS means near-silence.
    pub min_rms: f64,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            min_bytes: 80_000,
            min_duration_secs: 20.0,
            min_rms: 5.0,
        }
    }
}

/// Judges whether a directory of separated stems is usable.
pub struct StemValidator {
    settings: ValidatorSettings,
    probe: Arc<dyn AudioProbe>,
}

impl StemValidator {
    pub fn new(settings: ValidatorSettings, probe: Arc<dyn AudioProbe>) -> Self {
        Self { settings, probe }
    }

    /// Validate all expected stems under `base`.
    ///
    /// Never fails: decode errors (corrupt files) classify the stem as
    /// `SilentOrShort` rather than propagating.
    pub fn validate(&self, base: &Path) -> ValidationResult {
        let mut problems = BTreeMap::new();

        for name in EXPECTED_STEMS {
            let path = base.join(name);
            if !path.exists() {
                problems.insert(name.to_string(), StemProblem::Missing);
                continue;
            }

            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            if size < self.settings.min_bytes {
                problems.insert(name.to_string(), StemProblem::TooSmall);
                continue;
            }

            if !self.signal_ok(&path) {
                problems.insert(name.to_string(), StemProblem::SilentOrShort);
            }
        }

        ValidationResult::from_problems(problems)
    }

    fn signal_ok(&self, path: &Path) -> bool {
        match self.probe.probe(path) {
            Ok(stats) => {
                stats.duration_secs >= self.settings.min_duration_secs
                    && stats.rms >= self.settings.min_rms
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), "Stem probe failed: {e:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stems::probe::AudioStats;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Probe fed from a canned table; files not in the table error like a
    /// corrupt decode would.
    #[derive(Default)]
    struct TableProbe {
        stats: Mutex<HashMap<String, AudioStats>>,
    }

    impl TableProbe {
        fn with(self, name: &str, duration_secs: f64, rms: f64) -> Self {
            self.stats
                .lock()
                .unwrap()
                .insert(name.to_string(), AudioStats { duration_secs, rms });
            self
        }
    }

    impl AudioProbe for TableProbe {
        fn probe(&self, path: &Path) -> anyhow::Result<AudioStats> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            self.stats
                .lock()
                .unwrap()
                .get(&name)
                .copied()
                .ok_or_else(|| anyhow!("decode failed"))
        }
    }

    fn healthy_probe() -> Arc<TableProbe> {
        Arc::new(
            TableProbe::default()
                .with("vocals.mp3", 180.0, 900.0)
                .with("drums.mp3", 180.0, 1200.0)
                .with("bass.mp3", 180.0, 700.0)
                .with("other.mp3", 180.0, 800.0),
        )
    }

    fn write_stem(dir: &Path, name: &str, bytes: usize) {
        std::fs::write(dir.join(name), vec![0u8; bytes]).unwrap();
    }

    fn small_settings() -> ValidatorSettings {
        ValidatorSettings {
            min_bytes: 1_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_all_stems_healthy_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        for name in EXPECTED_STEMS {
            write_stem(dir.path(), name, 2_000);
        }
        let validator = StemValidator::new(small_settings(), healthy_probe());
        let result = validator.validate(dir.path());
        assert!(result.ok);
        assert!(result.problems.is_empty());
    }

    #[test]
    fn test_missing_stem_reported() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["vocals.mp3", "drums.mp3", "bass.mp3"] {
            write_stem(dir.path(), name, 2_000);
        }
        let validator = StemValidator::new(small_settings(), healthy_probe());
        let result = validator.validate(dir.path());
        assert!(!result.ok);
        assert_eq!(result.problems["other.mp3"], StemProblem::Missing);
        assert_eq!(result.problems.len(), 1);
    }

    #[test]
    fn test_tiny_file_reported_too_small() {
        let dir = tempfile::tempdir().unwrap();
        for name in EXPECTED_STEMS {
            write_stem(dir.path(), name, 2_000);
        }
        write_stem(dir.path(), "bass.mp3", 10);
        let validator = StemValidator::new(small_settings(), healthy_probe());
        let result = validator.validate(dir.path());
        assert_eq!(result.problems["bass.mp3"], StemProblem::TooSmall);
    }

    #[test]
    fn test_short_or_quiet_stem_reported() {
        let dir = tempfile::tempdir().unwrap();
        for name in EXPECTED_STEMS {
            write_stem(dir.path(), name, 2_000);
        }
        let probe = Arc::new(
            TableProbe::default()
                .with("vocals.mp3", 8.0, 900.0) // too short
                .with("drums.mp3", 180.0, 1.0) // near-silent
                .with("bass.mp3", 180.0, 700.0)
                .with("other.mp3", 180.0, 800.0),
        );
        let validator = StemValidator::new(small_settings(), probe);
        let result = validator.validate(dir.path());
        assert_eq!(result.problems["vocals.mp3"], StemProblem::SilentOrShort);
        assert_eq!(result.problems["drums.mp3"], StemProblem::SilentOrShort);
        assert!(!result.problems.contains_key("bass.mp3"));
    }

    #[test]
    fn test_decode_failure_classifies_not_panics() {
        let dir = tempfile::tempdir().unwrap();
        for name in EXPECTED_STEMS {
            write_stem(dir.path(), name, 2_000);
        }
        // Empty table: every probe errors.
        let validator = StemValidator::new(small_settings(), Arc::new(TableProbe::default()));
        let result = validator.validate(dir.path());
        assert!(!result.ok);
        for name in EXPECTED_STEMS {
            assert_eq!(result.problems[name], StemProblem::SilentOrShort);
        }
    }

    #[test]
    fn test_empty_directory_all_missing() {
        let dir = tempfile::tempdir().unwrap();
        let validator = StemValidator::new(small_settings(), healthy_probe());
        let result = validator.validate(dir.path());
        assert_eq!(result.problems.len(), 4);
        assert!(result
            .problems
            .values()
            .all(|p| *p == StemProblem::Missing));
    }
}
