//! Multi-model separation fallback engine.
//!
//! Tries candidate models in order until one produces output that passes
//! validation. The first passing model wins; later candidates are never
//! attempted. Every external invocation is wrapped so a broken or missing
//! tool degrades to "try the next model" instead of aborting the sequence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::progress::{ProgressRecord, ProgressStore};

use super::tool::SeparationTool;
use super::validator::{StemProblem, StemValidator, ValidationResult};

/// Outcome of a full fallback sequence.
#[derive(Debug)]
pub enum SeparationOutcome {
    Separated {
        model: String,
        output_dir: PathBuf,
        validation: ValidationResult,
    },
    /// Every candidate model was exhausted without a passing validation.
    Failed { validation: ValidationResult },
}

/// Aggregated result when no model produced usable stems. The sentinel key
/// keeps the problems map non-empty for the failure log.
fn all_models_failed() -> ValidationResult {
    let mut problems = BTreeMap::new();
    problems.insert("_".to_string(), StemProblem::Missing);
    ValidationResult::from_problems(problems)
}

/// Runs the separation tool under an ordered list of candidate models.
///
/// The order encodes a quality preference (higher stem count first); callers
/// configure it once at startup.
pub struct SeparationEngine {
    models: Vec<String>,
    tool: Arc<dyn SeparationTool>,
    validator: Arc<StemValidator>,
    progress: Arc<ProgressStore>,
}

impl SeparationEngine {
    pub fn new(
        models: Vec<String>,
        tool: Arc<dyn SeparationTool>,
        validator: Arc<StemValidator>,
        progress: Arc<ProgressStore>,
    ) -> Self {
        Self {
            models,
            tool,
            validator,
            progress,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Candidate output directory for `(model, uid)`; exposed for the cache
    /// check the dispatcher performs before invoking the engine.
    pub fn candidate_dir(&self, model: &str, uid: &str) -> PathBuf {
        self.tool.output_dir(model, uid)
    }

    /// Validate a directory off the async worker. Decoding four stems is
    /// CPU-bound work.
    pub async fn validate_dir(&self, dir: &Path) -> ValidationResult {
        let validator = self.validator.clone();
        let dir = dir.to_path_buf();
        match tokio::task::spawn_blocking(move || validator.validate(&dir)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Stem validation task failed: {}", e);
                all_models_failed()
            }
        }
    }

    /// Try each candidate model in order until one validates.
    pub async fn separate_with_fallback(
        &self,
        audio_path: &Path,
        uid: &str,
        device: &str,
        session_id: &str,
    ) -> SeparationOutcome {
        for (attempt, model) in self.models.iter().enumerate() {
            self.progress.set(
                session_id,
                ProgressRecord::new(
                    format!("Separating with {} (attempt {})...", model, attempt + 1),
                    12.0,
                ),
            );

            let run = match self.tool.run(audio_path, uid, device, model).await {
                Ok(run) => run,
                Err(e) => {
                    // Could not even launch the tool; try the next model.
                    warn!("Failed to invoke separation tool for {}: {}", model, e);
                    continue;
                }
            };

            let output_dir = match (run.success, run.output_dir) {
                (true, Some(dir)) => dir,
                (success, dir) => {
                    info!(
                        "Model {} unusable (success={}, output_dir={:?})",
                        model, success, dir
                    );
                    continue;
                }
            };

            let validation = self.validate_dir(&output_dir).await;
            if validation.ok {
                return SeparationOutcome::Separated {
                    model: model.clone(),
                    output_dir,
                    validation,
                };
            }

            info!(
                "Validation problems with {}: {:?}",
                model, validation.problems
            );
            self.progress.set(
                session_id,
                ProgressRecord::new(
                    format!(
                        "Fallback: {} produced weak stems ({}); trying next model...",
                        model,
                        validation.failing_stems().join(", ")
                    ),
                    20.0,
                ),
            );
        }

        SeparationOutcome::Failed {
            validation: all_models_failed(),
        }
    }
}
