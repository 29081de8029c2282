//! External stem separation tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors launching or waiting on the separation tool.
///
/// A tool error is never fatal to a dispatch on its own: the fallback engine
/// degrades it to "try the next model".
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch separation tool: {0}")]
    Launch(#[from] std::io::Error),
}

/// Result of one separation tool invocation.
#[derive(Debug)]
pub struct ToolRun {
    pub success: bool,
    /// Directory the tool wrote its stems into, when the run produced one.
    pub output_dir: Option<PathBuf>,
}

/// One invocation of the external separation tool with a specific model.
#[async_trait]
pub trait SeparationTool: Send + Sync {
    /// Where output for `(model, uid)` lands, whether or not it exists yet.
    /// Used for the cache check that short-circuits separation entirely.
    fn output_dir(&self, model: &str, uid: &str) -> PathBuf;

    /// Run the tool. Implementations report failure via `ToolRun::success`
    /// for a clean-but-unsuccessful exit, and `ToolError` only when the tool
    /// could not be launched at all.
    async fn run(
        &self,
        audio_path: &Path,
        uid: &str,
        device: &str,
        model: &str,
    ) -> Result<ToolRun, ToolError>;
}

/// Demucs CLI wrapper. Writes stems under `<output_root>/<model>/<uid>/`.
pub struct DemucsTool {
    output_root: PathBuf,
}

impl DemucsTool {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }
}

#[async_trait]
impl SeparationTool for DemucsTool {
    fn output_dir(&self, model: &str, uid: &str) -> PathBuf {
        self.output_root.join(model).join(uid)
    }

    async fn run(
        &self,
        audio_path: &Path,
        uid: &str,
        device: &str,
        model: &str,
    ) -> Result<ToolRun, ToolError> {
        info!("Running demucs model {} on {}", model, audio_path.display());

        let output = Command::new("demucs")
            .arg("--mp3")
            .args(["-n", model])
            .args(["--shifts", "0"])
            .args(["-d", device])
            .args(["-o".as_ref(), self.output_root.as_os_str()])
            .arg(audio_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                "demucs model {} exited with {}: {}",
                model,
                output.status,
                stderr.trim()
            );
        }

        let dir = self.output_dir(model, uid);
        Ok(ToolRun {
            success: output.status.success(),
            output_dir: dir.exists().then_some(dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dir_keyed_by_model_and_uid() {
        let tool = DemucsTool::new("/work/separated");
        assert_eq!(
            tool.output_dir("htdemucs_6s", "Artist - abc123"),
            PathBuf::from("/work/separated/htdemucs_6s/Artist - abc123")
        );
    }
}
