//! Stem file tagging.

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Writes friendly metadata tags onto a prepared stem file.
#[async_trait]
pub trait StemTagger: Send + Sync {
    async fn tag(&self, path: &Path, title: &str, comment: &str) -> Result<()>;
}

/// ffmpeg metadata rewrite: stream-copies the file with new `title` and
/// `comment` tags, then swaps it into place.
#[derive(Debug, Default)]
pub struct FfmpegTagger;

#[async_trait]
impl StemTagger for FfmpegTagger {
    async fn tag(&self, path: &Path, title: &str, comment: &str) -> Result<()> {
        let tagged = path.with_extension("tagged.mp3");
        let output = Command::new("ffmpeg")
            .arg("-y")
            .args(["-i".as_ref(), path.as_os_str()])
            .args(["-c", "copy"])
            .args(["-metadata", &format!("title={title}")])
            .args(["-metadata", &format!("comment={comment}")])
            .arg(&tagged)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to launch ffmpeg for tagging")?;
        if !output.status.success() {
            bail!(
                "ffmpeg tagging failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        tokio::fs::rename(&tagged, path)
            .await
            .context("Failed to replace stem with tagged copy")?;
        Ok(())
    }
}
