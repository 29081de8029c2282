//! Stem video rendering.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// One video render: track audio over the (optionally tinted) artwork.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub audio_path: PathBuf,
    /// Track artwork; `None` renders over a plain black background.
    pub thumbnail: Option<PathBuf>,
    pub out_path: PathBuf,
    /// Channel branding tint applied over the artwork.
    pub tint: Option<[u8; 3]>,
}

/// Renders a stem video from audio plus artwork.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf>;
}

/// Still-image renderer via ffmpeg: 1280x720 canvas at 1 fps, h264 video,
/// aac audio, ends with the audio.
#[derive(Debug, Default)]
pub struct FfmpegStillRenderer;

impl FfmpegStillRenderer {
    fn video_filter(tint: Option<[u8; 3]>) -> String {
        let mut filter =
            "scale=-2:720,pad=1280:720:(ow-iw)/2:(oh-ih)/2:color=black".to_string();
        if let Some([r, g, b]) = tint {
            filter.push_str(&format!(
                ",drawbox=c=0x{r:02x}{g:02x}{b:02x}@0.4:t=fill"
            ));
        }
        filter
    }
}

#[async_trait]
impl VideoRenderer for FfmpegStillRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf> {
        if let Some(parent) = request.out_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create video output dir")?;
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y");
        match &request.thumbnail {
            Some(thumb) => {
                cmd.args(["-loop", "1"]);
                cmd.args(["-i".as_ref(), thumb.as_os_str()]);
            }
            None => {
                cmd.args(["-f", "lavfi"]);
                cmd.args(["-i", "color=c=black:s=1280x720:r=1"]);
            }
        }
        cmd.args(["-i".as_ref(), request.audio_path.as_os_str()])
            .args(["-vf", &Self::video_filter(request.tint)])
            .args(["-r", "1"])
            .args(["-c:v", "libx264"])
            .args(["-tune", "stillimage"])
            .args(["-c:a", "aac"])
            .arg("-shortest")
            .arg(&request.out_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = cmd
            .output()
            .await
            .context("Failed to launch ffmpeg for video render")?;
        if !output.status.success() {
            bail!(
                "ffmpeg render failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(request.out_path.clone())
    }
}
