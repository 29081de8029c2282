//! Media collaborators: audio acquisition and preparation, thumbnail
//! fetching, tagging, and video rendering.
//!
//! All of these sit behind traits so the pipeline can be exercised without
//! ffmpeg, yt-dlp, or the network; production implementations shell out or
//! use HTTP and degrade gracefully on failure.

mod fetcher;
mod preparer;
mod renderer;
mod tagger;
mod thumbnail;

pub use fetcher::{AudioFetcher, FetchedAudio, YtDlpFetcher};
pub use preparer::{AudioPreparer, FfmpegPreparer};
pub use renderer::{FfmpegStillRenderer, RenderRequest, VideoRenderer};
pub use tagger::{FfmpegTagger, StemTagger};
pub use thumbnail::{HttpThumbnailFetcher, ThumbnailFetcher};

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;

/// Trim an audio file in place to `secs` seconds via stream copy.
pub async fn trim_in_place(path: &Path, secs: u64) -> Result<()> {
    let trimmed = path.with_extension("trim.mp3");
    let output = Command::new("ffmpeg")
        .arg("-y")
        .args(["-i".as_ref(), path.as_os_str()])
        .args(["-t", &secs.to_string()])
        .args(["-c", "copy"])
        .arg(&trimmed)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to launch ffmpeg for trim")?;
    if !output.status.success() {
        bail!(
            "ffmpeg trim failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    tokio::fs::rename(&trimmed, path)
        .await
        .context("Failed to replace audio with trimmed copy")?;
    Ok(())
}
