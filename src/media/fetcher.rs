//! Source audio acquisition.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::channels::sanitize_name;

/// A fetched source audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAudio {
    /// Stable id used to key the stem cache, e.g. `"Uploader - videoid"`.
    pub uid: String,
    pub path: PathBuf,
}

/// External audio fetcher. Returns `None` on any failure; the dispatcher
/// treats a missing result as fatal to the track.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, title: &str, artist: &str) -> Option<FetchedAudio>;
}

/// yt-dlp backed fetcher: searches for a topic upload of the track and
/// extracts a 192k mp3 into the audio directory.
pub struct YtDlpFetcher {
    audio_dir: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            audio_dir: audio_dir.into(),
        }
    }

    /// Resolve the search to `(uploader, video_id)` without downloading.
    async fn resolve(&self, search_term: &str) -> Option<(String, String)> {
        let output = Command::new("yt-dlp")
            .args(["--print", "%(uploader)s|%(id)s"])
            .arg("--skip-download")
            .arg(format!("ytsearch1:{search_term}"))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            warn!(
                "yt-dlp search failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().next()?.trim();
        let (uploader, video_id) = line.split_once('|')?;
        Some((uploader.to_string(), video_id.to_string()))
    }

    async fn download(&self, video_id: &str, dest: &Path) -> bool {
        let template = dest.with_extension("%(ext)s");
        let output = Command::new("yt-dlp")
            .args(["-f", "bestaudio/best"])
            .args(["-x", "--audio-format", "mp3"])
            .args(["--audio-quality", "192K"])
            .args(["-o".as_ref(), template.as_os_str()])
            .arg(video_id)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                warn!(
                    "yt-dlp download failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(e) => {
                warn!("Failed to launch yt-dlp: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, title: &str, artist: &str) -> Option<FetchedAudio> {
        let search_term = format!("{title} - {artist} topic");
        let (uploader, video_id) = self.resolve(&search_term).await?;
        let uid = sanitize_name(&format!("{uploader} - {video_id}"));

        if tokio::fs::create_dir_all(&self.audio_dir).await.is_err() {
            warn!("Could not create audio dir {}", self.audio_dir.display());
            return None;
        }
        let path = self.audio_dir.join(format!("{uid}.mp3"));
        if path.exists() {
            info!("Reusing downloaded audio at {}", path.display());
            return Some(FetchedAudio { uid, path });
        }

        if !self.download(&video_id, &path).await || !path.exists() {
            return None;
        }
        Some(FetchedAudio { uid, path })
    }
}
