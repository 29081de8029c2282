//! Track artwork fetching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

/// Fetches track artwork into a per-track folder. Best-effort: a missing
/// thumbnail degrades the video to a plain background, it never fails a
/// channel.
#[async_trait]
pub trait ThumbnailFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Option<PathBuf>;
}

/// Downloads artwork over HTTP, caching as `cover.png` per track folder.
pub struct HttpThumbnailFetcher {
    client: reqwest::Client,
}

impl HttpThumbnailFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpThumbnailFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThumbnailFetcher for HttpThumbnailFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Option<PathBuf> {
        if url.is_empty() {
            return None;
        }
        let dest = dest_dir.join("cover.png");
        if dest.exists() {
            return Some(dest);
        }
        if let Err(e) = tokio::fs::create_dir_all(dest_dir).await {
            warn!("Could not create thumbnail dir: {}", e);
            return None;
        }

        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Thumbnail fetch returned status {}", response.status());
                return None;
            }
            Err(e) => {
                warn!("Thumbnail fetch failed: {}", e);
                return None;
            }
        };
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Thumbnail body read failed: {}", e);
                return None;
            }
        };
        if tokio::fs::write(&dest, &bytes).await.is_err() {
            return None;
        }
        Some(dest)
    }
}
