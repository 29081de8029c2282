//! Track metadata lookup.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::dispatch::TrackRecord;

/// External track-info provider.
///
/// Lookup is best-effort: absence (unknown track, service down) is a value,
/// not an error, and the dispatcher decides what a missing record means.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait TrackInfoProvider: Send + Sync {
    async fn get(&self, track_id: &str) -> Option<TrackRecord>;
}

/// HTTP client for a metadata service exposing `GET /track/{id}`.
pub struct HttpTrackInfoProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTrackInfoProvider {
    pub fn new(base_url: String, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl TrackInfoProvider for HttpTrackInfoProvider {
    async fn get(&self, track_id: &str) -> Option<TrackRecord> {
        let url = format!(
            "{}/track/{}",
            self.base_url,
            urlencoding::encode(track_id)
        );
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Track info request failed for {}: {}", track_id, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(
                "Track info lookup for {} returned status {}",
                track_id,
                response.status()
            );
            return None;
        }
        match response.json::<TrackRecord>().await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to parse track info for {}: {}", track_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_returns_none() {
        // Reserved TEST-NET address; connect fails fast with the short timeout.
        let provider = HttpTrackInfoProvider::new("http://192.0.2.1:9".to_string(), 1);
        assert!(provider.get("abc").await.is_none());
    }
}
