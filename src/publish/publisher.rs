//! The publisher collaborator.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::planner::UploadJob;

/// Opaque result of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub video_id: String,
}

/// External video publisher. The core only plans uploads and hands them over;
/// what "upload" means (which API, which credentials) lives behind this trait.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait VideoPublisher: Send + Sync {
    async fn upload(&self, job: &UploadJob) -> Result<UploadReceipt>;

    /// Post a top-level comment on an uploaded video.
    async fn post_comment(&self, video_id: &str, text: &str) -> Result<()>;
}

/// Default publisher: logs full payloads instead of calling any API.
///
/// Keeps the whole pipeline runnable end-to-end without credentials; swap in
/// a real implementation per deployment.
#[derive(Debug, Default)]
pub struct DryRunPublisher;

#[async_trait]
impl VideoPublisher for DryRunPublisher {
    async fn upload(&self, job: &UploadJob) -> Result<UploadReceipt> {
        info!(
            "Would upload {} -> {} ({}, privacy={}, publish_at={:?}, credential={:?})",
            job.file_path.display(),
            job.channel_label,
            job.title,
            job.privacy,
            job.publish_at,
            job.credential,
        );
        Ok(UploadReceipt {
            video_id: "TEST_ID".to_string(),
        })
    }

    async fn post_comment(&self, video_id: &str, text: &str) -> Result<()> {
        info!("Would post comment on {}: {}", video_id, text);
        Ok(())
    }
}
