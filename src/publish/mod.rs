//! Publishing: upload planning, the publisher collaborator, and the pin
//! queue for manual comment pinning.

mod pin_queue;
mod planner;
mod publisher;

pub use pin_queue::{PinEntry, PinQueue};
pub use planner::{comment_for, plan_uploads, UploadJob};
pub use publisher::{DryRunPublisher, UploadReceipt, VideoPublisher};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::channels::ChannelSpec;
use crate::dispatch::{TrackRecord, UploadOptions};

/// Hands one channel's accumulated videos to the publisher: plan, upload,
/// comment, queue for pinning.
pub struct PublishPipeline {
    publisher: Arc<dyn VideoPublisher>,
    pin_queue: PinQueue,
}

impl PublishPipeline {
    pub fn new(publisher: Arc<dyn VideoPublisher>, pin_queue: PinQueue) -> Self {
        Self {
            publisher,
            pin_queue,
        }
    }

    /// Publish every planned upload for one channel.
    ///
    /// Individual upload failures are logged and skipped so one bad video
    /// does not block the rest of the channel's plan.
    pub async fn publish_channel(
        &self,
        spec: &ChannelSpec,
        track: &TrackRecord,
        video_paths: &BTreeMap<String, PathBuf>,
        options: &UploadOptions,
    ) -> Result<()> {
        let jobs = plan_uploads(spec, track, video_paths, options);
        if jobs.is_empty() {
            info!("No uploads planned for channel {}", spec.key);
            return Ok(());
        }
        info!("{} uploads queued for channel {}", jobs.len(), spec.key);

        for job in &jobs {
            let receipt = match self.publisher.upload(job).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!(
                        "Upload failed for {} -> {}: {:#}",
                        job.title, job.channel_label, e
                    );
                    continue;
                }
            };

            if options.auto_comment {
                let comment = comment_for(spec, &job.title);
                if let Err(e) = self
                    .publisher
                    .post_comment(&receipt.video_id, &comment)
                    .await
                {
                    warn!("Failed to post comment on {}: {:#}", receipt.video_id, e);
                }
                // Always queued so the comment can be pinned manually later.
                self.pin_queue.append(PinEntry::new(
                    &receipt.video_id,
                    &job.channel_label,
                    &job.title,
                    &comment,
                ));
            }

            match &job.playlist_id {
                Some(playlist_id) => info!(
                    "Adding video {} to playlist {} on channel {}",
                    receipt.video_id, playlist_id, job.channel_label
                ),
                None => info!(
                    "No playlist add for video {} on channel {}",
                    receipt.video_id, job.channel_label
                ),
            }
        }

        Ok(())
    }
}
