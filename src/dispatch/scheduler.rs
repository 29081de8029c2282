//! Batch scheduling of track dispatches.
//!
//! Runs many dispatches concurrently under a counting semaphore. Each track
//! is an independent unit of work: its failures are logged and surfaced via
//! its own progress session, and never affect the other tracks in the batch.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::progress::{ProgressRecord, ProgressStore};

use super::dispatcher::TrackDispatcher;
use super::fail_log::FailureLog;
use super::models::{DispatchOptions, FailureReason, TrackOverrides};

/// One batch submission.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub track_ids: Vec<String>,
    /// Channels to fan out to, in processing order.
    pub channels: Vec<String>,
    pub options: DispatchOptions,
    /// Track-specific overrides merged over `options`.
    pub per_track: HashMap<String, TrackOverrides>,
    /// Maximum simultaneously-executing dispatches.
    pub max_concurrent: usize,
}

pub struct BatchScheduler {
    dispatcher: Arc<TrackDispatcher>,
    progress: Arc<ProgressStore>,
    fail_log: Arc<FailureLog>,
}

impl BatchScheduler {
    pub fn new(
        dispatcher: Arc<TrackDispatcher>,
        progress: Arc<ProgressStore>,
        fail_log: Arc<FailureLog>,
    ) -> Self {
        Self {
            dispatcher,
            progress,
            fail_log,
        }
    }

    /// Derived session id giving each track independently observable
    /// progress.
    pub fn session_id(batch_id: &str, track_id: &str) -> String {
        format!("{batch_id}__{track_id}")
    }

    /// Fire-and-forget submission: spawns the batch onto the runtime and
    /// returns immediately. Results are observable only via the progress
    /// store and the failure log.
    pub fn spawn(self: &Arc<Self>, batch_id: String, request: BatchRequest) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run(&batch_id, request).await;
        });
    }

    /// Run a whole batch to completion.
    pub async fn run(&self, batch_id: &str, request: BatchRequest) {
        let semaphore = Arc::new(Semaphore::new(request.max_concurrent.max(1)));
        let mut tasks = JoinSet::new();

        info!(
            "Batch {} starting: {} tracks, {} channels, max_concurrent={}",
            batch_id,
            request.track_ids.len(),
            request.channels.len(),
            request.max_concurrent.max(1)
        );

        for track_id in request.track_ids {
            let session_id = Self::session_id(batch_id, &track_id);
            let options = request
                .per_track
                .get(&track_id)
                .map(|overrides| overrides.merged_into(&request.options))
                .unwrap_or_else(|| request.options.clone());
            let channels = request.channels.clone();
            let batch_id = batch_id.to_string();
            let dispatcher = self.dispatcher.clone();
            let progress = self.progress.clone();
            let fail_log = self.fail_log.clone();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore closed");

                // The inner spawn is the last line of defense: a panicking
                // dispatch joins as an error here instead of taking the
                // batch worker down.
                let dispatch = tokio::spawn({
                    let dispatcher = dispatcher.clone();
                    let batch_id = batch_id.clone();
                    let track_id = track_id.clone();
                    let channels = channels.clone();
                    let session_id = session_id.clone();
                    async move {
                        dispatcher
                            .dispatch(&batch_id, &track_id, &channels, options, &session_id)
                            .await
                    }
                });

                match dispatch.await {
                    Ok(Ok(summary)) => {
                        info!(
                            "Track {} complete (cached={}, ok={:?}, failed={:?})",
                            track_id, summary.cached, summary.channels_ok, summary.channels_failed
                        );
                    }
                    Ok(Err(e)) => {
                        warn!(
                            "Track {} dispatch failed: {}",
                            track_id,
                            e.reason.as_str()
                        );
                        fail_log.log(&batch_id, &track_id, e.reason, e.details);
                    }
                    Err(join_error) => {
                        warn!("Track {} dispatch aborted: {}", track_id, join_error);
                        fail_log.log(
                            &batch_id,
                            &track_id,
                            FailureReason::DispatchUncaught,
                            json!({"error": join_error.to_string()}),
                        );
                        progress.set(
                            &session_id,
                            ProgressRecord::new(
                                format!("Uncaught error for {track_id} - continuing"),
                                0.0,
                            ),
                        );
                    }
                }
            });
        }

        while tasks.join_next().await.is_some() {}
        info!("Batch {} finished", batch_id);
    }
}
