//! Per-track dispatch orchestration.
//!
//! One dispatch walks a track through: track info -> audio acquisition ->
//! best-effort preparation -> validated stems (cache or fallback separation)
//! -> per-channel fanout. Failure at any stage is terminal for the track but
//! never for its siblings; channel failures are terminal only for that
//! channel.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};

use crate::channels::{ChannelContext, ChannelRegistry};
use crate::media::{AudioFetcher, AudioPreparer};
use crate::progress::{ProgressRecord, ProgressStore};
use crate::providers::TrackInfoProvider;
use crate::stems::{SeparationEngine, SeparationOutcome};

use super::fail_log::FailureLog;
use super::models::{DispatchError, DispatchOptions, DispatchSummary, FailureReason};

pub struct TrackDispatcher {
    progress: Arc<ProgressStore>,
    fail_log: Arc<FailureLog>,
    track_info: Arc<dyn TrackInfoProvider>,
    fetcher: Arc<dyn AudioFetcher>,
    preparer: Arc<dyn AudioPreparer>,
    engine: Arc<SeparationEngine>,
    registry: Arc<ChannelRegistry>,
    /// Where prepared (normalized) copies land. Separate from the download
    /// dir so the prepared file can keep the uid as its filename stem.
    prep_dir: PathBuf,
}

impl TrackDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        progress: Arc<ProgressStore>,
        fail_log: Arc<FailureLog>,
        track_info: Arc<dyn TrackInfoProvider>,
        fetcher: Arc<dyn AudioFetcher>,
        preparer: Arc<dyn AudioPreparer>,
        engine: Arc<SeparationEngine>,
        registry: Arc<ChannelRegistry>,
        prep_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            progress,
            fail_log,
            track_info,
            fetcher,
            preparer,
            engine,
            registry,
            prep_dir: prep_dir.into(),
        }
    }

    /// Dispatch one track through separation and channel fanout.
    ///
    /// Fatal-to-track failures come back as `DispatchError` for the caller
    /// (the batch scheduler) to convert into a failure-log entry. Channel
    /// failures are absorbed here: logged, surfaced via progress, and the
    /// loop continues.
    pub async fn dispatch(
        &self,
        batch_id: &str,
        track_id: &str,
        channels: &[String],
        options: DispatchOptions,
        session_id: &str,
    ) -> Result<DispatchSummary, DispatchError> {
        info!("Dispatching stem processing for track {}", track_id);

        // TRACK_INFO
        let Some(track) = self.track_info.get(track_id).await else {
            self.fail_session(session_id, "Failed to get track info");
            return Err(DispatchError::new(
                FailureReason::TrackInfo,
                json!({"message": "Failed to get track info"}),
            ));
        };

        // AUDIO_ACQUIRED
        self.progress.update(session_id, |record| {
            record.message = "Downloading track audio...".to_string();
            record.meta.artist = Some(track.artist.clone());
            record.meta.track = Some(track.name.clone());
            record
                .meta
                .extra
                .insert("track_id".to_string(), json!(track_id));
        });
        let audio = self.fetcher.fetch(&track.name, &track.artist).await;
        let Some(audio) = audio.filter(|a| a.path.exists()) else {
            self.fail_session(session_id, "Audio download failed");
            return Err(DispatchError::new(
                FailureReason::DownloadAudio,
                json!({"title": track.name, "artist": track.artist}),
            ));
        };
        let uid = audio.uid.clone();

        // AUDIO_PREPARED (best-effort)
        let prep_path = self.prep_dir.join(format!("{uid}.mp3"));
        let audio_for_split = if self.preparer.prepare(&audio.path, &prep_path).await {
            info!("Using prepared audio at {}", prep_path.display());
            prep_path
        } else {
            info!("Using original audio (prep failed or skipped)");
            audio.path.clone()
        };

        // STEMS_READY: reuse the first cached directory that validates, else
        // run the fallback engine.
        let mut summary = DispatchSummary {
            uid: uid.clone(),
            ..Default::default()
        };
        let stem_dir = match self.find_cached_stems(&uid).await {
            Some((model, dir)) => {
                summary.cached = true;
                self.progress.set(
                    session_id,
                    ProgressRecord::new(format!("Using cached stems ({model})"), 45.0),
                );
                dir
            }
            None => {
                self.progress.set(
                    session_id,
                    ProgressRecord::new("Separating stems...", 12.0),
                );
                let outcome = self
                    .engine
                    .separate_with_fallback(&audio_for_split, &uid, &options.device, session_id)
                    .await;
                match outcome {
                    SeparationOutcome::Separated {
                        model, output_dir, ..
                    } => {
                        self.progress.set(
                            session_id,
                            ProgressRecord::new(
                                format!("Separation complete with {model}"),
                                45.0,
                            ),
                        );
                        summary.model_used = Some(model);
                        output_dir
                    }
                    SeparationOutcome::Failed { validation } => {
                        self.fail_session(session_id, "Stem separation failed on all models");
                        return Err(DispatchError::new(
                            FailureReason::SeparationFailed,
                            json!({"problems": validation.problems}),
                        ));
                    }
                }
            }
        };

        // CHANNEL_FANOUT
        self.progress.update(session_id, |record| {
            record.message = "Processing channels...".to_string();
            record.percent = 46.0;
            record.meta.completed = Some(0);
            record.meta.total = Some(channels.len() as u32);
        });

        for channel_key in channels {
            let Some(processor) = self.registry.get(channel_key) else {
                self.fail_log.log(
                    batch_id,
                    track_id,
                    FailureReason::UnknownChannel,
                    json!({"channel_key": channel_key}),
                );
                summary.channels_failed.push(channel_key.clone());
                continue;
            };

            self.progress.update(session_id, |record| {
                record.message = format!("Processing {}...", channel_key.to_uppercase());
                record.meta.channel = Some(channel_key.clone());
            });

            let ctx = ChannelContext {
                track_id: track_id.to_string(),
                session_id: session_id.to_string(),
                track: track.clone(),
                stem_dir: stem_dir.clone(),
                audio_path: audio.path.clone(),
                uid: uid.clone(),
                options: options.clone(),
            };

            match processor.process(&ctx).await {
                Ok(()) => {
                    summary.channels_ok.push(channel_key.clone());
                    self.progress.update(session_id, |record| {
                        let completed = record.meta.completed.unwrap_or(0) + 1;
                        let total = record.meta.total.unwrap_or(1).max(1);
                        record.meta.completed = Some(completed);
                        record.meta.channel = Some(channel_key.clone());
                        record.percent =
                            46.0 + ((completed as f64 / total as f64) * 54.0).floor();
                        record.message = format!("{} done", channel_key.to_uppercase());
                    });
                }
                Err(e) => {
                    error!(
                        "Channel {} failed for track {}: {:#}",
                        channel_key, track_id, e
                    );
                    self.fail_log.log(
                        batch_id,
                        track_id,
                        FailureReason::ChannelProcessing,
                        json!({"channel_key": channel_key, "error": format!("{e:#}")}),
                    );
                    summary.channels_failed.push(channel_key.clone());
                    self.progress.update(session_id, |record| {
                        record.message = format!(
                            "Error processing {} - continuing",
                            channel_key.to_uppercase()
                        );
                    });
                }
            }
        }

        // COMPLETE: partial channel failure is still complete from the
        // batch's point of view; failures live in the log.
        self.progress.update(session_id, |record| {
            record.message = "All processing complete".to_string();
            record.percent = 100.0;
        });

        Ok(summary)
    }

    /// First candidate model whose existing output directory validates.
    /// A directory on disk is never trusted without a fresh validation.
    async fn find_cached_stems(&self, uid: &str) -> Option<(String, PathBuf)> {
        for model in self.engine.models() {
            let dir = self.engine.candidate_dir(model, uid);
            if !dir.exists() {
                continue;
            }
            let validation = self.engine.validate_dir(&dir).await;
            if validation.ok {
                return Some((model.clone(), dir));
            }
            warn!(
                "Cached stems at {} failed validation: {:?}",
                dir.display(),
                validation.problems
            );
        }
        None
    }

    fn fail_session(&self, session_id: &str, message: &str) {
        self.progress
            .set(session_id, ProgressRecord::new(message, 0.0));
    }
}
