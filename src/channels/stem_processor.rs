//! The generic per-channel stem processor.
//!
//! All channels share one pipeline shape: locate stems, copy into the
//! branded library layout, trim, tag, render, then hand the accumulated
//! video map to the publisher once. What varies per channel is pure data
//! (stem selection, branding, naming) carried by its `ChannelSpec`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::channels::naming::{folder_title, track_folder};
use crate::channels::{ChannelSpec, StemKind};
use crate::media::{RenderRequest, StemTagger, ThumbnailFetcher, VideoRenderer};
use crate::progress::ProgressStore;
use crate::publish::PublishPipeline;

use super::processor::{ChannelContext, ChannelError, ChannelProcessor};

/// Filesystem roots the processor writes under.
#[derive(Debug, Clone)]
pub struct MediaDirs {
    /// Tagged stem audio, laid out `<channel>/<genre>/<Stem>/<title>/`.
    pub library_root: PathBuf,
    /// Rendered videos, same layout.
    pub video_root: PathBuf,
    /// Per-track artwork cache.
    pub thumbs_root: PathBuf,
}

pub struct StemChannelProcessor {
    spec: ChannelSpec,
    dirs: MediaDirs,
    thumbnails: Arc<dyn ThumbnailFetcher>,
    tagger: Arc<dyn StemTagger>,
    renderer: Arc<dyn VideoRenderer>,
    publish: Arc<PublishPipeline>,
    progress: Arc<ProgressStore>,
}

impl StemChannelProcessor {
    pub fn new(
        spec: ChannelSpec,
        dirs: MediaDirs,
        thumbnails: Arc<dyn ThumbnailFetcher>,
        tagger: Arc<dyn StemTagger>,
        renderer: Arc<dyn VideoRenderer>,
        publish: Arc<PublishPipeline>,
        progress: Arc<ProgressStore>,
    ) -> Self {
        Self {
            spec,
            dirs,
            thumbnails,
            tagger,
            renderer,
            publish,
            progress,
        }
    }

    /// Progress update inside this channel's slice of the fanout window.
    ///
    /// The dispatcher reserves 46..100 for channel fanout; each channel owns
    /// an equal slice and steps move monotonically through it.
    fn step(&self, ctx: &ChannelContext, message: &str, step: u32, total_steps: u32) {
        let channel = self.spec.key.clone();
        let track = &ctx.track;
        let (artist, title, bpm, key) = (
            track.artist.clone(),
            track.name.clone(),
            track.bpm(),
            track.key.clone(),
        );
        let message = message.to_string();
        self.progress.update(&ctx.session_id, move |record| {
            let completed = record.meta.completed.unwrap_or(0);
            let total = record.meta.total.unwrap_or(1).max(1);
            let slice = 54.0 / total as f64;
            let base = 46.0 + completed as f64 * slice;
            let percent = base + (step as f64 / total_steps.max(1) as f64) * slice;
            record.message = message;
            record.percent = record.percent.max(percent.min(100.0));
            record.meta.channel = Some(channel);
            record.meta.artist = Some(artist);
            record.meta.track = Some(title.clone());
            record.meta.title = Some(title);
            record.meta.bpm = Some(bpm);
            record.meta.key = Some(key);
        });
    }

    /// Copy, trim, tag, and render one stem. Returns the rendered video path
    /// when everything worked; render failures leave the stem published
    /// audio-only (not in the video map) but still count it as processed.
    async fn process_stem(
        &self,
        ctx: &ChannelContext,
        stem: StemKind,
        source: &Path,
        thumbnail: Option<&Path>,
    ) -> anyhow::Result<Option<PathBuf>> {
        let track = &ctx.track;
        let title = folder_title(
            &track.artist,
            &track.name,
            stem.label(),
            track.bpm(),
            &track.key,
        );
        let genre = &ctx.options.genre;

        let audio_dir = self
            .dirs
            .library_root
            .join(&self.spec.label)
            .join(genre)
            .join(stem.label())
            .join(&title);
        tokio::fs::create_dir_all(&audio_dir)
            .await
            .context("Failed to create stem library dir")?;
        let audio_path = audio_dir.join(format!("{title}.mp3"));
        tokio::fs::copy(source, &audio_path)
            .await
            .with_context(|| format!("Failed to copy stem from {}", source.display()))?;

        if let Some(secs) = ctx.options.trim_length_secs {
            if let Err(e) = crate::media::trim_in_place(&audio_path, secs).await {
                warn!("Trim failed for {}: {:#}", audio_path.display(), e);
            }
        }

        let tag_comment = format!("Key: {}, BPM: {}", track.key, track.bpm());
        if let Err(e) = self
            .tagger
            .tag(&audio_path, &format!("{} stem", stem.label()), &tag_comment)
            .await
        {
            warn!("Tagging failed for {}: {:#}", audio_path.display(), e);
        }

        let out_path = self
            .dirs
            .video_root
            .join(&self.spec.label)
            .join(genre)
            .join(stem.label())
            .join(&title)
            .join(format!("{title}.mp4"));
        let request = RenderRequest {
            audio_path: audio_path.clone(),
            thumbnail: thumbnail.map(Path::to_path_buf),
            out_path,
            tint: self.spec.tint,
        };
        match self.renderer.render(&request).await {
            Ok(video_path) => Ok(Some(video_path)),
            Err(e) => {
                warn!(
                    "Failed to render {} video for {}: {:#}",
                    stem.label(),
                    self.spec.key,
                    e
                );
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ChannelProcessor for StemChannelProcessor {
    fn key(&self) -> &str {
        &self.spec.key
    }

    async fn process(&self, ctx: &ChannelContext) -> Result<(), ChannelError> {
        let track = &ctx.track;
        if !ctx.audio_path.exists() {
            return Err(ChannelError::AudioMissing(ctx.audio_path.clone()));
        }

        // One stem per major step, plus thumbnail and publish bookends.
        let total_steps = self.spec.stems.len() as u32 + 2;
        self.step(
            ctx,
            &format!("Preparing {} stems...", self.spec.label),
            0,
            total_steps,
        );

        let thumb_dir = self.dirs.thumbs_root.join(track_folder(
            &track.artist,
            &track.name,
            track.bpm(),
            &track.key,
        ));
        let thumbnail = self.thumbnails.fetch(&track.img, &thumb_dir).await;
        if thumbnail.is_none() {
            info!("No thumbnail for {}; rendering plain background", ctx.uid);
        }
        self.step(ctx, "Thumbnail ready", 1, total_steps);

        let mut video_paths: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut processed = 0usize;

        for (index, stem) in self.spec.stems.iter().enumerate() {
            let source = ctx.stem_dir.join(stem.source_file());
            if !source.exists() {
                // Optional stem missing: skip it, the rest still process.
                self.step(
                    ctx,
                    &format!("{} stem not found, skipping", stem.label()),
                    1 + index as u32,
                    total_steps,
                );
                continue;
            }

            self.step(
                ctx,
                &format!("Rendering {}...", stem.label()),
                1 + index as u32,
                total_steps,
            );
            match self
                .process_stem(ctx, *stem, &source, thumbnail.as_deref())
                .await
            {
                Ok(Some(video_path)) => {
                    video_paths.insert(stem.publish_key().to_string(), video_path);
                    processed += 1;
                }
                Ok(None) => {
                    processed += 1;
                }
                Err(e) => return Err(ChannelError::Other(e)),
            }
        }

        if processed == 0 {
            return Err(ChannelError::NoUsableStems(ctx.stem_dir.clone()));
        }

        if ctx.options.publish && !video_paths.is_empty() {
            self.step(
                ctx,
                &format!("Uploading {} stems...", self.spec.label),
                total_steps - 1,
                total_steps,
            );
            self.publish
                .publish_channel(&self.spec, track, &video_paths, &ctx.options.upload)
                .await
                .map_err(ChannelError::Other)?;
        } else if !ctx.options.publish {
            self.step(ctx, "Publishing skipped", total_steps - 1, total_steps);
        }

        self.step(
            ctx,
            &format!("{} processing complete", self.spec.label),
            total_steps,
            total_steps,
        );
        Ok(())
    }
}
