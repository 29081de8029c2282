//! Channel processor tests with fake media collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use stemcast_server::channels::{
    default_channels, ChannelContext, ChannelError, ChannelProcessor, MediaDirs,
    StemChannelProcessor,
};
use stemcast_server::dispatch::{DispatchOptions, TrackRecord};
use stemcast_server::media::{RenderRequest, StemTagger, ThumbnailFetcher, VideoRenderer};
use stemcast_server::progress::{ProgressRecord, ProgressStore};
use stemcast_server::publish::{DryRunPublisher, PinQueue, PublishPipeline};

struct NoThumbnail;

#[async_trait]
impl ThumbnailFetcher for NoThumbnail {
    async fn fetch(&self, _url: &str, _dest_dir: &Path) -> Option<PathBuf> {
        None
    }
}

struct NoopTagger;

#[async_trait]
impl StemTagger for NoopTagger {
    async fn tag(&self, _path: &Path, _title: &str, _comment: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Renderer that writes a placeholder file where the video would land.
struct TouchRenderer;

#[async_trait]
impl VideoRenderer for TouchRenderer {
    async fn render(&self, request: &RenderRequest) -> anyhow::Result<PathBuf> {
        if let Some(parent) = request.out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.out_path, b"mp4").await?;
        Ok(request.out_path.clone())
    }
}

struct Fixture {
    processor: StemChannelProcessor,
    progress: Arc<ProgressStore>,
    work_dir: tempfile::TempDir,
}

fn fixture(channel_key: &str) -> Fixture {
    let work_dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(ProgressStore::new());
    let spec = default_channels()
        .into_iter()
        .find(|c| c.key == channel_key)
        .unwrap();
    let publish = Arc::new(PublishPipeline::new(
        Arc::new(DryRunPublisher),
        PinQueue::new(work_dir.path().join("pin_queue.jsonl")),
    ));
    let processor = StemChannelProcessor::new(
        spec,
        MediaDirs {
            library_root: work_dir.path().join("Library"),
            video_root: work_dir.path().join("MP4"),
            thumbs_root: work_dir.path().join("Thumbnails"),
        },
        Arc::new(NoThumbnail),
        Arc::new(NoopTagger),
        Arc::new(TouchRenderer),
        publish,
        progress.clone(),
    );
    Fixture {
        processor,
        progress,
        work_dir,
    }
}

fn context(fixture: &Fixture, stems: &[&str]) -> ChannelContext {
    let stem_dir = fixture.work_dir.path().join("separated/htdemucs_6s/uid-1");
    std::fs::create_dir_all(&stem_dir).unwrap();
    for stem in stems {
        std::fs::write(stem_dir.join(stem), vec![1u8; 2_000]).unwrap();
    }
    let audio_path = fixture.work_dir.path().join("MP3/uid-1.mp3");
    std::fs::create_dir_all(audio_path.parent().unwrap()).unwrap();
    std::fs::write(&audio_path, vec![1u8; 2_000]).unwrap();

    ChannelContext {
        track_id: "track-1".to_string(),
        session_id: "session-1".to_string(),
        track: TrackRecord {
            name: "Song".to_string(),
            artist: "Artist".to_string(),
            album: String::new(),
            category: vec![],
            release_date: String::new(),
            popularity: 0,
            img: String::new(),
            tempo: 124.0,
            key: "F".to_string(),
        },
        stem_dir,
        audio_path,
        uid: "uid-1".to_string(),
        options: DispatchOptions::default(),
    }
}

/// Seed the fanout bookkeeping the dispatcher normally writes.
fn seed_fanout_progress(progress: &ProgressStore, session_id: &str) {
    progress.set(session_id, ProgressRecord::new("Processing channels...", 46.0));
    progress.update(session_id, |record| {
        record.meta.completed = Some(0);
        record.meta.total = Some(1);
    });
}

#[tokio::test]
async fn test_single_stem_channel_renders_into_branded_layout() {
    let fixture = fixture("acapellas");
    seed_fanout_progress(&fixture.progress, "session-1");
    let ctx = context(&fixture, &["vocals.mp3", "drums.mp3"]);

    fixture.processor.process(&ctx).await.unwrap();

    let expected_dir = fixture
        .work_dir
        .path()
        .join("Library/Acapellas/Other/Acapella/Artist - Song Acapella [124 BPM_F]");
    assert!(expected_dir.join("Artist - Song Acapella [124 BPM_F].mp3").exists());
    let video = fixture
        .work_dir
        .path()
        .join("MP4/Acapellas/Other/Acapella/Artist - Song Acapella [124 BPM_F]/Artist - Song Acapella [124 BPM_F].mp4");
    assert!(video.exists());
}

#[tokio::test]
async fn test_multi_stem_channel_skips_missing_stem() {
    let fixture = fixture("sample_split"); // bass + melody
    seed_fanout_progress(&fixture.progress, "session-1");
    // Only other.mp3 present: bass is skipped, melody still processes.
    let ctx = context(&fixture, &["other.mp3"]);

    fixture.processor.process(&ctx).await.unwrap();

    let melody = fixture
        .work_dir
        .path()
        .join("MP4/Sample Split/Other/Melody/Artist - Song Melody [124 BPM_F]/Artist - Song Melody [124 BPM_F].mp4");
    assert!(melody.exists());
    let bass_dir = fixture.work_dir.path().join("MP4/Sample Split/Other/Bass");
    assert!(!bass_dir.exists());
}

#[tokio::test]
async fn test_no_stems_at_all_is_channel_error() {
    let fixture = fixture("drums");
    seed_fanout_progress(&fixture.progress, "session-1");
    let ctx = context(&fixture, &[]);

    let result = fixture.processor.process(&ctx).await;
    assert!(matches!(result, Err(ChannelError::NoUsableStems(_))));
}

#[tokio::test]
async fn test_missing_shared_audio_is_channel_error() {
    let fixture = fixture("drums");
    let mut ctx = context(&fixture, &["drums.mp3"]);
    ctx.audio_path = fixture.work_dir.path().join("MP3/gone.mp3");

    let result = fixture.processor.process(&ctx).await;
    assert!(matches!(result, Err(ChannelError::AudioMissing(_))));
}

#[tokio::test]
async fn test_progress_stays_monotonic_through_channel() {
    let fixture = fixture("main"); // vocals + drums
    seed_fanout_progress(&fixture.progress, "session-1");
    let ctx = context(&fixture, &["vocals.mp3", "drums.mp3"]);

    let before = fixture.progress.get("session-1").percent;
    fixture.processor.process(&ctx).await.unwrap();
    let after = fixture.progress.get("session-1").percent;

    assert!(after >= before);
    assert!(after <= 100.0);
    let record = fixture.progress.get("session-1");
    assert_eq!(record.meta.channel.as_deref(), Some("main"));
    assert_eq!(record.meta.bpm, Some(124));
}
