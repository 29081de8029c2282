//! Upload planning: which rendered videos go where, under what title, on
//! what schedule.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::channels::{stem_title, ChannelSpec, StemKind};
use crate::dispatch::{TrackRecord, UploadOptions};

const MUSIC_CATEGORY_ID: &str = "10";

const DEFAULT_COMMENT: &str =
    "Thanks for listening! More daily stems in the playlists. Subscribe!";

/// One planned video upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadJob {
    pub channel_key: String,
    pub channel_label: String,
    pub stem: StemKind,
    pub file_path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: String,
    pub made_for_kids: bool,
    /// Scheduled publish time; `None` publishes with the privacy status as-is.
    pub publish_at: Option<DateTime<Utc>>,
    /// Publisher credential for this channel.
    pub credential: Option<String>,
    /// Playlist to add the video to, when the selection matches this stem.
    pub playlist_id: Option<String>,
}

/// Build the upload plan for one channel from its accumulated video paths.
///
/// Follows the channel's configured stem order; videos for stems the channel
/// does not publish are ignored.
pub fn plan_uploads(
    spec: &ChannelSpec,
    track: &TrackRecord,
    video_paths: &BTreeMap<String, PathBuf>,
    options: &UploadOptions,
) -> Vec<UploadJob> {
    let publish_at = publish_time(options);

    spec.stems
        .iter()
        .filter_map(|stem| {
            let file_path = video_paths.get(stem.publish_key())?.clone();
            Some(UploadJob {
                channel_key: spec.key.clone(),
                channel_label: spec.label.clone(),
                stem: *stem,
                file_path,
                title: stem_title(
                    &track.artist,
                    &track.name,
                    stem.label(),
                    track.bpm(),
                    &track.key,
                ),
                description: options.description.clone(),
                tags: options.tags.clone(),
                category_id: MUSIC_CATEGORY_ID.to_string(),
                privacy: options.privacy.clone(),
                made_for_kids: options.made_for_kids,
                publish_at,
                credential: spec.credential.clone(),
                playlist_id: playlist_for(spec, *stem, options),
            })
        })
        .collect()
}

/// Pinned-comment text for a channel, with the stem title substituted.
pub fn comment_for(spec: &ChannelSpec, stem_title: &str) -> String {
    spec.comment_template
        .as_deref()
        .unwrap_or(DEFAULT_COMMENT)
        .replace("{stem_title}", stem_title)
}

/// Scheduled publish instant for this track's artist, or `None` when
/// unscheduled. Parse errors degrade to unscheduled uploads.
fn publish_time(options: &UploadOptions) -> Option<DateTime<Utc>> {
    let start = options.schedule_start.as_deref()?;
    match DateTime::parse_from_rfc3339(start) {
        Ok(base) => {
            let offset =
                Duration::minutes(options.artist_index * options.schedule_interval_minutes);
            Some(base.with_timezone(&Utc) + offset)
        }
        Err(e) => {
            warn!("Invalid schedule start time {:?}: {}", start, e);
            None
        }
    }
}

/// Playlist id when the caller's selection names this stem and the channel
/// has a playlist configured for it.
fn playlist_for(spec: &ChannelSpec, stem: StemKind, options: &UploadOptions) -> Option<String> {
    let selection = options.playlist_selection.as_deref()?;
    let matches = match selection {
        "acapella" => stem == StemKind::Vocals,
        "drumz" => stem == StemKind::Drums,
        _ => false,
    };
    if !matches {
        return None;
    }
    spec.playlists.get(selection).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::default_channels;
    use std::collections::HashMap;

    fn track() -> TrackRecord {
        TrackRecord {
            name: "Song".to_string(),
            artist: "Artist".to_string(),
            album: String::new(),
            category: vec![],
            release_date: String::new(),
            popularity: 0,
            img: String::new(),
            tempo: 124.0,
            key: "F".to_string(),
        }
    }

    fn spec_for(key: &str) -> ChannelSpec {
        default_channels()
            .into_iter()
            .find(|c| c.key == key)
            .unwrap()
    }

    fn paths(entries: &[(&str, &str)]) -> BTreeMap<String, PathBuf> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), PathBuf::from(v)))
            .collect()
    }

    #[test]
    fn test_plan_follows_channel_stem_order() {
        let spec = spec_for("main"); // vocals then drums
        let video_paths = paths(&[("drums", "/v/d.mp4"), ("acapella", "/v/a.mp4")]);
        let jobs = plan_uploads(&spec, &track(), &video_paths, &UploadOptions::default());
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].stem, StemKind::Vocals);
        assert_eq!(jobs[1].stem, StemKind::Drums);
        assert_eq!(jobs[0].title, "Artist - Song Acapella [124 BPM_F]");
        assert_eq!(jobs[1].title, "Artist - Song Drums [124 BPM]");
    }

    #[test]
    fn test_plan_skips_stems_without_videos() {
        let spec = spec_for("sample_split"); // bass then melody
        let video_paths = paths(&[("melody", "/v/m.mp4")]);
        let jobs = plan_uploads(&spec, &track(), &video_paths, &UploadOptions::default());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].stem, StemKind::Melody);
    }

    #[test]
    fn test_plan_ignores_foreign_stem_keys() {
        let spec = spec_for("acapellas");
        let video_paths = paths(&[("drums", "/v/d.mp4")]);
        let jobs = plan_uploads(&spec, &track(), &video_paths, &UploadOptions::default());
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_schedule_offsets_by_artist_index() {
        let spec = spec_for("acapellas");
        let video_paths = paths(&[("acapella", "/v/a.mp4")]);
        let options = UploadOptions {
            schedule_start: Some("2026-08-01T12:00:00-05:00".to_string()),
            schedule_interval_minutes: 30,
            artist_index: 2,
            ..Default::default()
        };
        let jobs = plan_uploads(&spec, &track(), &video_paths, &options);
        let publish_at = jobs[0].publish_at.unwrap();
        // 12:00 -05:00 == 17:00 UTC, plus 2 * 30 minutes.
        assert_eq!(publish_at.to_rfc3339(), "2026-08-01T18:00:00+00:00");
    }

    #[test]
    fn test_bad_schedule_degrades_to_unscheduled() {
        let spec = spec_for("acapellas");
        let video_paths = paths(&[("acapella", "/v/a.mp4")]);
        let options = UploadOptions {
            schedule_start: Some("next tuesday".to_string()),
            ..Default::default()
        };
        let jobs = plan_uploads(&spec, &track(), &video_paths, &options);
        assert_eq!(jobs[0].publish_at, None);
    }

    #[test]
    fn test_playlist_only_for_matching_selection() {
        let mut spec = spec_for("main");
        spec.playlists = HashMap::from([
            ("acapella".to_string(), "PL_AC".to_string()),
            ("drumz".to_string(), "PL_DR".to_string()),
        ]);
        let video_paths = paths(&[("acapella", "/v/a.mp4"), ("drums", "/v/d.mp4")]);
        let options = UploadOptions {
            playlist_selection: Some("drumz".to_string()),
            ..Default::default()
        };
        let jobs = plan_uploads(&spec, &track(), &video_paths, &options);
        assert_eq!(jobs[0].playlist_id, None); // vocals don't match "drumz"
        assert_eq!(jobs[1].playlist_id, Some("PL_DR".to_string()));
    }

    #[test]
    fn test_comment_template_substitution() {
        let spec = spec_for("acapellas");
        let comment = comment_for(&spec, "Artist - Song Acapella [124 BPM_F]");
        assert!(comment.contains("Artist - Song Acapella [124 BPM_F]"));

        let no_template = spec_for("backup");
        assert_eq!(comment_for(&no_template, "x"), DEFAULT_COMMENT);
    }
}
