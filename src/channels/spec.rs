//! Channel definitions.
//!
//! A channel is a named publishing destination with its own stem selection,
//! naming, and branding rules. Channels are plain data resolved from config
//! at startup; the registry turns each spec into a processor instance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One isolated audio component of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemKind {
    Vocals,
    Drums,
    Bass,
    /// The separator's "other" stem: the track without vocals, drums, and
    /// bass.
    Melody,
}

impl StemKind {
    /// Filename the separation tool writes this stem under.
    pub fn source_file(&self) -> &'static str {
        match self {
            StemKind::Vocals => "vocals.mp3",
            StemKind::Drums => "drums.mp3",
            StemKind::Bass => "bass.mp3",
            StemKind::Melody => "other.mp3",
        }
    }

    /// User-facing label used in titles and folder names.
    pub fn label(&self) -> &'static str {
        match self {
            StemKind::Vocals => "Acapella",
            StemKind::Drums => "Drums",
            StemKind::Bass => "Bass",
            StemKind::Melody => "Melody",
        }
    }

    /// Normalized key used in video-path maps and upload routing.
    pub fn publish_key(&self) -> &'static str {
        match self {
            StemKind::Vocals => "acapella",
            StemKind::Drums => "drums",
            StemKind::Bass => "bass",
            StemKind::Melody => "melody",
        }
    }
}

/// Static description of one publishing channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Stable identifier used in dispatch requests and the registry.
    pub key: String,
    /// Display name used in folder layout and upload payloads.
    pub label: String,
    /// Stems this channel processes and publishes, in order.
    pub stems: Vec<StemKind>,
    /// Branding tint blended over the artwork; `None` keeps the baseline
    /// look.
    #[serde(default)]
    pub tint: Option<[u8; 3]>,
    /// Pinned-comment template; `{stem_title}` is substituted per upload.
    #[serde(default)]
    pub comment_template: Option<String>,
    /// Playlist ids by selection key ("acapella" / "drumz").
    #[serde(default)]
    pub playlists: HashMap<String, String>,
    /// Publisher credential name for this channel.
    #[serde(default)]
    pub credential: Option<String>,
}

/// The built-in channel lineup, used when the config file does not define
/// its own `[[channel]]` entries.
pub fn default_channels() -> Vec<ChannelSpec> {
    vec![
        ChannelSpec {
            key: "acapellas".to_string(),
            label: "Acapellas".to_string(),
            stems: vec![StemKind::Vocals],
            tint: Some([180, 30, 30]),
            comment_template: Some(
                "Enjoy the {stem_title}? Subscribe for daily stems.".to_string(),
            ),
            playlists: HashMap::new(),
            credential: Some("acapellas.json".to_string()),
        },
        ChannelSpec {
            key: "drums".to_string(),
            label: "Drums".to_string(),
            stems: vec![StemKind::Drums],
            tint: Some([30, 90, 180]),
            comment_template: Some(
                "Drum-only version! Drop your flips and subscribe for more.".to_string(),
            ),
            playlists: HashMap::new(),
            credential: Some("drums.json".to_string()),
        },
        ChannelSpec {
            key: "main".to_string(),
            label: "Main".to_string(),
            stems: vec![StemKind::Vocals, StemKind::Drums],
            tint: None,
            comment_template: Some(
                "New {stem_title} just dropped. Like, comment your flip, and subscribe!"
                    .to_string(),
            ),
            playlists: HashMap::new(),
            credential: Some("main.json".to_string()),
        },
        ChannelSpec {
            key: "backup".to_string(),
            label: "Backup".to_string(),
            // Mirrors the main channel lineup, without a tint, so the two
            // stay visually consistent.
            stems: vec![StemKind::Vocals, StemKind::Drums],
            tint: None,
            comment_template: None,
            playlists: HashMap::new(),
            credential: Some("backup.json".to_string()),
        },
        ChannelSpec {
            key: "sample_split".to_string(),
            label: "Sample Split".to_string(),
            stems: vec![StemKind::Bass, StemKind::Melody],
            tint: Some([255, 215, 0]),
            comment_template: Some(
                "{stem_title} from Sample Split. More in the playlists.".to_string(),
            ),
            playlists: HashMap::new(),
            credential: Some("sample_split.json".to_string()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_kind_mappings_are_consistent() {
        assert_eq!(StemKind::Vocals.source_file(), "vocals.mp3");
        assert_eq!(StemKind::Vocals.publish_key(), "acapella");
        assert_eq!(StemKind::Melody.source_file(), "other.mp3");
        assert_eq!(StemKind::Melody.publish_key(), "melody");
    }

    #[test]
    fn test_default_channels_have_unique_keys() {
        let channels = default_channels();
        let mut keys: Vec<_> = channels.iter().map(|c| c.key.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), channels.len());
    }

    #[test]
    fn test_stem_kind_deserializes_snake_case() {
        let kind: StemKind = serde_json::from_str("\"melody\"").unwrap();
        assert_eq!(kind, StemKind::Melody);
    }
}
