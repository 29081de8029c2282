//! Naming rules shared by channel processing and upload planning.

/// Filesystem-safe name: keep alphanumerics, spaces, dashes, underscores,
/// and brackets; drop everything else. Consistent everywhere a folder or
/// file is named after track metadata.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || " -_[]()".contains(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Title for a stem video or folder.
///
/// Drums carry BPM only; every other stem carries BPM and key.
pub fn stem_title(artist: &str, track_title: &str, stem_label: &str, bpm: i64, key: &str) -> String {
    if stem_label.eq_ignore_ascii_case("drums") {
        format!("{artist} - {track_title} {stem_label} [{bpm} BPM]")
    } else {
        format!("{artist} - {track_title} {stem_label} [{bpm} BPM_{key}]")
    }
}

/// Sanitized per-track folder name, without a stem component. Used for
/// shared per-track assets like artwork.
pub fn track_folder(artist: &str, track_title: &str, bpm: i64, key: &str) -> String {
    sanitize_name(&format!("{artist} - {track_title} [{bpm} BPM_{key}]"))
}

/// Sanitized folder name for one stem of one track.
pub fn folder_title(
    artist: &str,
    track_title: &str,
    stem_label: &str,
    bpm: i64,
    key: &str,
) -> String {
    sanitize_name(&stem_title(artist, track_title, stem_label, bpm, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_allowed_punctuation() {
        assert_eq!(
            sanitize_name("Artist - Song [124 BPM_F#]"),
            "Artist - Song [124 BPM_F]"
        );
        assert_eq!(sanitize_name("  spaced  "), "spaced");
        assert_eq!(sanitize_name("a/b\\c:d*e"), "abcde");
    }

    #[test]
    fn test_drums_title_omits_key() {
        assert_eq!(
            stem_title("Artist", "Song", "Drums", 124, "F"),
            "Artist - Song Drums [124 BPM]"
        );
    }

    #[test]
    fn test_other_stems_carry_key() {
        assert_eq!(
            stem_title("Artist", "Song", "Acapella", 124, "F"),
            "Artist - Song Acapella [124 BPM_F]"
        );
        assert_eq!(
            stem_title("Artist", "Song", "Melody", 98, "Am"),
            "Artist - Song Melody [98 BPM_Am]"
        );
    }

    #[test]
    fn test_folder_title_is_sanitized() {
        assert_eq!(
            folder_title("A/rtist", "So:ng", "Bass", 90, "C#"),
            "Artist - Song Bass [90 BPM_C]"
        );
    }
}
