//! Serialize a parsed name back into a file name.

use std::sync::LazyLock;

use regex::Regex;

use crate::rename::segment::ParsedName;

/// Stem used when a name has neither artist nor title.
pub const FALLBACK_TITLE: &str = "track";

static RE_MULTI_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("Failed to compile whitespace regex"));

/// Build `[NN - ]Artist - Title.ext` from a parsed name.
///
/// The track prefix is zero-padded to two digits and only added when `keep_track` is set.
/// The extension keeps its content and is lowercased.
///
/// ```rust
/// use cloudbuccaneer::rename::{ParsedName, build_new_name};
///
/// let parsed = ParsedName {
///     track: Some("1".to_string()),
///     artist: "Artist".to_string(),
///     title: "Title".to_string(),
/// };
/// assert_eq!(build_new_name(&parsed, "MP3", true), "01 - Artist - Title.mp3");
/// assert_eq!(build_new_name(&parsed, "mp3", false), "Artist - Title.mp3");
/// ```
#[must_use]
pub fn build_new_name(parsed: &ParsedName, extension: &str, keep_track: bool) -> String {
    let prefix = track_prefix(parsed.track.as_deref(), keep_track);
    let stem = if !parsed.artist.is_empty() && !parsed.title.is_empty() {
        format!("{prefix}{} - {}", parsed.artist, parsed.title)
    } else {
        let title = if parsed.title.is_empty() {
            FALLBACK_TITLE
        } else {
            parsed.title.as_str()
        };
        format!("{prefix}{title}")
    };
    let stem = RE_MULTI_WHITESPACE.replace_all(&stem, " ");
    let stem = stem.trim();

    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{}", extension.to_lowercase())
    }
}

/// `NN - ` for a valid track number, empty otherwise.
fn track_prefix(track: Option<&str>, keep_track: bool) -> String {
    if !keep_track {
        return String::new();
    }
    track
        .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u32>().ok())
        .map_or_else(String::new, |number| format!("{number:02} - "))
}
