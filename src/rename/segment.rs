//! Split a cleaned file stem into track number, artist and title.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::rename::normalize::{SEPARATOR, clean_piece};

/// Leading `NN -` track number with 1-3 digits.
static RE_LEADING_TRACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*(\d{1,3})\s*-\s*(.*)$").expect("Failed to compile track number regex"));

/// Label or descriptor words that mark a trailing chunk as noise.
static RE_LABEL_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(records?|collective|line|wars|club|mix|edit|bootleg|remix|demo|mash\s*up)")
        .expect("Failed to compile label hint regex")
});

/// `Track 09 - ` inside a title.
static RE_TITLE_TRACK_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*track\s*\d+\s*-\s*").expect("Failed to compile title track regex"));

/// Decides which of two or more dash-separated parts is the artist.
///
/// Receives the parts after label and duplicate handling
/// and returns `(artist, title)`.
pub type SplitPolicy = fn(&[String]) -> (String, String);

/// Track number, artist and title parsed from one file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedName {
    /// Track number digits as found in the name, without padding.
    pub track: Option<String>,
    pub artist: String,
    pub title: String,
}

impl ParsedName {
    /// Apply the same transform to artist and title.
    #[must_use]
    pub fn map_pieces(self, transform: impl Fn(&str) -> String) -> Self {
        Self {
            track: self.track,
            artist: transform(&self.artist),
            title: transform(&self.title),
        }
    }
}

impl fmt::Display for ParsedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "track: {:?}, artist: {:?}, title: {:?}",
            self.track.as_deref().unwrap_or_default(),
            self.artist,
            self.title
        )
    }
}

/// Titles are usually longer than artist handles:
/// `[a, b, ..]` is `artist=a` when `b` is at least as long as `a`,
/// otherwise the last part is the artist.
///
/// Equal lengths resolve to `artist=a`.
#[must_use]
pub fn longer_segment_is_title(parts: &[String]) -> (String, String) {
    match parts {
        [] => (String::new(), String::new()),
        [only] => (String::new(), only.clone()),
        [first, second, ..] if second.chars().count() >= first.chars().count() => {
            (first.clone(), parts[1..].join(SEPARATOR))
        }
        [.., last] => (last.clone(), parts[..parts.len() - 1].join(SEPARATOR)),
    }
}

/// Guess `(track, artist, title)` using the default split policy.
///
/// ```rust
/// use cloudbuccaneer::rename::guess_artist_title;
///
/// let parsed = guess_artist_title("01 - Artist - Title [FREE DL]");
/// assert_eq!(parsed.track.as_deref(), Some("01"));
/// assert_eq!(parsed.artist, "Artist");
/// assert_eq!(parsed.title, "Title");
/// ```
#[must_use]
pub fn guess_artist_title(basename: &str) -> ParsedName {
    guess_artist_title_with(basename, longer_segment_is_title)
}

/// Guess `(track, artist, title)` with a custom split policy.
///
/// Accepts names like:
/// - `NN - Artist - Title - MaybeLabel`
/// - `NN - Title - Artist`
/// - `Artist - Title`
/// - `Title - Artist`
#[must_use]
pub fn guess_artist_title_with(basename: &str, policy: SplitPolicy) -> ParsedName {
    let (track, name) = RE_LEADING_TRACK.captures(basename).map_or((None, basename), |caps| {
        let digits = caps.get(1).map(|m| m.as_str().to_string());
        let rest = caps.get(2).map_or("", |m| m.as_str());
        (digits, rest)
    });

    let parts = drop_trailing_labelish(split_dash_parts(name));
    let (parts, artist_repeated) = collapse_duplicate_artist(parts);

    // A repeated first part is the artist, whatever the lengths say.
    let (artist, title) = match parts.as_slice() {
        [artist, rest @ ..] if artist_repeated => (artist.clone(), rest.join(SEPARATOR)),
        [_, _, ..] => policy(&parts),
        [only] => (String::new(), only.clone()),
        [] => (String::new(), basename.to_string()),
    };

    let mut artist = clean_piece(&artist);
    let mut title = clean_piece(&remove_track_prefix_in_title(&title));

    if artist.is_empty()
        && !title.is_empty()
        && let Some((recovered_artist, recovered_title)) = recover_artist_from_title(&title)
    {
        artist = recovered_artist;
        title = recovered_title;
    }

    ParsedName { track, artist, title }
}

/// Split on `" - "` into trimmed, non-empty parts.
#[must_use]
pub fn split_dash_parts(name: &str) -> Vec<String> {
    name.split(SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Drop a trailing label-like chunk: `Artist - Title - Some Records`.
#[must_use]
pub fn drop_trailing_labelish(mut parts: Vec<String>) -> Vec<String> {
    if parts.len() >= 3 && parts.last().is_some_and(|last| RE_LABEL_HINTS.is_match(last)) {
        parts.pop();
    }
    parts
}

/// Collapse a duplicated artist: `Artist - ARTIST - Title`.
///
/// The returned flag tells whether a duplicate was removed.
#[must_use]
pub fn collapse_duplicate_artist(mut parts: Vec<String>) -> (Vec<String>, bool) {
    if parts.len() >= 3 && !parts[0].is_empty() && parts[0].trim().to_lowercase() == parts[1].trim().to_lowercase() {
        parts.remove(1);
        return (parts, true);
    }
    (parts, false)
}

/// Strip a redundant `Track NN -` prefix from a title.
#[must_use]
pub fn remove_track_prefix_in_title(title: &str) -> String {
    RE_TITLE_TRACK_PREFIX.replace(title, "").into_owned()
}

/// Pull an artist from the end of a title that still looks like `Title - Artist`.
#[must_use]
pub fn recover_artist_from_title(title: &str) -> Option<(String, String)> {
    let tail_parts = split_dash_parts(title);
    match tail_parts.as_slice() {
        [head @ .., last] if !head.is_empty() => Some((clean_piece(last), clean_piece(&head.join(SEPARATOR)))),
        _ => None,
    }
}
