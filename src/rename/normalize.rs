//! Text normalizers for artist and title segments.
//!
//! Every function here is total: it takes a string and always returns a string.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Separator between track number, artist and title.
pub const SEPARATOR: &str = " - ";

/// Promotional and label tokens that never belong in a file name.
const JUNK_PATTERNS: [&str; 11] = [
    r"\[?\s*\bfree\s*dl\b\s*\]?",
    r"\[?\s*\bfree\s*download\b\s*\]?",
    r"\(?\s*\bfree\s*dl\b\s*\)?",
    r"\(?\s*\bbootleg\b\s*\)?",
    r"\(?\s*\bedit\b\s*\)?",
    r"\(?\s*\bremix\b\s*\)?",
    r"\(?\s*\bdemo\b\s*\)?",
    r"(?:\s*-\s*)?\bridonkulous\s*records\b",
    r"(?:\s*-\s*)?\bbeatroot\s*records\b",
    r"(?:\s*-\s*)?\bthe\s*donkline\b",
    r"\[\s*\]",
];

static RE_JUNK: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = JUNK_PATTERNS.iter().map(|pattern| format!("(?:{pattern})")).join("|");
    Regex::new(&format!("(?i){alternatives}")).expect("Failed to compile junk phrase regex")
});

/// Groups without any letters or digits, for example `()`, `[ ]` or `{!!}`.
static RE_EMPTY_GROUPS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^\w()]*\)|\[[^\w\[\]]*\]|\{[^\w{}]*\}").expect("Failed to compile empty group regex")
});

static RE_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\]{}()]+").expect("Failed to compile bracket regex"));

/// `160 BPM`, `120bpm`, `160-180 BPM`, `128-bpm`
static RE_BPM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{2,3}(?:\s*-\s*\d{2,3})?[\s-]*bpm\b").expect("Failed to compile BPM regex")
});

static RE_DANGLING_BPM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbpm\b").expect("Failed to compile dangling BPM regex"));

static RE_SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ _\-]{2,}").expect("Failed to compile separator run regex"));

static RE_MULTI_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("Failed to compile whitespace regex"));

static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// Words made only of two or more uppercase ASCII letters.
static RE_UPPERCASE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,}\b").expect("Failed to compile uppercase word regex"));

static RE_FILESYSTEM_INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("Failed to compile filesystem character regex"));

/// Clean one artist or title segment.
///
/// Applies, in order: junk-phrase strip, bracket strip, BPM strip,
/// character normalization, all-caps folding and a final trim.
/// The steps repeat until the text stops changing,
/// so junk that only shows up after bracket or separator cleanup is removed too.
///
/// ```rust
/// use cloudbuccaneer::rename::clean_piece;
///
/// assert_eq!(clean_piece("Stormerr! 160 BPM"), "Stormerr");
/// assert_eq!(clean_piece("Title [FREE DL]"), "Title");
/// assert_eq!(clean_piece("EVE"), "eve");
/// ```
#[must_use]
pub fn clean_piece(text: &str) -> String {
    // A pass never adds characters, so this settles quickly.
    let mut current = clean_piece_once(text);
    loop {
        let next = clean_piece_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_piece_once(text: &str) -> String {
    let text = strip_junk(text);
    let text = strip_brackets_and_parens(&text);
    let text = strip_bpm_tokens(&text);
    let text = normalize_chars(&text);
    let text = lowercase_all_caps_words(&text);
    trim_separators(&text)
}

/// Clean a whole file stem while keeping its `" - "` structure intact.
///
/// Tempo markers are removed from the whole stem first so a range like `160 - 180 BPM`
/// is not cut apart by the separator. Each separated piece then goes through
/// [`clean_piece`] on its own, pieces that end up empty are dropped.
///
/// ```rust
/// use cloudbuccaneer::rename::clean_stem;
///
/// assert_eq!(clean_stem("Artist - Title 160 - 180 BPM"), "Artist - Title");
/// ```
#[must_use]
pub fn clean_stem(stem: &str) -> String {
    strip_bpm_tokens(stem)
        .split(SEPARATOR)
        .map(clean_piece)
        .filter(|piece| !piece.is_empty())
        .join(SEPARATOR)
}

/// Remove promotional tokens and known label suffixes.
#[must_use]
pub fn strip_junk(text: &str) -> String {
    RE_JUNK.replace_all(text, "").into_owned()
}

/// Remove groups that carry no letters or digits, then every remaining bracket character.
#[must_use]
pub fn strip_brackets_and_parens(text: &str) -> String {
    let text = RE_EMPTY_GROUPS.replace_all(text, "");
    RE_BRACKETS.replace_all(&text, "").into_owned()
}

/// Remove tempo markers such as `160 BPM` and a leftover standalone `BPM`.
#[must_use]
pub fn strip_bpm_tokens(text: &str) -> String {
    let text = RE_BPM.replace_all(text, "");
    let text = RE_DANGLING_BPM.replace_all(&text, "");
    let text = RE_MULTI_WHITESPACE.replace_all(&text, " ");
    text.trim_matches([' ', '-', '_', '.']).to_string()
}

/// Replace `$` with `s`, drop `!` and collapse separator runs into a single space.
#[must_use]
pub fn normalize_chars(text: &str) -> String {
    let text = text.replace('$', "s").replace('!', "");
    let text = RE_SEPARATOR_RUNS.replace_all(&text, " ");
    let text = RE_MULTI_WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Lowercase every word that is written entirely in capitals: `EVE` -> `eve`.
///
/// Mixed case and single letter words are left alone.
#[must_use]
pub fn lowercase_all_caps_words(text: &str) -> String {
    RE_UPPERCASE_WORD
        .replace_all(text, |caps: &regex::Captures| caps[0].to_lowercase())
        .into_owned()
}

/// Collapse whitespace and trim spaces, hyphens, underscores, periods and tabs from both ends.
#[must_use]
pub fn trim_separators(text: &str) -> String {
    RE_WHITESPACE
        .replace_all(text, " ")
        .trim_matches([' ', '-', '_', '.', '\t'])
        .to_string()
}

/// Decompose accented characters and drop everything without an ASCII equivalent.
///
/// ```rust
/// use cloudbuccaneer::rename::ascii_fold;
///
/// assert_eq!(ascii_fold("Björk - Jóga"), "Bjork - Joga");
/// ```
#[must_use]
pub fn ascii_fold(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}

/// Replace characters that are invalid in file names and collapse whitespace.
///
/// ASCII folding is applied only when `ascii_only` is set.
#[must_use]
pub fn safe_filename(text: &str, ascii_only: bool) -> String {
    let text = RE_FILESYSTEM_INVALID.replace_all(text, "_");
    let text = RE_WHITESPACE.replace_all(&text, " ");
    if ascii_only {
        let folded = ascii_fold(text.trim());
        RE_WHITESPACE.replace_all(&folded, " ").trim().to_string()
    } else {
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_chars_replaces_dollar_and_exclamation() {
        assert_eq!(normalize_chars("A$AP Rocky!!"), "AsAP Rocky");
    }

    #[test]
    fn normalize_chars_collapses_mixed_runs() {
        assert_eq!(normalize_chars("deep__-  house"), "deep house");
        assert_eq!(normalize_chars("single-hyphen_kept"), "single-hyphen_kept");
    }

    #[test]
    fn strips_single_bpm() {
        assert_eq!(strip_bpm_tokens("Song Title 120 BPM"), "Song Title");
        assert_eq!(strip_bpm_tokens("Song Title 120bpm"), "Song Title");
    }

    #[test]
    fn strips_bpm_range() {
        assert_eq!(strip_bpm_tokens("Song 160-180 BPM"), "Song");
        assert_eq!(strip_bpm_tokens("Song 160 - 180bpm"), "Song");
    }

    #[test]
    fn strips_hyphenated_and_dangling_bpm() {
        assert_eq!(strip_bpm_tokens("Song 128-bpm"), "Song");
        assert_eq!(strip_bpm_tokens("Song BPM"), "Song");
    }

    #[test]
    fn keeps_numbers_without_bpm() {
        assert_eq!(strip_bpm_tokens("Song 2000"), "Song 2000");
        assert_eq!(strip_bpm_tokens("1160 BPM Mix"), "1160 Mix");
    }

    #[test]
    fn strips_empty_groups_and_stray_brackets() {
        assert_eq!(strip_brackets_and_parens("Title () [ ] {!!}"), "Title   ");
        assert_eq!(strip_brackets_and_parens("Title (Extended)"), "Title Extended");
        assert_eq!(strip_brackets_and_parens("Title [VIP]"), "Title VIP");
    }

    #[test]
    fn strips_junk_phrases() {
        assert_eq!(strip_junk("Title [FREE DL]"), "Title ");
        assert_eq!(strip_junk("Title (Free Download)"), "Title ()");
        assert_eq!(strip_junk("Title (bootleg)"), "Title ");
        assert_eq!(strip_junk("Title - Ridonkulous Records"), "Title");
        assert_eq!(strip_junk("Title []"), "Title ");
    }

    #[test]
    fn junk_words_only_match_whole_words() {
        assert_eq!(strip_junk("Meditation"), "Meditation");
        assert_eq!(strip_junk("Remixed Memories"), "Remixed Memories");
    }

    #[test]
    fn lowercases_all_caps_words_only() {
        assert_eq!(lowercase_all_caps_words("EVE and DJ Shadow"), "eve and dj Shadow");
        assert_eq!(lowercase_all_caps_words("A Tribe"), "A Tribe");
        assert_eq!(lowercase_all_caps_words("McDonald"), "McDonald");
    }

    #[test]
    fn trim_separators_strips_edges() {
        assert_eq!(trim_separators("\t - _Title_. "), "Title");
        assert_eq!(trim_separators("a   b"), "a b");
    }

    #[test]
    fn clean_piece_full_pipeline() {
        assert_eq!(clean_piece("EVE - Stormerr! 160 BPM"), "eve Stormerr");
        assert_eq!(clean_piece("  hello  world  "), "hello world");
        assert_eq!(clean_piece("Ca$h (Remix) [FREE DL]"), "Cash");
    }

    #[test]
    fn clean_piece_is_idempotent() {
        let inputs = [
            "01 - Artist - Title [FREE DL]",
            "EVE - Stormerr! 160 BPM",
            "  ((Deep))  House__--Mix  ",
            "Ca$h Money (Bootleg) {}",
            "Track 09 - Stormerr!",
            "...___---",
            "",
            "Björk - Jóga (Live)",
            "Free (DL)",
            "Title Free__DL",
            "Title [Free] Download",
        ];
        for input in inputs {
            let once = clean_piece(input);
            assert_eq!(clean_piece(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn junk_revealed_by_later_steps_is_removed() {
        assert_eq!(clean_piece("Free (DL)"), "");
        assert_eq!(clean_piece("Title Free__DL"), "Title");
        assert_eq!(clean_piece("Title [Free] Download"), "Title");
    }

    #[test]
    fn clean_stem_strips_spaced_bpm_range() {
        assert_eq!(clean_stem("Artist - Title 160 - 180 BPM"), "Artist - Title");
        assert_eq!(clean_stem("Artist - 128 BPM - Title"), "Artist - Title");
        assert_eq!(clean_stem("01 - Artist - Title 140-150 bpm"), "01 - Artist - Title");
    }

    #[test]
    fn clean_stem_keeps_separators() {
        assert_eq!(clean_stem("01 - Artist - Title [FREE DL]"), "01 - Artist - Title");
        assert_eq!(clean_stem("EVE - Stormerr! 160 BPM"), "eve - Stormerr");
        assert_eq!(clean_stem("Artist - [FREE DL] - Title"), "Artist - Title");
    }

    #[test]
    fn ascii_fold_drops_non_ascii() {
        assert_eq!(ascii_fold("café"), "cafe");
        assert_eq!(ascii_fold("日本 Mix"), " Mix");
    }

    #[test]
    fn safe_filename_escapes_invalid_characters() {
        assert_eq!(safe_filename("AC/DC: Live?", false), "AC_DC_ Live_");
        assert_eq!(safe_filename("a  \t b", false), "a b");
    }

    #[test]
    fn safe_filename_folds_when_requested() {
        assert_eq!(safe_filename("Sigur Rós - Hoppípolla", true), "Sigur Ros - Hoppipolla");
        assert_eq!(safe_filename("Sigur Rós", false), "Sigur Rós");
        assert_eq!(safe_filename("日本 - Title", true), "- Title");
    }
}
