//! Filename normalization and rename planning for downloaded audio.
//!
//! The pipeline runs in order: [`clean_stem`] strips junk from the raw stem,
//! [`guess_artist_title`] splits it into track, artist and title,
//! [`build_new_name`] serializes the result,
//! and [`RenamePlanner`] resolves collisions against the file system.
//! [`ChangeApplier`] performs the moves and writes the undo log.

mod apply;
mod builder;
mod normalize;
mod planner;
mod segment;

pub use apply::{COVER_EXTENSIONS, ChangeApplier, DEFAULT_UNDO_FILE, UNDO_HEADER, apply_changes, find_cover_image};
pub use builder::{FALLBACK_TITLE, build_new_name};
pub use normalize::{
    SEPARATOR, ascii_fold, clean_piece, clean_stem, lowercase_all_caps_words, normalize_chars, safe_filename,
    strip_bpm_tokens, strip_brackets_and_parens, strip_junk, trim_separators,
};
pub use planner::{AUDIO_EXTENSIONS, RenameAction, RenamePlanner, is_audio_file, is_same_file, plan_renames};
pub use segment::{ParsedName, SplitPolicy, guess_artist_title, guess_artist_title_with, longer_segment_is_title};
