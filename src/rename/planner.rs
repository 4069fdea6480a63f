//! Compute rename actions for a directory tree without touching any file.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
#[cfg(not(test))]
use indicatif::ProgressStyle;
use walkdir::WalkDir;

use crate::rename::builder::build_new_name;
use crate::rename::normalize::{clean_stem, safe_filename, trim_separators};
use crate::rename::segment::{SplitPolicy, guess_artist_title_with, longer_segment_is_title};

/// Audio file extensions the planner picks up, compared case-insensitively.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "m4a", "flac", "ogg", "wav"];

/// Upper bound for reformatting a stem that keeps changing.
const MAX_FORMAT_PASSES: usize = 8;

#[cfg(not(test))]
const PROGRESS_BAR_CHARS: &str = "=> ";
#[cfg(not(test))]
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.cyan/blue} {pos}/{len} {percent}%";

/// One proposed move from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameAction {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Builds the rename plan for all audio files under a root directory.
#[derive(Debug, Clone)]
pub struct RenamePlanner {
    root: PathBuf,
    ascii_only: bool,
    keep_track: bool,
    split_policy: SplitPolicy,
}

impl RenameAction {
    #[must_use]
    pub const fn new(source: PathBuf, destination: PathBuf) -> Self {
        Self { source, destination }
    }
}

impl fmt::Display for RenameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.display(), self.destination.display())
    }
}

impl RenamePlanner {
    #[must_use]
    pub fn new(root: PathBuf, ascii_only: bool, keep_track: bool) -> Self {
        Self {
            root,
            ascii_only,
            keep_track,
            split_policy: longer_segment_is_title,
        }
    }

    /// Replace the artist/title tie-break.
    #[must_use]
    pub fn with_split_policy(mut self, split_policy: SplitPolicy) -> Self {
        self.split_policy = split_policy;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Plan renames for every audio file under the root.
    ///
    /// Files that can not be read or parsed are left out of the plan.
    /// The filesystem is only read, never modified.
    ///
    /// # Errors
    /// Returns an error if the root is not a directory.
    pub fn plan(&self) -> Result<Vec<RenameAction>> {
        if !self.root.is_dir() {
            anyhow::bail!("Not a directory: {}", self.root.display());
        }

        let files = self.gather_audio_files();
        let progress_bar = create_progress_bar(files.len() as u64);

        let mut planned: HashSet<PathBuf> = HashSet::new();
        let mut actions = Vec::new();
        for path in files {
            progress_bar.inc(1);
            let Ok(new_name) = self.formatted_name(&path) else {
                continue;
            };
            let target = Self::resolve_collision(&path, path.with_file_name(&new_name), &planned);
            if target.file_name() == path.file_name() {
                continue;
            }
            planned.insert(target.clone());
            actions.push(RenameAction::new(path, target));
        }

        progress_bar.finish_and_clear();
        Ok(actions)
    }

    /// Compute the clean file name for one audio file, without collision handling.
    ///
    /// The stem is formatted again until it stops changing,
    /// so planning the returned name once more gives the same name.
    ///
    /// # Errors
    /// Returns an error if the path has no file name.
    pub fn formatted_name(&self, path: &Path) -> Result<String> {
        let (stem, extension) =
            crate::get_normalized_file_name_and_extension(path).context("Failed to get file name")?;

        let mut stem = self.formatted_stem(&stem);
        for _ in 0..MAX_FORMAT_PASSES {
            let next = self.formatted_stem(&stem);
            if next == stem {
                break;
            }
            stem = next;
        }

        if extension.is_empty() {
            Ok(stem)
        } else {
            Ok(format!("{stem}.{}", extension.to_lowercase()))
        }
    }

    /// One pass of clean, segment and build over a file stem.
    fn formatted_stem(&self, stem: &str) -> String {
        let parsed = guess_artist_title_with(&clean_stem(stem), self.split_policy)
            .map_pieces(|piece| trim_separators(&safe_filename(piece, self.ascii_only)));

        safe_filename(&build_new_name(&parsed, "", self.keep_track), self.ascii_only)
    }

    /// All audio files under the root in file name order, skipping hidden entries.
    fn gather_audio_files(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !crate::is_hidden(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| is_audio_file(path))
            .collect()
    }

    /// Append `.N` before the extension until the target is free or is the source itself.
    fn resolve_collision(source: &Path, candidate: PathBuf, planned: &HashSet<PathBuf>) -> PathBuf {
        let mut target = candidate.clone();
        let mut index = 1;
        while planned.contains(&target) || (target.exists() && !is_same_file(&target, source)) {
            target = crate::insert_suffix_before_extension(&candidate, &format!(".{index}"));
            index += 1;
        }
        target
    }
}

/// Plan renames under `root`.
///
/// # Errors
/// Returns an error if `root` is not a directory.
pub fn plan_renames(root: &Path, ascii_only: bool, keep_track: bool) -> Result<Vec<RenameAction>> {
    RenamePlanner::new(root.to_path_buf(), ascii_only, keep_track).plan()
}

/// Check if the path has one of the audio extensions.
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    let extension = crate::path_to_file_extension_string(path);
    AUDIO_EXTENSIONS.contains(&extension.as_str())
}

/// Check if two paths resolve to the same file.
#[must_use]
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Create a progress bar that is hidden during tests.
fn create_progress_bar(len: u64) -> ProgressBar {
    #[cfg(test)]
    {
        let _ = len;
        ProgressBar::hidden()
    }
    #[cfg(not(test))]
    {
        let progress_bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
            progress_bar.set_style(style.progress_chars(PROGRESS_BAR_CHARS));
        }
        progress_bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::{self, File};

    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).expect("Failed to create test file");
        path
    }

    fn destination_names(actions: &[RenameAction]) -> Vec<String> {
        actions
            .iter()
            .map(|action| crate::path_to_filename_string(&action.destination))
            .collect()
    }

    #[test]
    fn plans_clean_name() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "01 - Artist - Some Title [FREE DL].mp3");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(destination_names(&actions), vec!["01 - Artist - Some Title.mp3"]);
    }

    #[test]
    fn cleans_bpm_and_caps() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "EVE - Stormerr! 160 BPM.mp3");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        let names = destination_names(&actions);
        assert_eq!(names, vec!["eve - Stormerr.mp3"]);
        assert!(!names[0].contains("BPM"));
        assert!(!names[0].contains('!'));
    }

    #[test]
    fn ignores_non_audio_files() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "Artist - Title [FREE DL].txt");
        create_file(dir.path(), "cover.jpg");

        assert!(plan_renames(dir.path(), true, true).unwrap().is_empty());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "Artist - Title Name.MP3");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(destination_names(&actions), vec!["Artist - Title Name.mp3"]);
    }

    #[test]
    fn recurses_into_subdirectories() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("Some Set");
        fs::create_dir_all(&sub).unwrap();
        create_file(&sub, "02 - Artist - Title Name (FREE DL).flac");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].destination, sub.join("02 - Artist - Title Name.flac"));
    }

    #[test]
    fn skips_hidden_entries() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "._Artist - Title [FREE DL].mp3");
        let hidden_dir = dir.path().join(".cache");
        fs::create_dir_all(&hidden_dir).unwrap();
        create_file(&hidden_dir, "Artist - Title [FREE DL].mp3");

        assert!(plan_renames(dir.path(), true, true).unwrap().is_empty());
    }

    #[test]
    fn canonical_names_give_empty_plan() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "01 - Artist - Title Name.mp3");
        create_file(dir.path(), "Artist - Title Name.flac");
        create_file(dir.path(), "Just A Title.ogg");

        assert!(plan_renames(dir.path(), true, true).unwrap().is_empty());
    }

    #[test]
    fn planned_names_plan_to_themselves() {
        let dir = TempDir::new().unwrap();
        for name in [
            "Artist - ARTIST - Title - Some Records.mp3",
            "Abcd - Track 09 - Xy.mp3",
            "Artist - Title Free__DL.mp3",
            "Long Artist Name - Short [FREE DL].mp3",
            "01 - Artist - Some Title [FREE DL].mp3",
        ] {
            create_file(dir.path(), name);
        }
        let planner = RenamePlanner::new(dir.path().to_path_buf(), true, true);

        let actions = planner.plan().unwrap();
        assert_eq!(actions.len(), 5);
        for action in &actions {
            let name = crate::path_to_filename_string(&action.destination);
            assert_eq!(planner.formatted_name(&action.destination).unwrap(), name);
        }
    }

    #[test]
    fn swapped_segments_settle_on_one_order() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "Artist - ARTIST - Title - Some Records.mp3");
        create_file(dir.path(), "Abcd - Track 09 - Xy.mp3");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(destination_names(&actions), vec!["Xy - Abcd.mp3", "Title - Artist.mp3"]);
    }

    #[test]
    fn spaced_bpm_range_is_removed() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "Artist - Some Title 160 - 180 BPM.mp3");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(destination_names(&actions), vec!["Artist - Some Title.mp3"]);
    }

    #[test]
    fn colliding_names_get_numbered() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a - b [FREE DL].mp3");
        create_file(dir.path(), "a - b (bootleg).mp3");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        let names = destination_names(&actions);
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a - b.mp3".to_string()));
        assert!(names.contains(&"a - b.1.mp3".to_string()));
    }

    #[test]
    fn existing_file_is_not_clobbered() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a - b.mp3");
        create_file(dir.path(), "a - b [FREE DL].mp3");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(destination_names(&actions), vec!["a - b.1.mp3"]);
    }

    #[test]
    fn numbered_names_are_stable() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a - b.mp3");
        create_file(dir.path(), "a - b.1.mp3");

        assert!(plan_renames(dir.path(), true, true).unwrap().is_empty());
    }

    #[test]
    fn destinations_are_distinct() {
        let dir = TempDir::new().unwrap();
        for name in [
            "x - y [FREE DL].mp3",
            "x - y (Remix).mp3",
            "X - Y (Bootleg).mp3",
            "x - y 128 BPM.mp3",
            "x - y.mp3",
        ] {
            create_file(dir.path(), name);
        }

        let actions = plan_renames(dir.path(), true, true).unwrap();
        let unique: HashSet<_> = actions.iter().map(|action| action.destination.clone()).collect();
        assert_eq!(unique.len(), actions.len());
        for action in &actions {
            assert!(!action.destination.exists() || is_same_file(&action.destination, &action.source));
        }
    }

    #[test]
    fn planning_does_not_touch_files() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "01 - Artist - Title [FREE DL].mp3");
        create_file(dir.path(), "EVE - Stormerr! 160 BPM.mp3");
        create_file(dir.path(), "cover.jpg");

        let before = list_tree(dir.path());
        let actions = plan_renames(dir.path(), true, true).unwrap();
        assert!(!actions.is_empty());
        assert_eq!(list_tree(dir.path()), before);
    }

    #[test]
    fn ascii_folding_is_optional() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "Sigur Rós - Hoppípolla [FREE DL].mp3");

        let folded = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(destination_names(&folded), vec!["Sigur Ros - Hoppipolla.mp3"]);

        let kept = plan_renames(dir.path(), false, true).unwrap();
        assert_eq!(destination_names(&kept), vec!["Sigur Rós - Hoppípolla.mp3"]);
    }

    #[test]
    fn keep_track_false_drops_number() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "7 - Artist - Title Name.mp3");

        let actions = plan_renames(dir.path(), true, false).unwrap();
        assert_eq!(destination_names(&actions), vec!["Artist - Title Name.mp3"]);
    }

    #[test]
    fn invalid_characters_are_escaped() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "Artist - What Is Love? [FREE DL].mp3");

        let actions = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(destination_names(&actions), vec!["Artist - What Is Love.mp3"]);
    }

    #[test]
    fn root_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = create_file(dir.path(), "a - b.mp3");
        assert!(plan_renames(&file, true, true).is_err());
        assert!(plan_renames(&dir.path().join("missing"), true, true).is_err());
    }

    #[test]
    fn custom_policy_reaches_planner() {
        fn first_is_artist(parts: &[String]) -> (String, String) {
            (parts[0].clone(), parts[1..].join(" - "))
        }

        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "Long Artist Name - Short [FREE DL].mp3");

        let default_plan = plan_renames(dir.path(), true, true).unwrap();
        assert_eq!(destination_names(&default_plan), vec!["Short - Long Artist Name.mp3"]);

        let custom_plan = RenamePlanner::new(dir.path().to_path_buf(), true, true)
            .with_split_policy(first_is_artist)
            .plan()
            .unwrap();
        assert_eq!(destination_names(&custom_plan), vec!["Long Artist Name - Short.mp3"]);
    }

    fn list_tree(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .map(walkdir::DirEntry::into_path)
            .collect()
    }
}
