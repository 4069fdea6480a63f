//! Execute a rename plan and record every move in a CSV undo log.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use csv::Writer;

use crate::rename::planner::{RenameAction, is_same_file};

/// Cover image extensions in lookup order.
pub const COVER_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Undo log header.
pub const UNDO_HEADER: [&str; 2] = ["old_path", "new_path"];

/// Default undo log file name, relative to the working directory.
pub const DEFAULT_UNDO_FILE: &str = "undo_cloudbuccaneer.csv";

/// Moves files according to a plan.
#[derive(Debug, Clone)]
pub struct ChangeApplier {
    move_covers: bool,
    undo_path: PathBuf,
    verbose: bool,
}

impl ChangeApplier {
    #[must_use]
    pub const fn new(undo_path: PathBuf, move_covers: bool) -> Self {
        Self {
            move_covers,
            undo_path,
            verbose: false,
        }
    }

    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Apply all actions in order and return the number of completed moves.
    ///
    /// The undo log is recreated on every call and always starts with the header row.
    /// Each row is flushed right after its move,
    /// so a failure leaves one row per completed move on disk.
    ///
    /// # Errors
    /// Returns an error if the undo log can not be written or a move fails.
    /// Moves completed before the failure are not rolled back.
    pub fn apply(&self, actions: &[RenameAction]) -> Result<usize> {
        if let Some(parent) = self.undo_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create undo log directory: {}", parent.display()))?;
        }

        let mut writer = Writer::from_path(&self.undo_path)
            .with_context(|| format!("Failed to create undo log: {}", self.undo_path.display()))?;
        writer.write_record(UNDO_HEADER).context("Failed to write undo log header")?;
        writer.flush().context("Failed to flush undo log")?;

        for (completed, action) in actions.iter().enumerate() {
            self.apply_action(action).with_context(|| {
                format!(
                    "Stopped after {completed} of {} moves: {}",
                    actions.len(),
                    action.source.display()
                )
            })?;
            writer
                .write_record([crate::path_to_string(&action.source), crate::path_to_string(&action.destination)])
                .context("Failed to write undo log row")?;
            writer.flush().context("Failed to flush undo log")?;
        }

        Ok(actions.len())
    }

    fn apply_action(&self, action: &RenameAction) -> Result<()> {
        if let Some(parent) = action.destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        if self.move_covers
            && let Some(cover) = find_cover_image(&action.source)
        {
            let cover_target = cover_destination(&cover, &action.destination);
            if self.verbose {
                println!("{}", format!("Cover: {}", cover_target.display()).cyan());
            }
            move_path(&cover, &cover_target)
                .with_context(|| format!("Failed to move cover image: {}", cover.display()))?;
        }

        move_path(&action.source, &action.destination)
            .with_context(|| format!("Failed to move file: {}", action.source.display()))
    }
}

/// Apply a rename plan.
///
/// # Errors
/// Returns an error if the undo log can not be written or a move fails.
pub fn apply_changes(actions: &[RenameAction], move_covers: bool, undo_path: &Path) -> Result<usize> {
    ChangeApplier::new(undo_path.to_path_buf(), move_covers).apply(actions)
}

/// Find an image next to the audio file with the same stem.
#[must_use]
pub fn find_cover_image(audio: &Path) -> Option<PathBuf> {
    COVER_EXTENSIONS
        .iter()
        .map(|extension| audio.with_extension(extension))
        .find(|candidate| candidate.is_file())
}

/// Cover path matching the new audio stem, numbered ` (N)` if taken by another file.
fn cover_destination(cover: &Path, audio_destination: &Path) -> PathBuf {
    let extension = cover.extension().unwrap_or_default();
    let candidate = audio_destination.with_extension(extension);
    let mut target = candidate.clone();
    let mut index = 1;
    while target.exists() && !is_same_file(&target, cover) {
        target = crate::insert_suffix_before_extension(&candidate, &format!(" ({index})"));
        index += 1;
    }
    target
}

/// Rename a file, handling case-only changes and moves across file systems.
fn move_path(source: &Path, destination: &Path) -> io::Result<()> {
    if source == destination {
        return Ok(());
    }
    let case_only = crate::path_to_string(source).to_lowercase() == crate::path_to_string(destination).to_lowercase();
    if case_only {
        return rename_with_temp_file(source, destination);
    }
    match fs::rename(source, destination) {
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
        result => result,
    }
}

/// Case-insensitive file systems treat a case-only rename as a no-op.
fn rename_with_temp_file(source: &Path, destination: &Path) -> io::Result<()> {
    let temp_file = crate::append_extension_to_path(destination.to_path_buf(), "tmp");
    fs::rename(source, &temp_file)?;
    fs::rename(&temp_file, destination)
}
