//! File system sweeps after downloads: duplicate and leftover removal.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const WEBP_EXTENSIONS: [&str; 1] = ["webp"];
const PARTIAL_EXTENSIONS: [&str; 2] = ["part", "temp"];

/// Duplicate marker left by downloads that hit an existing name.
const DUPLICATE_STEM_SUFFIX: &str = ".1";

/// Which leftover file groups `clean` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanTargets {
    pub images: bool,
    pub parts: bool,
    pub webp: bool,
}

impl CleanTargets {
    fn extensions(self) -> Vec<&'static str> {
        let mut extensions = Vec::new();
        if self.images {
            extensions.extend(IMAGE_EXTENSIONS);
        }
        if self.webp {
            extensions.extend(WEBP_EXTENSIONS);
        }
        if self.parts {
            extensions.extend(PARTIAL_EXTENSIONS);
        }
        extensions
    }
}

/// Delete `*.1.mp3` files under the root, or only list them when `apply` is false.
///
/// Returns the number of matching files.
pub fn dedupe(root: &Path, apply: bool) -> Result<usize> {
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }
    let victims = find_duplicates(root);
    for path in &victims {
        if apply {
            println!("{} {}", "[DELETE]".red(), path.display());
            fs::remove_file(path)?;
        } else {
            println!("{} {}", "[DRY]".yellow(), path.display());
        }
    }
    Ok(victims.len())
}

/// Remove leftover thumbnails and partial downloads under the folder.
///
/// Files that can not be removed are reported and skipped.
/// Returns the number of removed files, or matching files in a dry run.
pub fn clean(folder: &Path, targets: CleanTargets, dry_run: bool) -> Result<usize> {
    if !folder.is_dir() {
        anyhow::bail!("Not a directory: {}", folder.display());
    }
    let extensions = targets.extensions();
    let mut removed = 0;
    for path in files_under(folder) {
        let extension = cloudbuccaneer::path_to_file_extension_string(&path);
        if !extensions.contains(&extension.as_str()) {
            continue;
        }
        if dry_run {
            println!("{} {}", "[DRY]".yellow(), path.display());
            removed += 1;
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(error) => cloudbuccaneer::print_warning!("Skip (error): {}: {error}", path.display()),
        }
    }
    let verb = if dry_run { "Would remove" } else { "Removed" };
    println!("{verb} {removed} files");
    Ok(removed)
}

/// `mp3` files whose stem ends with `.1`.
fn find_duplicates(root: &Path) -> Vec<PathBuf> {
    files_under(root)
        .into_iter()
        .filter(|path| cloudbuccaneer::path_to_file_extension_string(path) == "mp3")
        .filter(|path| cloudbuccaneer::path_to_file_stem_string(path).ends_with(DUPLICATE_STEM_SUFFIX))
        .collect()
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}
