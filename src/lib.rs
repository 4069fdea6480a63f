pub mod config;
pub mod download;
pub mod rename;

use std::cmp::Ordering;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::{ColoredString, Colorize};
use difference::{Changeset, Difference};
use unicode_normalization::UnicodeNormalization;

/// Append an extension to `PathBuf`, which is missing from the standard lib :(
pub fn append_extension_to_path(path: PathBuf, extension: impl AsRef<OsStr>) -> PathBuf {
    let mut os_string: OsString = path.into();
    os_string.push(".");
    os_string.push(extension);
    os_string.into()
}

/// Format bool value as a coloured string.
#[must_use]
pub fn colorize_bool(value: bool) -> ColoredString {
    if value { "true".green() } else { "false".red() }
}

/// Get file stem and extension from Path with special characters retained instead of decomposed.
pub fn get_normalized_file_name_and_extension(path: &Path) -> Result<(String, String)> {
    let file_stem = os_str_to_string(path.file_stem().context("Failed to get file stem")?);
    let file_extension = os_str_to_string(path.extension().unwrap_or_default());

    // macOS hands out names in NFD, which splits "ö" into "o\u{308}".
    // Compose back to NFC so the character folding and ASCII folding see one char.
    Ok((
        file_stem.nfc().collect::<String>(),
        file_extension.nfc().collect::<String>(),
    ))
}

/// Check if entry is a hidden file or directory (starts with '.')
#[must_use]
pub fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    let name_bytes = entry.file_name().as_encoded_bytes();
    !name_bytes.is_empty() && name_bytes[0] == b'.'
}

/// Insert a suffix before the file extension.
///
/// If the file has no extension, the suffix is appended to the end.
///
/// ```rust
/// use std::path::Path;
/// use cloudbuccaneer::insert_suffix_before_extension;
///
/// let path = Path::new("set/Artist - Title.mp3");
/// let result = insert_suffix_before_extension(path, " (1)");
/// assert_eq!(result, Path::new("set/Artist - Title (1).mp3"));
///
/// let path = Path::new("cover");
/// let result = insert_suffix_before_extension(path, ".1");
/// assert_eq!(result.to_str().unwrap(), "cover.1");
/// ```
#[must_use]
pub fn insert_suffix_before_extension(path: &Path, suffix: &str) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path_to_file_stem_string(path);
    let extension = os_str_to_string(path.extension().unwrap_or_default());

    let new_name = if extension.is_empty() {
        format!("{stem}{suffix}")
    } else {
        format!("{stem}{suffix}.{extension}")
    };

    if parent.as_os_str().is_empty() {
        PathBuf::from(new_name)
    } else {
        parent.join(new_name)
    }
}

/// Expand a leading `~` to the user home directory.
///
/// ```rust
/// use std::path::Path;
/// use cloudbuccaneer::expand_tilde;
///
/// assert_eq!(expand_tilde(Path::new("/music/set")), Path::new("/music/set"));
/// ```
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest))
}

/// Resolves the provided input path to an absolute path.
///
/// If `path` is `None` or empty, the current working directory is used.
/// A leading `~` is expanded.
/// Returns an error if the path does not exist.
///
/// ```rust
/// use std::path::Path;
/// use cloudbuccaneer::resolve_input_path;
///
/// let absolute_path = resolve_input_path(Some(Path::new("src"))).unwrap();
/// assert!(absolute_path.is_absolute());
/// ```
pub fn resolve_input_path(path: Option<&Path>) -> Result<PathBuf> {
    let input_path = path.map(path_to_string).unwrap_or_default().trim().to_string();

    let filepath = if input_path.is_empty() {
        env::current_dir().context("Failed to get current working directory")?
    } else {
        expand_tilde(Path::new(&input_path))
    };
    if !filepath.exists() {
        anyhow::bail!(
            "Input path does not exist or is not accessible: '{}'",
            filepath.display()
        );
    }

    let absolute_input_path = dunce::canonicalize(&filepath)?;

    // Canonicalize fails for network drives on Windows :(
    if path_to_string(&absolute_input_path).starts_with(r"\\?") && !path_to_string(&filepath).starts_with(r"\\?") {
        Ok(filepath)
    } else {
        Ok(absolute_input_path)
    }
}

/// Gets the relative path or filename from a full path based on a root directory.
///
/// ```rust
/// use std::path::Path;
/// use cloudbuccaneer::get_relative_path_or_filename;
///
/// let root = Path::new("/music/set");
/// assert_eq!(get_relative_path_or_filename(&root.join("cd1/01 - a.mp3"), root), "cd1/01 - a.mp3");
/// assert_eq!(get_relative_path_or_filename(Path::new("/other/b.mp3"), root), "b.mp3");
/// ```
#[must_use]
pub fn get_relative_path_or_filename(full_path: &Path, root: &Path) -> String {
    if full_path == root {
        return path_to_filename_string(full_path);
    }
    full_path.strip_prefix(root).map_or_else(
        |_| {
            full_path.file_name().map_or_else(
                || full_path.display().to_string(),
                |name| name.to_string_lossy().to_string(),
            )
        },
        |relative_path| relative_path.display().to_string(),
    )
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
}

/// Convert given path to file stem string with invalid Unicode handling.
#[must_use]
pub fn path_to_file_stem_string(path: &Path) -> String {
    os_str_to_string(path.file_stem().unwrap_or_default())
}

/// Convert given path to file extension lowercase string with invalid Unicode handling.
#[must_use]
pub fn path_to_file_extension_string(path: &Path) -> String {
    os_str_to_string(path.extension().unwrap_or_default()).to_lowercase()
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

/// Shortest `" - "` segment used as an alignment anchor in stacked diffs.
const MIN_ANCHOR_CHARS: usize = 3;

/// Create a coloured diff for two file names.
///
/// With `stacked`, the line that needs it is indented so that the first
/// `Artist - Title` segment shared by both names starts in the same column.
pub fn color_diff(old: &str, new: &str, stacked: bool) -> (String, String) {
    let changeset = Changeset::new(old, new, "");
    let (mut old_diff, mut new_diff) = if stacked {
        stacked_indents(old, new)
    } else {
        (String::new(), String::new())
    };

    for diff in changeset.diffs {
        match diff {
            Difference::Same(ref x) => {
                old_diff.push_str(x);
                new_diff.push_str(x);
            }
            Difference::Add(ref x) => {
                if x.chars().all(char::is_whitespace) {
                    new_diff.push_str(&x.on_green().to_string());
                } else {
                    new_diff.push_str(&x.green().to_string());
                }
            }
            Difference::Rem(ref x) => {
                if x.chars().all(char::is_whitespace) {
                    old_diff.push_str(&x.on_red().to_string());
                } else {
                    old_diff.push_str(&x.red().to_string());
                }
            }
        }
    }

    (old_diff, new_diff)
}

/// Leading padding that lines up the first segment found in both names:
///
/// ```text
///              Artist - Some Title 160 BPM.mp3
/// Some Title - Artist.mp3
/// ```
///
/// Columns are counted in characters so accented names line up as well.
fn stacked_indents(old: &str, new: &str) -> (String, String) {
    let new_segments = segment_columns(new);
    for (old_column, segment) in segment_columns(old) {
        if segment.chars().count() < MIN_ANCHOR_CHARS {
            continue;
        }
        if let Some((new_column, _)) = new_segments.iter().find(|(_, other)| *other == segment) {
            return match old_column.cmp(new_column) {
                Ordering::Greater => (String::new(), " ".repeat(old_column - new_column)),
                Ordering::Less => (" ".repeat(new_column - old_column), String::new()),
                Ordering::Equal => (String::new(), String::new()),
            };
        }
    }
    (String::new(), String::new())
}

/// Start column and text of each `" - "` separated segment, without the file extension.
fn segment_columns(name: &str) -> Vec<(usize, &str)> {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let separator_width = rename::SEPARATOR.chars().count();
    let mut column = 0;
    stem.split(rename::SEPARATOR)
        .map(|segment| {
            let start = column;
            column += segment.chars().count() + separator_width;
            (start, segment)
        })
        .collect()
}

/// Print a stacked diff of the changes.
pub fn show_diff(old: &str, new: &str) {
    let (old_diff, new_diff) = color_diff(old, new, true);
    println!("{old_diff}");
    if old_diff != new_diff {
        println!("{new_diff}");
    }
}

/// Generate a shell completion script for the given shell.
pub fn generate_shell_completion(shell: Shell, mut command: Command, install: bool, command_name: &str) -> Result<()> {
    if install {
        let out_dir = get_shell_completion_dir(shell, command_name)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

/// Determine the appropriate directory for storing shell completions.
///
/// Uses the user-specific directory if it exists, then the global one.
/// If neither exist, creates and uses the user-specific dir.
fn get_shell_completion_dir(shell: Shell, name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;

    // oh-my-zsh wants a custom "plugin", which then has to be loaded in .zshrc
    if shell == Shell::Zsh {
        let omz_plugins = home.join(".oh-my-zsh/custom/plugins");
        if omz_plugins.exists() {
            let plugin_dir = omz_plugins.join(name);
            std::fs::create_dir_all(&plugin_dir)?;
            return Ok(plugin_dir);
        }
    }

    let user_dir = match shell {
        Shell::PowerShell => {
            if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            }
        }
        Shell::Bash => home.join(".bash_completion.d"),
        Shell::Elvish => home.join(".elvish"),
        Shell::Fish => home.join(".config/fish/completions"),
        Shell::Zsh => home.join(".zsh/completions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if user_dir.exists() {
        return Ok(user_dir);
    }

    let global_dir = match shell {
        Shell::Bash => PathBuf::from("/etc/bash_completion.d"),
        Shell::Fish => PathBuf::from("/usr/share/fish/completions"),
        Shell::Zsh => PathBuf::from("/usr/share/zsh/site-functions"),
        _ => user_dir.clone(),
    };

    if global_dir.exists() {
        return Ok(global_dir);
    }

    std::fs::create_dir_all(&user_dir)?;
    Ok(user_dir)
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    use std::fs::File;

    use tempfile::tempdir;
    use walkdir::WalkDir;

    #[test]
    fn test_is_hidden_file() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("._01 - Track.mp3")).unwrap();
        File::create(dir.path().join("01 - Track.mp3")).unwrap();

        let entries: Vec<_> = WalkDir::new(dir.path()).min_depth(1).into_iter().filter_map(Result::ok).collect();
        let hidden = entries
            .iter()
            .find(|e| e.file_name().to_string_lossy().starts_with("._"))
            .unwrap();
        let visible = entries
            .iter()
            .find(|e| e.file_name().to_string_lossy().eq("01 - Track.mp3"))
            .unwrap();

        assert!(is_hidden(hidden));
        assert!(!is_hidden(visible));
    }

    #[test]
    fn test_normalized_name_composes_nfd() {
        let path = PathBuf::from("Bjo\u{308}rk - Jo\u{301}ga.MP3");
        let (stem, extension) = get_normalized_file_name_and_extension(&path).unwrap();
        assert_eq!(stem, "Björk - Jóga");
        assert_eq!(extension, "MP3");
    }

    #[test]
    fn test_insert_suffix_keeps_extension_case() {
        let path = Path::new("a - b.FLAC");
        assert_eq!(insert_suffix_before_extension(path, " (2)"), Path::new("a - b (2).FLAC"));
    }

    #[test]
    fn test_append_extension() {
        let path = append_extension_to_path(PathBuf::from("dir/a - b.mp3"), "tmp");
        assert_eq!(path, Path::new("dir/a - b.mp3.tmp"));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde(Path::new("relative/set")), Path::new("relative/set"));
    }

    #[test]
    fn test_expand_tilde_uses_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/Download")), home.join("Download"));
        }
    }

    #[test]
    fn test_resolve_input_path_valid() {
        let dir = tempdir().unwrap();
        let resolved = resolve_input_path(Some(dir.path()));
        assert!(resolved.is_ok());
    }

    #[test]
    fn test_resolve_input_path_nonexistent() {
        let resolved = resolve_input_path(Some(Path::new("nonexistent-music-dir")));
        assert!(resolved.is_err());
    }

    #[test]
    fn test_resolve_input_path_default() {
        let resolved = resolve_input_path(None);
        assert_eq!(resolved.unwrap(), dunce::canonicalize(env::current_dir().unwrap()).unwrap());
    }

    #[test]
    fn test_color_diff_unchanged() {
        let (old, new) = color_diff("Artist - Title.mp3", "Artist - Title.mp3", true);
        assert_eq!(old, new);
    }

    #[test]
    fn test_stacked_diff_aligns_swapped_segments() {
        let (old, new) = stacked_indents("Artist - Some Title 160 BPM.mp3", "Some Title - Artist.mp3");
        assert_eq!(old, " ".repeat(13));
        assert!(new.is_empty());

        let (old, new) = stacked_indents("01 - Artist - Title [FREE DL].mp3", "01 - Artist - Title.mp3");
        assert!(old.is_empty());
        assert!(new.is_empty());
    }

    #[test]
    fn test_stacked_diff_counts_characters() {
        let (old, new) = stacked_indents("Ég - Sigur Rós.mp3", "Sigur Rós - Ég.mp3");
        assert!(old.is_empty());
        assert_eq!(new, " ".repeat(5));

        let (old, new) = stacked_indents("Jónsi Birgisson - Sigur Rós - Live.mp3", "Sigur Rós - Live.mp3");
        assert!(old.is_empty());
        assert_eq!(new, " ".repeat(18));
    }

    #[test]
    fn test_stacked_diff_without_shared_segment() {
        let (old, new) = stacked_indents("abc.mp3", "xyz.mp3");
        assert!(old.is_empty());
        assert!(new.is_empty());
    }
}
