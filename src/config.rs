//! User configuration read from `~/.config/cloudbuccaneer.toml`.
//!
//! Every key is optional and falls back to its own default,
//! so a partial file only overrides what it names.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use serde::Deserialize;

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "CB_CONFIG";

/// Default yt-dlp output template, relative to the download directory.
pub const DEFAULT_OUT_TEMPLATE: &str =
    "%(playlist_title|Unknown Set)s/%(playlist_index|0)02d - %(title)s - %(artist|uploader)s.%(ext)s";

/// Path to the user config file.
///
/// Uses `$CB_CONFIG` when set, otherwise `$HOME/.config/cloudbuccaneer.toml`.
/// Returns `None` if neither is available.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        return Some(crate::expand_tilde(&PathBuf::from(path)));
    }
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Config from the user config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_out_template")]
    pub out_template: String,
    #[serde(default)]
    pub rename: RenameSection,
    #[serde(default)]
    pub spotify: SpotifySection,
}

/// `[rename]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenameSection {
    #[serde(default = "default_true")]
    pub ascii: bool,
    #[serde(default = "default_true")]
    pub keep_track: bool,
    #[serde(default)]
    pub move_covers: bool,
}

/// `[spotify]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpotifySection {
    #[serde(default = "default_spotify_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub lyrics: bool,
    #[serde(default = "default_true")]
    pub playlist_numbering: bool,
    #[serde(default)]
    pub user_auth: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            out_template: default_out_template(),
            rename: RenameSection::default(),
            spotify: SpotifySection::default(),
        }
    }
}

impl Default for RenameSection {
    fn default() -> Self {
        Self {
            ascii: true,
            keep_track: true,
            move_covers: false,
        }
    }
}

impl Default for SpotifySection {
    fn default() -> Self {
        Self {
            download_dir: default_spotify_dir(),
            quality: default_quality(),
            format: default_format(),
            lyrics: true,
            playlist_numbering: true,
            user_auth: false,
        }
    }
}

impl UserConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };
        Self::from_path(path)
    }

    /// Read config from the given file. A missing file gives the default config.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string. Directories starting with `~` are expanded.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<Self>(toml_str)
            .map(Self::expand_paths)
            .with_context(|| "Failed to parse config TOML")
    }

    fn expand_paths(mut self) -> Self {
        self.download_dir = crate::expand_tilde(&self.download_dir);
        self.spotify.download_dir = crate::expand_tilde(&self.spotify.download_dir);
        self
    }
}

impl fmt::Display for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "UserConfig:")?;
        writeln!(f, "  download_dir: {}", self.download_dir.display())?;
        writeln!(f, "  out_template: {}", self.out_template)?;
        writeln!(f, "  rename:")?;
        writeln!(f, "    ascii:       {}", crate::colorize_bool(self.rename.ascii))?;
        writeln!(f, "    keep_track:  {}", crate::colorize_bool(self.rename.keep_track))?;
        writeln!(f, "    move_covers: {}", crate::colorize_bool(self.rename.move_covers))?;
        writeln!(f, "  spotify:")?;
        writeln!(f, "    download_dir:       {}", self.spotify.download_dir.display())?;
        writeln!(f, "    quality:            {}", self.spotify.quality)?;
        writeln!(f, "    format:             {}", self.spotify.format)?;
        writeln!(f, "    lyrics:             {}", crate::colorize_bool(self.spotify.lyrics))?;
        writeln!(
            f,
            "    playlist_numbering: {}",
            crate::colorize_bool(self.spotify.playlist_numbering)
        )?;
        write!(f, "    user_auth:          {}", crate::colorize_bool(self.spotify.user_auth))
    }
}

const fn default_true() -> bool {
    true
}

fn default_download_dir() -> PathBuf {
    crate::expand_tilde(Path::new("~/Download/soundcloud"))
}

fn default_spotify_dir() -> PathBuf {
    crate::expand_tilde(Path::new("~/Download/spotify"))
}

fn default_out_template() -> String {
    DEFAULT_OUT_TEMPLATE.to_string()
}

fn default_quality() -> String {
    "320k".to_string()
}

fn default_format() -> String {
    "mp3".to_string()
}
