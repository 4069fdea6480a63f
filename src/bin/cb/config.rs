use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use cloudbuccaneer::colorize_bool;
use cloudbuccaneer::config::{RenameSection, SpotifySection, UserConfig};
use cloudbuccaneer::download::soundcloud::YtOptions;
use cloudbuccaneer::download::spotify::{self, SpotOptions};

use crate::{DownloadArgs, RenameArgs, SpotifyArgs, flag_pair};

/// Final rename config created from CLI arguments and user config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameConfig {
    pub(crate) root: PathBuf,
    pub(crate) ascii_only: bool,
    pub(crate) keep_track: bool,
    pub(crate) move_covers: bool,
    pub(crate) apply: bool,
    pub(crate) undo_path: PathBuf,
    pub(crate) verbose: bool,
}

/// Final yt-dlp config created from CLI arguments and user config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCloudConfig {
    pub(crate) destination: PathBuf,
    pub(crate) out_template: String,
    pub(crate) max_seconds: Option<u64>,
    pub(crate) dry_run: bool,
    pub(crate) options: YtOptions,
}

/// Final spotdl config created from CLI arguments and user config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyConfig {
    pub(crate) destination: PathBuf,
    pub(crate) dry_run: bool,
    /// Pause between downloads when several URLs are given.
    pub(crate) throttle: Duration,
    pub(crate) options: SpotOptions,
}

impl RenameConfig {
    /// Create config from given command line args and user config file.
    /// Toggles given on the command line win over the config file.
    pub fn from_args(args: RenameArgs, user_config: &RenameSection, verbose: bool) -> anyhow::Result<Self> {
        let root = cloudbuccaneer::resolve_input_path(Some(&args.folder))?;
        Ok(Self {
            root,
            ascii_only: flag_pair(args.ascii, args.no_ascii).unwrap_or(user_config.ascii),
            keep_track: flag_pair(args.keep_track, args.no_keep_track).unwrap_or(user_config.keep_track),
            move_covers: args.move_covers || user_config.move_covers,
            apply: args.apply,
            undo_path: cloudbuccaneer::expand_tilde(&args.undo),
            verbose,
        })
    }
}

impl SoundCloudConfig {
    pub fn from_args(args: DownloadArgs, user_config: &UserConfig) -> Self {
        let destination = args.dest.map_or_else(
            || user_config.download_dir.clone(),
            |dest| cloudbuccaneer::expand_tilde(&dest),
        );
        Self {
            destination,
            out_template: user_config.out_template.clone(),
            max_seconds: args.max_seconds,
            dry_run: args.dry,
            options: YtOptions::default(),
        }
    }

    /// Output template under the destination and the given subdirectories.
    pub fn template(&self, subdirectories: &[&str]) -> String {
        let mut path = self.destination.clone();
        for directory in subdirectories {
            path.push(directory);
        }
        cloudbuccaneer::path_to_string(&path.join(&self.out_template))
    }
}

impl SpotifyConfig {
    pub fn from_args(args: SpotifyArgs, lyrics: Option<bool>, user_config: &SpotifySection) -> Self {
        let destination = args.dest.map_or_else(
            || user_config.download_dir.clone(),
            |dest| cloudbuccaneer::expand_tilde(&dest),
        );
        Self {
            destination,
            dry_run: args.dry,
            throttle: spotify::DEFAULT_THROTTLE,
            options: SpotOptions {
                audio_format: args.format.unwrap_or_else(|| user_config.format.clone()),
                quality: args.quality.unwrap_or_else(|| user_config.quality.clone()),
                lyrics: lyrics.unwrap_or(user_config.lyrics),
                playlist_numbering: user_config.playlist_numbering,
                user_auth: user_config.user_auth,
            },
        }
    }

    pub fn template(&self) -> String {
        cloudbuccaneer::path_to_string(&self.destination.join(spotify::OUTPUT_TEMPLATE))
    }
}

impl fmt::Display for RenameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config:")?;
        writeln!(f, "  root:        {}", self.root.display())?;
        writeln!(f, "  ascii:       {}", colorize_bool(self.ascii_only))?;
        writeln!(f, "  keep track:  {}", colorize_bool(self.keep_track))?;
        writeln!(f, "  move covers: {}", colorize_bool(self.move_covers))?;
        writeln!(f, "  apply:       {}", colorize_bool(self.apply))?;
        write!(f, "  undo log:    {}", self.undo_path.display())
    }
}
