mod config;
mod fetch;
mod rename;
mod sweep;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use cloudbuccaneer::config::UserConfig;
use cloudbuccaneer::download::SystemRunner;
use cloudbuccaneer::download::soundcloud::{SearchKind, UserSection};
use cloudbuccaneer::download::spotify::SearchType;

use crate::config::{RenameConfig, SoundCloudConfig, SpotifyConfig};

#[derive(Parser)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Fetch and fix SoundCloud and Spotify downloads")]
pub(crate) struct Args {
    #[command(subcommand)]
    command: Option<CbCommand>,

    /// Create shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
pub(crate) enum CbCommand {
    /// Clean file names: strip junk, guess artist and title, keep track number
    Rename(RenameArgs),

    /// Remove `*.1.mp3` duplicates
    Dedupe {
        /// Root directory
        #[arg(value_hint = clap::ValueHint::DirPath)]
        root: PathBuf,

        /// Delete files instead of only listing them
        #[arg(long)]
        apply: bool,
    },

    /// Remove leftover thumbnails and partial downloads
    Clean {
        /// Folder to sweep
        #[arg(value_hint = clap::ValueHint::DirPath)]
        folder: PathBuf,

        /// Keep jpg, jpeg and png files
        #[arg(long)]
        no_images: bool,

        /// Keep part and temp files
        #[arg(long)]
        no_parts: bool,

        /// Keep webp thumbnails
        #[arg(long)]
        no_webp: bool,

        /// Only print what would be removed
        #[arg(long)]
        dry: bool,
    },

    /// Download a track, playlist or profile page with yt-dlp
    Fetch {
        url: String,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Download one section of a SoundCloud profile
    FetchUser {
        /// Profile URL or handle
        user: String,

        /// Profile section
        #[arg(long, value_enum, default_value_t = UserSection::Uploads)]
        kind: UserSection,

        /// Only take the most recent N items
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// List and download uploads, reposts, likes and sets of a SoundCloud profile
    ClusterUser {
        /// Profile URL or handle
        user: String,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Search SoundCloud and download the results
    Search {
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        max: usize,

        /// Result type
        #[arg(long, value_enum, default_value_t = SearchKind::Tracks)]
        kind: SearchKind,

        /// Group results by uploader into separate directories
        #[arg(long)]
        cluster: bool,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Download a Spotify track, album or playlist with spotdl
    FetchSpotify {
        /// One or more track, album, playlist or artist URLs
        #[arg(required = true, num_args = 1..)]
        urls: Vec<String>,

        #[command(flatten)]
        spotify: SpotifyArgs,

        /// Download lyrics
        #[arg(long, overrides_with = "no_lyrics")]
        lyrics: bool,

        /// Skip lyrics
        #[arg(long, overrides_with = "lyrics")]
        no_lyrics: bool,
    },

    /// Search Spotify and download the first match
    SearchSpotify {
        query: String,

        /// Search type
        #[arg(long = "type", value_enum, default_value_t = SearchType::Track)]
        search_type: SearchType,

        #[command(flatten)]
        spotify: SpotifyArgs,
    },
}

#[derive(clap::Args)]
pub(crate) struct RenameArgs {
    /// Folder to clean
    #[arg(value_hint = clap::ValueHint::DirPath)]
    folder: PathBuf,

    /// Fold names to ASCII
    #[arg(long, overrides_with = "no_ascii")]
    ascii: bool,

    /// Keep non-ASCII characters
    #[arg(long, overrides_with = "ascii")]
    no_ascii: bool,

    /// Keep the leading track number
    #[arg(long, overrides_with = "no_keep_track")]
    keep_track: bool,

    /// Drop the leading track number
    #[arg(long, overrides_with = "keep_track")]
    no_keep_track: bool,

    /// Move same-stem cover images along with the audio file
    #[arg(long)]
    move_covers: bool,

    /// Rename files instead of only printing the plan
    #[arg(long)]
    apply: bool,

    /// Undo log file
    #[arg(long, value_name = "PATH", default_value = cloudbuccaneer::rename::DEFAULT_UNDO_FILE)]
    undo: PathBuf,
}

#[derive(clap::Args)]
pub(crate) struct DownloadArgs {
    /// Destination directory
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    dest: Option<PathBuf>,

    /// Skip tracks longer than this
    #[arg(long, value_name = "SECONDS")]
    max_seconds: Option<u64>,

    /// Only print what would be downloaded
    #[arg(long)]
    dry: bool,
}

#[derive(clap::Args)]
pub(crate) struct SpotifyArgs {
    /// Destination directory
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    dest: Option<PathBuf>,

    /// Audio bitrate, for example 320k
    #[arg(long)]
    quality: Option<String>,

    /// Audio format, for example mp3 or flac
    #[arg(long)]
    format: Option<String>,

    /// Only print what would be downloaded
    #[arg(long)]
    dry: bool,
}

/// Resolve a `--flag` / `--no-flag` pair. `None` when neither was given.
pub(crate) const fn flag_pair(enabled: bool, disabled: bool) -> Option<bool> {
    if enabled {
        Some(true)
    } else if disabled {
        Some(false)
    } else {
        None
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        return cloudbuccaneer::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let user_config = UserConfig::get_user_config()?;
    if args.verbose {
        println!("{user_config}");
    }

    let runner = SystemRunner::default();
    let exit_code = match command {
        CbCommand::Rename(rename_args) => {
            let config = RenameConfig::from_args(rename_args, &user_config.rename, args.verbose)?;
            rename::run(&config)?;
            0
        }
        CbCommand::Dedupe { root, apply } => {
            sweep::dedupe(&cloudbuccaneer::expand_tilde(&root), apply)?;
            0
        }
        CbCommand::Clean {
            folder,
            no_images,
            no_parts,
            no_webp,
            dry,
        } => {
            let targets = sweep::CleanTargets {
                images: !no_images,
                parts: !no_parts,
                webp: !no_webp,
            };
            sweep::clean(&cloudbuccaneer::expand_tilde(&folder), targets, dry)?;
            0
        }
        CbCommand::Fetch { url, download } => {
            let config = SoundCloudConfig::from_args(download, &user_config);
            fetch::fetch(&runner, &url, &config)?
        }
        CbCommand::FetchUser {
            user,
            kind,
            limit,
            download,
        } => {
            let config = SoundCloudConfig::from_args(download, &user_config);
            fetch::fetch_user(&runner, &user, kind, limit, &config)?
        }
        CbCommand::ClusterUser { user, download } => {
            let config = SoundCloudConfig::from_args(download, &user_config);
            fetch::cluster_user(&runner, &user, &config)?
        }
        CbCommand::Search {
            query,
            max,
            kind,
            cluster,
            download,
        } => {
            let config = SoundCloudConfig::from_args(download, &user_config);
            fetch::search(&runner, &query, kind, max, cluster, &config)?
        }
        CbCommand::FetchSpotify {
            urls,
            spotify,
            lyrics,
            no_lyrics,
        } => {
            let config = SpotifyConfig::from_args(spotify, flag_pair(lyrics, no_lyrics), &user_config.spotify);
            fetch::fetch_spotify(&SystemRunner::quiet(), &urls, &config)?
        }
        CbCommand::SearchSpotify {
            query,
            search_type,
            spotify,
        } => {
            let config = SpotifyConfig::from_args(spotify, None, &user_config.spotify);
            fetch::search_spotify(&SystemRunner::quiet(), &query, search_type, &config)?
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
