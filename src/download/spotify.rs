//! Spotify downloads through `spotdl`.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::ValueEnum;

use crate::download::runner::{CommandRunner, ExternalCommand};
use crate::download::summary::DownloadSummary;

pub const PROGRAM: &str = "spotdl";
pub const PLATFORM: &str = "Spotify";

/// Output file name template understood by `spotdl`.
pub const OUTPUT_TEMPLATE: &str = "{artist} - {title}.{ext}";

/// Pause between consecutive downloads in [`fetch_many`].
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(1500);

/// Environment variables used for Spotify OAuth with `--user-auth`.
pub const OAUTH_ENV_VARS: [&str; 3] = ["SPOTIPY_CLIENT_ID", "SPOTIPY_CLIENT_SECRET", "SPOTIPY_REDIRECT_URI"];

const SPOTIFY_HOST: &str = "open.spotify.com";
const SPOTIFY_URI_PREFIX: &str = "spotify:";

/// Options passed to `spotdl download`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotOptions {
    pub audio_format: String,
    pub quality: String,
    pub lyrics: bool,
    pub playlist_numbering: bool,
    pub user_auth: bool,
}

/// Search type prefix for queries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchType {
    #[default]
    Track,
    Album,
    Playlist,
    Artist,
}

impl Default for SpotOptions {
    fn default() -> Self {
        Self {
            audio_format: "mp3".to_string(),
            quality: "320k".to_string(),
            lyrics: false,
            playlist_numbering: true,
            user_auth: false,
        }
    }
}

impl SearchType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Playlist => "playlist",
            Self::Artist => "artist",
        }
    }
}

/// Check for a Spotify web URL or `spotify:` URI.
#[must_use]
pub fn validate_spotify_url(url: &str) -> bool {
    url.contains(SPOTIFY_HOST) || url.starts_with(SPOTIFY_URI_PREFIX)
}

/// Convert to a clean `https://open.spotify.com/<type>/<id>` form.
///
/// `spotify:<type>:<id>` URIs are converted, web URLs lose their query and fragment.
/// Anything else is returned unchanged.
///
/// ```rust
/// use cloudbuccaneer::download::spotify::normalize_spotify_url;
///
/// assert_eq!(
///     normalize_spotify_url("spotify:track:abc123"),
///     "https://open.spotify.com/track/abc123"
/// );
/// assert_eq!(
///     normalize_spotify_url("https://open.spotify.com/playlist/xyz?si=42#top"),
///     "https://open.spotify.com/playlist/xyz"
/// );
/// ```
#[must_use]
pub fn normalize_spotify_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix(SPOTIFY_URI_PREFIX) {
        let mut parts = rest.split(':');
        if let (Some(kind), Some(id)) = (parts.next(), parts.next()) {
            return format!("https://{SPOTIFY_HOST}/{kind}/{id}");
        }
    }

    if let Some((scheme, remainder)) = url.split_once("://") {
        let (authority, _) = remainder.split_once('/').unwrap_or((remainder, ""));
        if authority.contains(SPOTIFY_HOST) {
            let end = remainder.find(['?', '#']).unwrap_or(remainder.len());
            return format!("{scheme}://{}", &remainder[..end]);
        }
    }

    url.to_string()
}

/// `kind:query` for anything but plain track searches.
#[must_use]
pub fn search_query(query: &str, kind: SearchType) -> String {
    match kind {
        SearchType::Track => query.to_string(),
        _ => format!("{}:{query}", kind.name()),
    }
}

/// OAuth environment variables that are not set or empty.
#[must_use]
pub fn missing_oauth_vars() -> Vec<&'static str> {
    OAUTH_ENV_VARS
        .into_iter()
        .filter(|name| std::env::var_os(name).is_none_or(|value| value.is_empty()))
        .collect()
}

/// Build the download command.
///
/// Accepts a URL or a search query.
#[must_use]
pub fn fetch_command(target: &str, out_template: &str, options: &SpotOptions) -> ExternalCommand {
    ExternalCommand::new(PROGRAM)
        .args_if(options.user_auth, ["--user-auth"])
        .args(["download", target])
        .args(["--format", options.audio_format.as_str()])
        .args(["--bitrate", options.quality.as_str()])
        .args(["--output", out_template])
        .args_if(options.lyrics, ["--lyrics", "genius", "musixmatch"])
        .args_if(options.playlist_numbering, ["--playlist-numbering"])
}

/// Download a Spotify track, album or playlist and return the exit code of `spotdl`.
///
/// Invalid URLs are rejected with exit code 2 without running anything.
///
/// # Errors
/// Returns an error if `spotdl` can not be started.
pub fn fetch(runner: &impl CommandRunner, url: &str, out_template: &str, options: &SpotOptions) -> Result<i32> {
    if !validate_spotify_url(url) {
        crate::print_error!("Not a Spotify URL: {url}");
        return Ok(2);
    }
    run_download(runner, &normalize_spotify_url(url), out_template, options)
}

/// Download the first match of a search query and return the exit code of `spotdl`.
///
/// # Errors
/// Returns an error if `spotdl` can not be started.
pub fn fetch_search(
    runner: &impl CommandRunner,
    query: &str,
    kind: SearchType,
    out_template: &str,
    options: &SpotOptions,
) -> Result<i32> {
    run_download(runner, &search_query(query, kind), out_template, options)
}

/// Download several URLs with a pause between them.
///
/// # Errors
/// Returns an error if `spotdl` can not be started.
pub fn fetch_many(
    runner: &impl CommandRunner,
    urls: &[String],
    out_template: &str,
    options: &SpotOptions,
    throttle: Duration,
    dry_run: bool,
) -> Result<(DownloadSummary, i32)> {
    let mut summary = DownloadSummary::new(PLATFORM);
    summary.format_info = Some(format!("{} @ {}", options.audio_format, options.quality));

    if dry_run {
        for url in urls {
            println!("[DRY] would fetch spotify: {}", normalize_spotify_url(url));
        }
        return Ok((summary, 0));
    }

    let mut exit_code = 0;
    for (index, url) in urls.iter().enumerate() {
        let code = fetch(runner, url, out_template, options)?;
        summary.record(url, code);
        if code != 0 {
            exit_code = code;
        }
        if index + 1 < urls.len() && !throttle.is_zero() {
            thread::sleep(throttle);
        }
    }
    Ok((summary, exit_code))
}

fn run_download(runner: &impl CommandRunner, target: &str, out_template: &str, options: &SpotOptions) -> Result<i32> {
    if options.user_auth {
        warn_if_missing_oauth_vars();
    }
    runner.run(&fetch_command(target, out_template, options))
}

fn warn_if_missing_oauth_vars() {
    let missing = missing_oauth_vars();
    if !missing.is_empty() {
        crate::print_warning!(
            "Missing environment variables for Spotify OAuth: {}\n\
             You will be asked to log in. Set them to skip the prompt, for example:\n  \
             export SPOTIPY_CLIENT_ID=...\n  \
             export SPOTIPY_CLIENT_SECRET=...\n  \
             export SPOTIPY_REDIRECT_URI=http://localhost:8888/callback",
            missing.join(", ")
        );
    }
}
