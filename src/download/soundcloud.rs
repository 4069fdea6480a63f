//! SoundCloud downloads through `yt-dlp`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;

use crate::download::runner::{CommandRunner, ExternalCommand};
use crate::download::summary::DownloadSummary;

pub const PROGRAM: &str = "yt-dlp";
pub const PLATFORM: &str = "SoundCloud";
const SOUNDCLOUD_ROOT: &str = "https://soundcloud.com/";
const DEFAULT_SEARCH_RESULTS: usize = 20;

/// Duration reported for items whose duration could not be parsed.
pub const UNKNOWN_DURATION: f64 = -1.0;

/// Audio and metadata options passed to `yt-dlp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YtOptions {
    pub audio_format: String,
    pub audio_quality: String,
    pub embed: bool,
    pub add_metadata: bool,
    pub write_thumbnail: bool,
    pub convert_thumbnails: bool,
    pub parse_metadata: bool,
}

/// Search result type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchKind {
    #[default]
    Tracks,
    Sets,
    Users,
}

/// Public sections of a user profile.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum UserSection {
    #[default]
    Uploads,
    Reposts,
    Likes,
    Sets,
}

impl Default for YtOptions {
    fn default() -> Self {
        Self {
            audio_format: "mp3".to_string(),
            audio_quality: "0".to_string(),
            embed: true,
            add_metadata: true,
            write_thumbnail: false,
            convert_thumbnails: true,
            parse_metadata: true,
        }
    }
}

impl SearchKind {
    /// Extra search term understood by the SoundCloud search extractor.
    #[must_use]
    pub const fn qualifier(self) -> &'static str {
        match self {
            Self::Tracks => "",
            Self::Sets => " type:playlists",
            Self::Users => " type:users",
        }
    }
}

impl UserSection {
    pub const ALL: [Self; 4] = [Self::Uploads, Self::Reposts, Self::Likes, Self::Sets];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uploads => "uploads",
            Self::Reposts => "reposts",
            Self::Likes => "likes",
            Self::Sets => "sets",
        }
    }

    /// Path segment after the profile root. Uploads live under `/tracks`.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Uploads => "tracks",
            Self::Reposts => "reposts",
            Self::Likes => "likes",
            Self::Sets => "sets",
        }
    }

    /// Full section URL for a normalized profile root.
    #[must_use]
    pub fn url(self, user_root: &str) -> String {
        format!("{}/{}", user_root.trim_end_matches('/'), self.path_segment())
    }
}

impl fmt::Display for UserSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for UserSection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.name() == s.trim().to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Invalid kind '{s}'. Use uploads|reposts|likes|sets"))
    }
}

/// Build the download command for one URL.
#[must_use]
pub fn fetch_command(url: &str, out_template: &str, options: &YtOptions) -> ExternalCommand {
    ExternalCommand::new(PROGRAM)
        .arg("-x")
        .args(["--audio-format", options.audio_format.as_str()])
        .args(["--audio-quality", options.audio_quality.as_str()])
        .args_if(options.embed, ["--embed-metadata", "--embed-thumbnail"])
        .args_if(options.add_metadata, ["--add-metadata"])
        .args_if(options.write_thumbnail, ["--write-thumbnail"])
        .args_if(options.convert_thumbnails, ["--convert-thumbnails", "jpg"])
        .args_if(
            options.parse_metadata,
            [
                "--parse-metadata",
                "%(uploader|uploader_id)s:%(artist)s",
                "--parse-metadata",
                "%(upload_date>%Y-%m-%d)s:%(date)s",
            ],
        )
        .args(["-o", out_template, url])
}

/// Download one URL and return the exit code of `yt-dlp`.
///
/// # Errors
/// Returns an error if `yt-dlp` can not be started.
pub fn fetch(runner: &impl CommandRunner, url: &str, out_template: &str, options: &YtOptions) -> Result<i32> {
    let code = runner.run(&fetch_command(url, out_template, options))?;
    if code == 0 {
        println!("{}", format!("✓ Downloaded {url}").green());
    } else {
        crate::print_error!("✗ Download failed with exit code {code}: {url}");
    }
    Ok(code)
}

/// Child item URLs of any collection page, such as a user section or a playlist.
///
/// # Errors
/// Returns an error if `yt-dlp` can not be started.
pub fn list_flat(runner: &impl CommandRunner, url: &str) -> Result<Vec<String>> {
    runner.lines(&ExternalCommand::new(PROGRAM).args(["--flat-playlist", "--print", "%(url)s", url]))
}

/// Duration in seconds for each URL, [`UNKNOWN_DURATION`] when it can not be parsed.
///
/// # Errors
/// Returns an error if `yt-dlp` can not be started.
pub fn duration_map(runner: &impl CommandRunner, urls: &[String]) -> Result<HashMap<String, f64>> {
    let mut durations = HashMap::with_capacity(urls.len());
    for url in urls {
        let lines = runner.lines(&ExternalCommand::new(PROGRAM).args([
            "--skip-download",
            "--print",
            "%(duration)s",
            url.as_str(),
        ]))?;
        let duration = lines
            .last()
            .and_then(|line| line.parse::<f64>().ok())
            .unwrap_or(UNKNOWN_DURATION);
        durations.insert(url.clone(), duration);
    }
    Ok(durations)
}

/// Keep URLs with a known duration strictly below `max_seconds`, in the original order.
#[must_use]
pub fn filter_by_duration(urls: &[String], durations: &HashMap<String, f64>, max_seconds: u64) -> Vec<String> {
    let limit = max_seconds as f64;
    urls.iter()
        .filter(|url| {
            let duration = durations.get(*url).copied().unwrap_or(0.0);
            duration > 0.0 && duration < limit
        })
        .cloned()
        .collect()
}

/// Search extractor query, for example `scsearch20:deep house type:playlists`.
///
/// A zero result count falls back to the default of 20.
#[must_use]
pub fn search_query(query: &str, kind: SearchKind, max_results: usize) -> String {
    format!("scsearch{}:{query}{}", result_count(max_results), kind.qualifier())
}

const fn result_count(max_results: usize) -> usize {
    if max_results == 0 {
        DEFAULT_SEARCH_RESULTS
    } else {
        max_results
    }
}

/// URLs of search results.
///
/// # Errors
/// Returns an error if `yt-dlp` can not be started.
pub fn search_urls(
    runner: &impl CommandRunner,
    query: &str,
    kind: SearchKind,
    max_results: usize,
) -> Result<Vec<String>> {
    let search = search_query(query, kind, max_results);
    let command = ExternalCommand::new(PROGRAM).args(["--flat-playlist", "--print", "%(url)s", search.as_str()]);
    let mut urls = runner.lines(&command)?;
    urls.truncate(result_count(max_results));
    Ok(urls)
}

/// `(url, uploader)` pairs of search results.
///
/// Lines without a tab separator are skipped.
///
/// # Errors
/// Returns an error if `yt-dlp` can not be started.
pub fn search_url_uploader_pairs(
    runner: &impl CommandRunner,
    query: &str,
    kind: SearchKind,
    max_results: usize,
) -> Result<Vec<(String, String)>> {
    let search = search_query(query, kind, max_results);
    let lines = runner.lines(&ExternalCommand::new(PROGRAM).args([
        "--flat-playlist",
        "--print",
        "%(url)s\t%(uploader_id|uploader)s",
        search.as_str(),
    ]))?;
    Ok(lines
        .iter()
        .filter_map(|line| line.split_once('\t'))
        .map(|(url, uploader)| (url.to_string(), uploader.to_string()))
        .collect())
}

/// Group `(url, uploader)` pairs by uploader, keeping first-seen order.
///
/// Empty uploader names are grouped under `unknown`.
#[must_use]
pub fn cluster_by_uploader(pairs: Vec<(String, String)>) -> Vec<(String, Vec<String>)> {
    let mut buckets: Vec<(String, Vec<String>)> = Vec::new();
    for (url, uploader) in pairs {
        let uploader = if uploader.trim().is_empty() {
            "unknown".to_string()
        } else {
            uploader
        };
        match buckets.iter_mut().find(|(name, _)| *name == uploader) {
            Some((_, urls)) => urls.push(url),
            None => buckets.push((uploader, vec![url])),
        }
    }
    buckets
}

/// Normalize a profile URL or bare handle to `https://soundcloud.com/<handle>`.
///
/// ```rust
/// use cloudbuccaneer::download::soundcloud::normalize_user_root;
///
/// assert_eq!(normalize_user_root("someone"), "https://soundcloud.com/someone");
/// assert_eq!(
///     normalize_user_root("https://soundcloud.com/someone/"),
///     "https://soundcloud.com/someone"
/// );
/// ```
#[must_use]
pub fn normalize_user_root(user_or_url: &str) -> String {
    let user = user_or_url.trim();
    if user.starts_with("http") {
        let handle = user.rsplit("soundcloud.com/").next().unwrap_or(user);
        format!("{SOUNDCLOUD_ROOT}{}", handle.trim_matches('/'))
    } else {
        format!("{SOUNDCLOUD_ROOT}{}", user.trim_matches('/'))
    }
}

/// Download several URLs one after another.
///
/// With `max_seconds`, durations are looked up first and long or unknown items are dropped.
/// With `dry_run`, the remaining URLs are only printed.
/// Returns the summary and the last nonzero exit code, or zero.
///
/// # Errors
/// Returns an error if `yt-dlp` can not be started.
pub fn fetch_many(
    runner: &impl CommandRunner,
    urls: &[String],
    out_template: &str,
    options: &YtOptions,
    max_seconds: Option<u64>,
    dry_run: bool,
) -> Result<(DownloadSummary, i32)> {
    let requested = urls.len();
    let urls = match max_seconds {
        Some(limit) => {
            println!("Filtering tracks by duration (<{limit}s)...");
            let durations = duration_map(runner, urls)?;
            let kept = filter_by_duration(urls, &durations, limit);
            if kept.len() < requested {
                println!("Filtered: {}/{requested} tracks within duration limit", kept.len());
            }
            kept
        }
        None => urls.to_vec(),
    };

    let mut summary = DownloadSummary::new(PLATFORM);
    summary.destination = Path::new(out_template).parent().map(Path::to_path_buf);
    summary.format_info = Some(format!("{} @ quality {}", options.audio_format, options.audio_quality));

    if urls.is_empty() {
        println!("No tracks to download after filtering");
        return Ok((summary, 0));
    }

    if dry_run {
        println!("[DRY] Would download {} {PLATFORM} tracks:", urls.len());
        for (index, url) in urls.iter().enumerate() {
            println!("  [{}/{}] {url}", index + 1, urls.len());
        }
        return Ok((summary, 0));
    }

    let mut exit_code = 0;
    for (index, url) in urls.iter().enumerate() {
        println!("{}", format!("[{}/{}] Downloading...", index + 1, urls.len()).bold());
        let code = fetch(runner, url, out_template, options)?;
        summary.record(url, code);
        if code != 0 {
            exit_code = code;
        }
    }

    summary.additional_info = vec![
        ("Metadata embedding".to_string(), enabled(options.embed)),
        ("Thumbnails".to_string(), enabled(options.write_thumbnail)),
        ("Metadata parsing".to_string(), enabled(options.parse_metadata)),
    ];
    if requested != urls.len() {
        summary
            .additional_info
            .push(("Original tracks requested".to_string(), requested.to_string()));
    }
    Ok((summary, exit_code))
}

fn enabled(value: bool) -> String {
    let text = if value { "enabled" } else { "disabled" };
    text.to_string()
}
