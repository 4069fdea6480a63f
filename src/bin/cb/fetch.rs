//! Download subcommands. Each returns the exit code of the download engine.

use std::fs;

use anyhow::{Context, Result};
use colored::Colorize;

use cloudbuccaneer::download::soundcloud::{self, SearchKind, UserSection};
use cloudbuccaneer::download::spotify::{self, SearchType};
use cloudbuccaneer::download::{CommandRunner, DownloadSummary};

use crate::config::{SoundCloudConfig, SpotifyConfig};

/// Number of items listed per bucket in dry runs.
const PREVIEW_ITEMS: usize = 10;

/// Download a track, set or any other yt-dlp supported page.
///
/// With a duration limit the page is expanded into single tracks first.
pub fn fetch(runner: &impl CommandRunner, url: &str, config: &SoundCloudConfig) -> Result<i32> {
    let template = config.template(&[]);
    if let Some(limit) = config.max_seconds {
        let urls = soundcloud::list_flat(runner, url)?;
        ensure_destination(config.dry_run, &config.destination)?;
        let (summary, code) =
            soundcloud::fetch_many(runner, &urls, &template, &config.options, Some(limit), config.dry_run)?;
        print_summary(&summary, config.dry_run);
        return Ok(code);
    }

    if config.dry_run {
        println!("{} would fetch: {url}", "[DRY]".yellow());
        return Ok(0);
    }
    ensure_destination(false, &config.destination)?;
    soundcloud::fetch(runner, url, &template, &config.options)
}

/// Download one section of a user profile into `<dest>/<handle>/<section>`.
pub fn fetch_user(
    runner: &impl CommandRunner,
    user: &str,
    section: UserSection,
    limit: Option<usize>,
    config: &SoundCloudConfig,
) -> Result<i32> {
    let root = soundcloud::normalize_user_root(user);
    let handle = root.rsplit('/').next().unwrap_or_default().to_string();

    let mut urls = soundcloud::list_flat(runner, &section.url(&root))?;
    if let Some(limit) = limit.filter(|limit| *limit > 0) {
        urls.truncate(limit);
    }
    println!("{section}: {} item(s)", urls.len());

    ensure_destination(config.dry_run, &config.destination)?;
    let template = config.template(&[handle.as_str(), section.name()]);
    let (summary, code) =
        soundcloud::fetch_many(runner, &urls, &template, &config.options, config.max_seconds, config.dry_run)?;
    print_summary(&summary, config.dry_run);
    Ok(code)
}

/// List every section of a user profile and download each into `<dest>/<handle>/<section>`.
///
/// A dry run only prints the first items of each section.
pub fn cluster_user(runner: &impl CommandRunner, user: &str, config: &SoundCloudConfig) -> Result<i32> {
    let root = soundcloud::normalize_user_root(user);
    let handle = root.rsplit('/').next().unwrap_or_default().to_string();

    let mut total = 0;
    let mut exit_code = 0;
    for section in UserSection::ALL {
        let section_url = section.url(&root);
        let urls = soundcloud::list_flat(runner, &section_url)?;
        total += urls.len();
        println!("{} {} item(s) :: {section_url}", format!("[{section}]").bold(), urls.len());

        if config.dry_run {
            print_preview(&urls);
            continue;
        }
        if urls.is_empty() {
            continue;
        }
        ensure_destination(false, &config.destination)?;
        let template = config.template(&[handle.as_str(), section.name()]);
        let (summary, code) =
            soundcloud::fetch_many(runner, &urls, &template, &config.options, config.max_seconds, false)?;
        print_summary(&summary, false);
        if code != 0 {
            exit_code = code;
        }
    }
    println!("\nTotal items across sections: {total}");
    Ok(exit_code)
}

/// Search SoundCloud and download the results, optionally grouped by uploader.
///
/// No results gives exit code 1.
pub fn search(
    runner: &impl CommandRunner,
    query: &str,
    kind: SearchKind,
    max_results: usize,
    cluster: bool,
    config: &SoundCloudConfig,
) -> Result<i32> {
    if cluster {
        return search_clustered(runner, query, kind, max_results, config);
    }

    let urls = soundcloud::search_urls(runner, query, kind, max_results)?;
    if urls.is_empty() {
        println!("No results.");
        return Ok(1);
    }
    println!("Found {} result(s).", urls.len());

    ensure_destination(config.dry_run, &config.destination)?;
    let (summary, code) = soundcloud::fetch_many(
        runner,
        &urls,
        &config.template(&[]),
        &config.options,
        config.max_seconds,
        config.dry_run,
    )?;
    print_summary(&summary, config.dry_run);
    Ok(code)
}

fn search_clustered(
    runner: &impl CommandRunner,
    query: &str,
    kind: SearchKind,
    max_results: usize,
    config: &SoundCloudConfig,
) -> Result<i32> {
    let pairs = soundcloud::search_url_uploader_pairs(runner, query, kind, max_results)?;
    if pairs.is_empty() {
        println!("No results.");
        return Ok(1);
    }
    let buckets = soundcloud::cluster_by_uploader(pairs);
    let total: usize = buckets.iter().map(|(_, urls)| urls.len()).sum();
    println!("Found {total} result(s) in {} bucket(s).", buckets.len());

    let mut exit_code = 0;
    for (uploader, urls) in &buckets {
        println!("\n{} {} item(s)", format!("[uploader: {uploader}]").bold(), urls.len());
        if config.dry_run {
            print_preview(urls);
            continue;
        }
        ensure_destination(false, &config.destination)?;
        let template = config.template(&[uploader.as_str()]);
        let (summary, code) =
            soundcloud::fetch_many(runner, urls, &template, &config.options, config.max_seconds, false)?;
        print_summary(&summary, false);
        if code != 0 {
            exit_code = code;
        }
    }
    Ok(exit_code)
}

/// Download one or more Spotify URLs.
///
/// Invalid URLs give exit code 1 without running spotdl.
/// Several URLs are downloaded one by one with a pause in between.
pub fn fetch_spotify(runner: &impl CommandRunner, urls: &[String], config: &SpotifyConfig) -> Result<i32> {
    let invalid: Vec<&String> = urls.iter().filter(|url| !spotify::validate_spotify_url(url)).collect();
    if !invalid.is_empty() {
        for url in invalid {
            cloudbuccaneer::print_error!("Invalid Spotify URL: {url}");
        }
        return Ok(1);
    }
    let urls: Vec<String> = urls.iter().map(|url| spotify::normalize_spotify_url(url)).collect();

    if let [url] = urls.as_slice() {
        return fetch_spotify_single(runner, url, config);
    }

    if config.dry_run {
        println!("{} destination: {}", "[DRY]".yellow(), config.destination.display());
    } else {
        ensure_destination(false, &config.destination)?;
    }
    let (mut summary, code) = spotify::fetch_many(
        runner,
        &urls,
        &config.template(),
        &config.options,
        config.throttle,
        config.dry_run,
    )?;
    summary.destination = Some(config.destination.clone());
    print_summary(&summary, config.dry_run);
    Ok(code)
}

fn fetch_spotify_single(runner: &impl CommandRunner, url: &str, config: &SpotifyConfig) -> Result<i32> {
    if config.dry_run {
        println!("{} would fetch spotify: {url}", "[DRY]".yellow());
        println!("{} destination: {}", "[DRY]".yellow(), config.destination.display());
        println!(
            "{} quality: {}, format: {}",
            "[DRY]".yellow(),
            config.options.quality,
            config.options.audio_format
        );
        return Ok(0);
    }

    ensure_destination(false, &config.destination)?;
    let code = spotify::fetch(runner, url, &config.template(), &config.options)?;
    print_quick_summary(url, code);
    Ok(code)
}

/// Download the best match for a Spotify search.
pub fn search_spotify(
    runner: &impl CommandRunner,
    query: &str,
    search_type: SearchType,
    config: &SpotifyConfig,
) -> Result<i32> {
    let search = spotify::search_query(query, search_type);
    if config.dry_run {
        println!("{} would search spotify for: {search}", "[DRY]".yellow());
        println!("{} destination: {}", "[DRY]".yellow(), config.destination.display());
        return Ok(0);
    }

    ensure_destination(false, &config.destination)?;
    let code = spotify::fetch_search(runner, query, search_type, &config.template(), &config.options)?;
    print_quick_summary(&search, code);
    Ok(code)
}

fn ensure_destination(dry_run: bool, destination: &std::path::Path) -> Result<()> {
    if dry_run {
        return Ok(());
    }
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create destination directory: {}", destination.display()))
}

fn print_preview(urls: &[String]) {
    for url in urls.iter().take(PREVIEW_ITEMS) {
        println!("   {url}");
    }
    if urls.len() > PREVIEW_ITEMS {
        println!("   ...");
    }
}

fn print_summary(summary: &DownloadSummary, dry_run: bool) {
    if !dry_run && summary.total > 0 {
        println!("\n{summary}\n");
    }
}

fn print_quick_summary(item: &str, exit_code: i32) {
    let mut summary = DownloadSummary::new(spotify::PLATFORM);
    summary.record(item, exit_code);
    if exit_code == 0 {
        println!("{}", summary.quick_line().green());
    } else {
        println!("{}", summary.quick_line().red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::time::Duration;

    use cloudbuccaneer::download::ExternalCommand;
    use cloudbuccaneer::download::soundcloud::YtOptions;
    use cloudbuccaneer::download::spotify::SpotOptions;
    use tempfile::TempDir;

    /// Returns the same lines for every query and records all commands.
    #[derive(Default)]
    struct RecordingRunner {
        lines: Vec<String>,
        executed: RefCell<Vec<ExternalCommand>>,
        queried: RefCell<Vec<ExternalCommand>>,
    }

    impl RecordingRunner {
        fn with_lines(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(ToString::to_string).collect(),
                ..Self::default()
            }
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, command: &ExternalCommand) -> Result<i32> {
            self.executed.borrow_mut().push(command.clone());
            Ok(0)
        }

        fn lines(&self, command: &ExternalCommand) -> Result<Vec<String>> {
            self.queried.borrow_mut().push(command.clone());
            Ok(self.lines.clone())
        }
    }

    fn soundcloud_config(destination: PathBuf, dry_run: bool) -> SoundCloudConfig {
        SoundCloudConfig {
            destination,
            out_template: "%(title)s.%(ext)s".to_string(),
            max_seconds: None,
            dry_run,
            options: YtOptions::default(),
        }
    }

    fn spotify_config(destination: PathBuf, dry_run: bool) -> SpotifyConfig {
        SpotifyConfig {
            destination,
            dry_run,
            throttle: Duration::ZERO,
            options: SpotOptions::default(),
        }
    }

    #[test]
    fn dry_fetch_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out");
        let runner = RecordingRunner::default();

        let code = fetch(&runner, "https://soundcloud.com/a/b", &soundcloud_config(destination.clone(), true)).unwrap();
        assert_eq!(code, 0);
        assert!(runner.executed.borrow().is_empty());
        assert!(!destination.exists());
    }

    #[test]
    fn fetch_downloads_into_destination() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out");
        let runner = RecordingRunner::default();

        fetch(&runner, "https://soundcloud.com/a/b", &soundcloud_config(destination.clone(), false)).unwrap();
        assert!(destination.is_dir());
        let executed = runner.executed.borrow();
        assert_eq!(executed.len(), 1);
        let template = cloudbuccaneer::path_to_string(&destination.join("%(title)s.%(ext)s"));
        assert!(executed[0].args.contains(&template));
    }

    #[test]
    fn fetch_user_uses_section_directory() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::with_lines(&["u1", "u2", "u3"]);
        let config = soundcloud_config(dir.path().to_path_buf(), false);

        fetch_user(&runner, "someone", UserSection::Likes, Some(2), &config).unwrap();
        assert_eq!(
            runner.queried.borrow()[0].args.last().map(String::as_str),
            Some("https://soundcloud.com/someone/likes")
        );
        let executed = runner.executed.borrow();
        assert_eq!(executed.len(), 2);
        let template = cloudbuccaneer::path_to_string(&dir.path().join("someone/likes/%(title)s.%(ext)s"));
        assert!(executed[0].args.contains(&template));
    }

    #[test]
    fn search_without_results_fails() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let config = soundcloud_config(dir.path().to_path_buf(), false);
        assert_eq!(search(&runner, "q", SearchKind::Tracks, 5, false, &config).unwrap(), 1);
        assert_eq!(search(&runner, "q", SearchKind::Tracks, 5, true, &config).unwrap(), 1);
    }

    #[test]
    fn clustered_search_uses_uploader_directories() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::with_lines(&["u1\talice", "u2\tbob"]);
        let config = soundcloud_config(dir.path().to_path_buf(), false);

        search(&runner, "q", SearchKind::Tracks, 5, true, &config).unwrap();
        let executed = runner.executed.borrow();
        assert_eq!(executed.len(), 2);
        let bob = cloudbuccaneer::path_to_string(&dir.path().join("bob/%(title)s.%(ext)s"));
        assert!(executed[1].args.contains(&bob));
    }

    #[test]
    fn invalid_spotify_url_fails_without_running() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let urls = ["https://open.spotify.com/track/abc".to_string(), "https://example.com".to_string()];
        let code = fetch_spotify(&runner, &urls, &spotify_config(dir.path().to_path_buf(), false)).unwrap();
        assert_eq!(code, 1);
        assert!(runner.executed.borrow().is_empty());
    }

    #[test]
    fn spotify_fetch_runs_spotdl() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        fetch_spotify(
            &runner,
            &["https://open.spotify.com/track/abc?si=1".to_string()],
            &spotify_config(dir.path().to_path_buf(), false),
        )
        .unwrap();
        let executed = runner.executed.borrow();
        assert_eq!(executed[0].program, "spotdl");
        assert!(executed[0].args.contains(&"https://open.spotify.com/track/abc".to_string()));
    }

    #[test]
    fn several_spotify_urls_are_fetched_in_order() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let urls = [
            "spotify:album:one".to_string(),
            "https://open.spotify.com/playlist/two#top".to_string(),
        ];

        let code = fetch_spotify(&runner, &urls, &spotify_config(dir.path().to_path_buf(), false)).unwrap();
        assert_eq!(code, 0);
        let executed = runner.executed.borrow();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].args.contains(&"https://open.spotify.com/album/one".to_string()));
        assert!(executed[1].args.contains(&"https://open.spotify.com/playlist/two".to_string()));
    }

    #[test]
    fn several_spotify_urls_dry_run_downloads_nothing() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out");
        let runner = RecordingRunner::default();
        let urls = ["spotify:track:a".to_string(), "spotify:track:b".to_string()];

        assert_eq!(fetch_spotify(&runner, &urls, &spotify_config(destination.clone(), true)).unwrap(), 0);
        assert!(runner.executed.borrow().is_empty());
        assert!(!destination.exists());
    }

    #[test]
    fn cluster_user_downloads_every_section() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::with_lines(&["u1", "u2"]);
        let config = soundcloud_config(dir.path().to_path_buf(), false);

        let code = cluster_user(&runner, "https://soundcloud.com/someone/", &config).unwrap();
        assert_eq!(code, 0);

        let queried: Vec<String> = runner
            .queried
            .borrow()
            .iter()
            .filter_map(|command| command.args.last().cloned())
            .collect();
        assert_eq!(
            queried,
            vec![
                "https://soundcloud.com/someone/tracks",
                "https://soundcloud.com/someone/reposts",
                "https://soundcloud.com/someone/likes",
                "https://soundcloud.com/someone/sets",
            ]
        );

        let executed = runner.executed.borrow();
        assert_eq!(executed.len(), 8);
        for (index, section) in ["uploads", "reposts", "likes", "sets"].iter().enumerate() {
            let template =
                cloudbuccaneer::path_to_string(&dir.path().join(format!("someone/{section}/%(title)s.%(ext)s")));
            assert!(executed[index * 2].args.contains(&template), "missing {template}");
        }
    }

    #[test]
    fn cluster_user_dry_run_only_lists() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out");
        let runner = RecordingRunner::with_lines(&["u1"]);

        let code = cluster_user(&runner, "someone", &soundcloud_config(destination.clone(), true)).unwrap();
        assert_eq!(code, 0);
        assert_eq!(runner.queried.borrow().len(), 4);
        assert!(runner.executed.borrow().is_empty());
        assert!(!destination.exists());
    }

    #[test]
    fn spotify_search_prefixes_type() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        search_spotify(
            &runner,
            "discovery",
            SearchType::Album,
            &spotify_config(dir.path().to_path_buf(), false),
        )
        .unwrap();
        assert!(runner.executed.borrow()[0].args.contains(&"album:discovery".to_string()));
    }
}
