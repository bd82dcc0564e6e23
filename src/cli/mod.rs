//! Command-line interface for podvault.
//!
//! Provides commands for fetching feeds, downloading episodes, and
//! inspecting the stored library.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{fetch_feed, parse_feed, HttpDownloader};
use crate::config::{self, ResolvedConfig};
use crate::core::{total_size, PodcastManager};
use crate::domain::{Episode, Podcast};
use crate::storage::Persistence;

/// podvault - GUID-keyed podcast library
#[derive(Parser, Debug)]
#[command(name = "podvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a feed, store it, and download new episodes
    Fetch {
        /// URL of the podcast RSS feed
        rss_url: String,

        /// List episodes that would be downloaded, without storing or downloading
        #[arg(long)]
        list_only: bool,

        /// Download every episode whose audio is missing, not only new ones
        #[arg(long)]
        missing: bool,
    },

    /// List stored podcasts
    Podcasts,

    /// List stored episodes of a podcast
    Episodes {
        /// Podcast ID
        podcast_id: String,
    },

    /// Download episodes of a stored podcast whose audio is missing
    Download {
        /// Podcast ID
        podcast_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Fetch {
                rss_url,
                list_only,
                missing,
            } => fetch(&rss_url, list_only, missing).await,
            Commands::Podcasts => list_podcasts(),
            Commands::Episodes { podcast_id } => list_episodes(&podcast_id),
            Commands::Download { podcast_id } => download_missing(&podcast_id).await,
            Commands::Config => show_config(),
        }
    }
}

fn open_persistence(config: &ResolvedConfig) -> Arc<Persistence> {
    Arc::new(Persistence::new(&config.data_dir))
}

/// Fetch a feed, commit it, and download new (or missing) episodes
async fn fetch(rss_url: &str, list_only: bool, missing: bool) -> Result<()> {
    let config = config::config()?;
    let persistence = open_persistence(config);
    println!("Using data directory: {}", config.data_dir.display());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;
    let content = fetch_feed(&client, rss_url)
        .await
        .with_context(|| format!("Could not download feed: {}", rss_url))?;
    let podcast = parse_feed(rss_url, &content)
        .with_context(|| format!("Could not parse feed: {}", rss_url))?;

    println!("Podcast: {} ({})", podcast.title, podcast.id);

    // Committing stores every episode, so targets are chosen first
    let targets = plan_targets(&persistence, &podcast, missing);
    if missing {
        println!("Found {} episodes without audio", targets.len());
    } else {
        println!("Found {} new episodes", targets.len());
    }

    if !targets.is_empty() {
        print_download_plan(&targets);
    }

    if list_only {
        return Ok(());
    }

    let downloader = Arc::new(HttpDownloader::new(config.downloader_config())?);
    let mut manager = PodcastManager::commit(podcast, Arc::clone(&persistence), downloader);
    if !manager.cache_feed(&content) {
        eprintln!("Warning: could not cache feed content");
    }

    if targets.is_empty() {
        println!("No episodes to download");
        return Ok(());
    }

    run_downloads(&mut manager, &targets).await
}

/// Episodes a fetch would download. Reads storage only.
fn plan_targets(persistence: &Persistence, podcast: &Podcast, missing: bool) -> Vec<Episode> {
    if missing {
        podcast
            .episodes
            .iter()
            .filter(|episode| !persistence.audio_exists(episode))
            .cloned()
            .collect()
    } else {
        persistence.episodes().filter_new(&podcast.episodes)
    }
}

/// Reopen a stored podcast and download episodes whose audio is missing
async fn download_missing(podcast_id: &str) -> Result<()> {
    let config = config::config()?;
    let persistence = open_persistence(config);
    let downloader = Arc::new(HttpDownloader::new(config.downloader_config())?);

    let mut manager = PodcastManager::open(podcast_id, persistence, downloader)
        .with_context(|| format!("Podcast not found: {}", podcast_id))?;

    let targets = manager.episodes_missing_audio();
    println!("Podcast: {}", manager.podcast().title);
    if targets.is_empty() {
        println!("All episodes already downloaded");
        return Ok(());
    }

    print_download_plan(&targets);
    run_downloads(&mut manager, &targets).await
}

async fn run_downloads(manager: &mut PodcastManager, targets: &[Episode]) -> Result<()> {
    println!("\nDownloading episodes...");
    let summary = manager.download_episodes(targets).await;

    println!("\nDownload complete:");
    println!("  Successfully downloaded: {}", summary.successful);
    println!("  Already existed (skipped): {}", summary.skipped);
    println!("  Failed downloads: {}", summary.failed);

    if summary.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_download_plan(episodes: &[Episode]) {
    println!("Total download size: {}", format_bytes(total_size(episodes)));

    for (i, episode) in episodes.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, episode.title, format_bytes(episode.size));
    }
}

/// List stored podcasts
fn list_podcasts() -> Result<()> {
    let config = config::config()?;
    let persistence = open_persistence(config);

    let mut podcasts = persistence.podcasts().list_all();
    if podcasts.is_empty() {
        println!("No podcasts stored in {}", config.data_dir.display());
        return Ok(());
    }

    podcasts.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));

    println!("{:<18} {:>8}  {}", "ID", "EPISODES", "TITLE");
    println!("{}", "-".repeat(60));
    for podcast in podcasts {
        println!("{:<18} {:>8}  {}", podcast.id, podcast.episodes.len(), podcast.title);
    }

    Ok(())
}

/// List stored episodes for one podcast
fn list_episodes(podcast_id: &str) -> Result<()> {
    let config = config::config()?;
    let persistence = open_persistence(config);

    let podcast = persistence
        .podcasts()
        .load(podcast_id)
        .with_context(|| format!("Podcast not found: {}", podcast_id))?;

    let mut episodes: Vec<Episode> = persistence
        .episodes()
        .list_all()
        .into_iter()
        .filter(|e| e.podcast_id == podcast.id)
        .collect();
    episodes.sort_by(|a, b| b.published.cmp(&a.published));

    println!("Podcast: {} ({})", podcast.title, podcast.id);
    println!("{:<18} {:<10} {:<5} {}", "ID", "PUBLISHED", "AUDIO", "TITLE");
    println!("{}", "-".repeat(60));
    for episode in episodes {
        let audio = if persistence.audio_exists(&episode) { "yes" } else { "-" };
        println!(
            "{:<18} {:<10} {:<5} {}",
            episode.id,
            episode.published.format("%Y-%m-%d"),
            audio,
            episode.title
        );
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("Data directory: {}", config.data_dir.display());
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("Download concurrency: {}", config.downloads.concurrency);
    println!("Download timeout: {}s", config.downloads.timeout_seconds);
    println!("Overwrite existing: {}", config.downloads.overwrite);

    Ok(())
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_cli_parses_fetch() {
        let cli = Cli::parse_from([
            "podvault",
            "fetch",
            "https://example.com/feed.xml",
            "--list-only",
        ]);

        match cli.command {
            Commands::Fetch {
                rss_url,
                list_only,
                missing,
            } => {
                assert_eq!(rss_url, "https://example.com/feed.xml");
                assert!(list_only);
                assert!(!missing);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    fn sample_podcast() -> Podcast {
        let episodes = ["e1", "e2"]
            .iter()
            .map(|id| {
                Episode::new(
                    EntityId::new(*id),
                    format!("Episode {}", id),
                    format!("https://cdn.example.com/{}.mp3", id),
                    Utc::now(),
                )
            })
            .collect();
        Podcast::new("https://example.com/feed.xml", "Show").with_episodes(episodes)
    }

    #[test]
    fn test_plan_targets_does_not_store() {
        let temp = TempDir::new().unwrap();
        let persistence = Persistence::new(temp.path());
        let podcast = sample_podcast();

        // A dry run may be repeated without using up new episodes
        assert_eq!(plan_targets(&persistence, &podcast, false).len(), 2);
        assert_eq!(plan_targets(&persistence, &podcast, false).len(), 2);
        assert!(persistence.episodes().list_ids().is_empty());
        assert!(!temp.path().join("podcasts").exists());

        PodcastManager::commit(
            podcast.clone(),
            Arc::new(Persistence::new(temp.path())),
            Arc::new(HttpDownloader::new(Default::default()).unwrap()),
        );

        assert!(plan_targets(&persistence, &podcast, false).is_empty());
        assert_eq!(plan_targets(&persistence, &podcast, true).len(), 2);
    }

    #[test]
    fn test_plan_size_with_huge_enclosure() {
        let mut podcast = sample_podcast();
        podcast.episodes[0].size = u64::MAX;
        podcast.episodes[1].size = 1;

        // Must not overflow
        print_download_plan(&podcast.episodes);
        assert_eq!(total_size(&podcast.episodes), u64::MAX);
    }
}
