//! Podcast manager: ties one podcast snapshot to its stored state and
//! drives incremental downloads.
//!
//! Episode lifecycle:
//!
//! ```text
//! Known (parsed) → Persisted (record saved) → Downloaded (audio on disk, record re-saved)
//! ```
//!
//! "New" means "not yet in the episode store", not "audio missing". Once a
//! podcast is committed, its episodes are no longer new even if their audio
//! was never fetched; use [`PodcastManager::episodes_missing_audio`] for the
//! audio-presence view.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::{DownloadItem, DownloadSummary, Downloader};
use crate::domain::{Episode, EpisodeFile, Podcast};
use crate::storage::Persistence;

/// Orchestrates storage and downloads for exactly one podcast
pub struct PodcastManager {
    podcast: Podcast,
    persistence: Arc<Persistence>,
    downloader: Arc<dyn Downloader>,
}

impl PodcastManager {
    /// Commit a parsed podcast snapshot to storage and bind a manager to it.
    ///
    /// Links every episode to the podcast, saves the podcast record and then
    /// each episode record. The snapshot overwrites whatever was stored
    /// before. Failed saves are logged; storage reports them as `false`.
    /// If the podcast record cannot be saved, no episode record is written.
    pub fn commit(
        mut podcast: Podcast,
        persistence: Arc<Persistence>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        info!(
            podcast = %podcast.title,
            id = %podcast.id,
            episodes = podcast.episodes.len(),
            "committing podcast snapshot"
        );

        podcast.link_episodes();

        if persistence.podcasts().save(&podcast) {
            let failed = podcast
                .episodes
                .iter()
                .filter(|episode| !persistence.episodes().save(episode))
                .count();
            if failed > 0 {
                warn!(id = %podcast.id, failed, "some episode records were not saved");
            }
        } else {
            // Episodes would point at a podcast that does not exist
            warn!(id = %podcast.id, "podcast record was not saved, skipping episodes");
        }

        let manager = Self {
            podcast,
            persistence,
            downloader,
        };

        info!(
            with_audio = manager.podcast.episodes.len() - manager.episodes_missing_audio().len(),
            "found episodes with existing audio files"
        );

        manager
    }

    /// Bind a manager to a podcast already in storage, without re-committing
    pub fn open(
        podcast_id: &str,
        persistence: Arc<Persistence>,
        downloader: Arc<dyn Downloader>,
    ) -> Option<Self> {
        let podcast = persistence.podcasts().load(podcast_id)?;

        info!(podcast = %podcast.title, id = %podcast.id, "opened stored podcast");

        Some(Self {
            podcast,
            persistence,
            downloader,
        })
    }

    pub fn podcast(&self) -> &Podcast {
        &self.podcast
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Episodes of this podcast whose id is not in the episode store
    pub fn new_episodes(&self) -> Vec<Episode> {
        let new_episodes = self.persistence.episodes().filter_new(&self.podcast.episodes);

        info!(
            new = new_episodes.len(),
            total = self.podcast.episodes.len(),
            "computed new episodes"
        );

        new_episodes
    }

    /// Episodes of this podcast with no audio file on disk
    pub fn episodes_missing_audio(&self) -> Vec<Episode> {
        self.podcast
            .episodes
            .iter()
            .filter(|episode| !self.persistence.audio_exists(episode))
            .cloned()
            .collect()
    }

    /// Whether a per-episode file exists on disk
    pub fn episode_file_exists(&self, episode: &Episode, file: EpisodeFile) -> bool {
        self.persistence.file_exists(episode, file)
    }

    /// Store the raw feed this snapshot was parsed from
    pub fn cache_feed(&self, content: &[u8]) -> bool {
        self.persistence.save_feed_cache(&self.podcast, content)
    }

    /// Download episodes and record the ones whose audio is now on disk.
    ///
    /// Returns the downloader's summary unchanged. Episodes whose audio did
    /// not materialize are never re-saved.
    pub async fn download_episodes(&mut self, episodes: &[Episode]) -> DownloadSummary {
        let items: Vec<DownloadItem> = episodes
            .iter()
            .map(|episode| {
                DownloadItem::new(&episode.audio_url, self.persistence.audio_path(episode))
            })
            .collect();

        let total_bytes = total_size(episodes);
        info!(
            count = items.len(),
            total_bytes,
            downloader = self.downloader.name(),
            "downloading episodes"
        );

        let summary = self.downloader.download(items).await;

        for episode in episodes {
            if self.persistence.audio_exists(episode) {
                self.record_download(episode);
            }
        }

        info!(
            successful = summary.successful,
            skipped = summary.skipped,
            failed = summary.failed,
            "download results"
        );

        summary
    }

    fn record_download(&mut self, episode: &Episode) {
        let audio_path = self.persistence.audio_path(episode);
        let file_name = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string());

        let mut updated = episode.clone();
        updated.podcast_id = self.podcast.id.clone();
        updated.audio_file = file_name;

        if !self.persistence.episodes().save(&updated) {
            warn!(id = %updated.id, "downloaded episode record was not saved");
            return;
        }

        if let Some(known) = self.podcast.episodes.iter_mut().find(|e| e.id == updated.id) {
            known.audio_file = updated.audio_file.clone();
        }
    }
}

/// Sum of enclosure sizes. Sizes come from the feed, so this saturates.
pub fn total_size(episodes: &[Episode]) -> u64 {
    episodes
        .iter()
        .fold(0u64, |acc, episode| acc.saturating_add(episode.size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DownloadOutcome, DownloadResult};
    use crate::domain::EntityId;
    use async_trait::async_trait;
    use chrono::Utc;
    use tempfile::TempDir;

    /// Downloader that never touches the filesystem
    struct NoopDownloader;

    #[async_trait]
    impl Downloader for NoopDownloader {
        fn name(&self) -> &str {
            "noop"
        }

        async fn download(&self, items: Vec<DownloadItem>) -> DownloadSummary {
            let results = items
                .into_iter()
                .map(|item| DownloadResult::new(item, DownloadOutcome::Failed("offline".into())))
                .collect();
            DownloadSummary::from_results(results)
        }
    }

    fn podcast() -> Podcast {
        let mut podcast = Podcast::new("https://example.com/feed.xml", "Show");
        podcast.id = EntityId::new("p1");
        podcast.episodes = vec![
            Episode::new(EntityId::new("e1"), "One", "https://cdn.example.com/1.mp3", Utc::now()),
            Episode::new(EntityId::new("e2"), "Two", "https://cdn.example.com/2.mp3", Utc::now()),
        ];
        podcast
    }

    #[test]
    fn test_commit_links_and_saves() {
        let temp = TempDir::new().unwrap();
        let persistence = Arc::new(Persistence::new(temp.path()));

        let manager =
            PodcastManager::commit(podcast(), Arc::clone(&persistence), Arc::new(NoopDownloader));

        assert!(manager
            .podcast()
            .episodes
            .iter()
            .all(|e| e.podcast_id.as_str() == "p1"));
        assert!(persistence.podcasts().exists("p1"));
        assert_eq!(persistence.episodes().load("e2").unwrap().podcast_id.as_str(), "p1");
        assert_eq!(manager.episodes_missing_audio().len(), 2);
    }

    #[test]
    fn test_open_missing_podcast() {
        let temp = TempDir::new().unwrap();
        let persistence = Arc::new(Persistence::new(temp.path()));

        assert!(PodcastManager::open("p1", persistence, Arc::new(NoopDownloader)).is_none());
    }

    #[tokio::test]
    async fn test_failed_download_is_not_recorded() {
        let temp = TempDir::new().unwrap();
        let persistence = Arc::new(Persistence::new(temp.path()));
        let mut manager =
            PodcastManager::commit(podcast(), Arc::clone(&persistence), Arc::new(NoopDownloader));

        let episodes = manager.podcast().episodes.clone();
        let summary = manager.download_episodes(&episodes).await;

        assert_eq!(summary.failed, 2);
        assert!(!persistence.episodes().load("e1").unwrap().is_downloaded());
        assert!(!manager.podcast().episodes[0].is_downloaded());
    }

    #[test]
    fn test_total_size_saturates() {
        let huge = podcast().episodes[0].clone().with_size(u64::MAX);
        let small = podcast().episodes[1].clone().with_size(1);

        assert_eq!(total_size(&[huge, small.clone()]), u64::MAX);
        assert_eq!(total_size(&[small.clone(), small]), 2);
        assert_eq!(total_size(&[]), 0);
    }

    #[test]
    fn test_unsaved_podcast_writes_no_episodes() {
        let temp = TempDir::new().unwrap();
        let persistence = Arc::new(Persistence::new(temp.path()));
        let mut orphaned = podcast();
        orphaned.id = EntityId::default();

        let manager =
            PodcastManager::commit(orphaned, Arc::clone(&persistence), Arc::new(NoopDownloader));

        assert!(persistence.episodes().list_ids().is_empty());
        assert!(!temp.path().join("episodes").exists());
        assert_eq!(manager.podcast().episodes.len(), 2);
    }
}
