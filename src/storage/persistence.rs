//! Single access point for podcast and episode persistence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{EntityStore, FileRole, Repository, Storable};
use crate::domain::{Episode, EpisodeFile, Podcast};

/// Repositories for each entity kind plus path derivation.
///
/// Repositories are created once in [`Persistence::new`] and shared.
pub struct Persistence {
    store: Arc<EntityStore>,
    podcasts: Repository<Podcast>,
    episodes: Repository<Episode>,
}

/// Lookup of the repository bound to `T`
pub trait HasRepository<T: Storable> {
    fn repository(&self) -> &Repository<T>;
}

impl HasRepository<Podcast> for Persistence {
    fn repository(&self) -> &Repository<Podcast> {
        &self.podcasts
    }
}

impl HasRepository<Episode> for Persistence {
    fn repository(&self) -> &Repository<Episode> {
        &self.episodes
    }
}

impl Persistence {
    /// Open persistence rooted at a data directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let store = Arc::new(EntityStore::new(base_dir));

        Self {
            podcasts: Repository::new(Arc::clone(&store)),
            episodes: Repository::new(Arc::clone(&store)),
            store,
        }
    }

    /// Repository bound to `T`'s kind
    ///
    /// ```rust,ignore
    /// let episodes = persistence.repository_for::<Episode>();
    /// ```
    pub fn repository_for<T: Storable>(&self) -> &Repository<T>
    where
        Self: HasRepository<T>,
    {
        <Self as HasRepository<T>>::repository(self)
    }

    pub fn podcasts(&self) -> &Repository<Podcast> {
        &self.podcasts
    }

    pub fn episodes(&self) -> &Repository<Episode> {
        &self.episodes
    }

    /// Underlying document store
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn base_dir(&self) -> &Path {
        self.store.base_dir()
    }

    /// Path of a per-episode file
    pub fn episode_file_path(&self, episode: &Episode, file: EpisodeFile) -> PathBuf {
        self.store.file_path(episode.id.as_str(), file.into())
    }

    pub fn audio_path(&self, episode: &Episode) -> PathBuf {
        self.episode_file_path(episode, EpisodeFile::Audio)
    }

    pub fn transcript_path(&self, episode: &Episode) -> PathBuf {
        self.episode_file_path(episode, EpisodeFile::Transcript)
    }

    pub fn feed_cache_path(&self, podcast: &Podcast) -> PathBuf {
        self.store.file_path(podcast.id.as_str(), FileRole::FeedCache)
    }

    /// Whether a per-episode file exists on disk.
    ///
    /// Independent of whether the episode record has been saved.
    pub fn file_exists(&self, episode: &Episode, file: EpisodeFile) -> bool {
        self.store.file_exists(episode.id.as_str(), file.into())
    }

    pub fn audio_exists(&self, episode: &Episode) -> bool {
        self.file_exists(episode, EpisodeFile::Audio)
    }

    pub fn transcript_exists(&self, episode: &Episode) -> bool {
        self.file_exists(episode, EpisodeFile::Transcript)
    }

    /// Store the raw feed content for a podcast
    pub fn save_feed_cache(&self, podcast: &Podcast, content: &[u8]) -> bool {
        self.store
            .write_file(podcast.id.as_str(), FileRole::FeedCache, content)
    }

    /// Load the cached raw feed content for a podcast
    pub fn load_feed_cache(&self, podcast: &Podcast) -> Option<Vec<u8>> {
        self.store.read_file(podcast.id.as_str(), FileRole::FeedCache)
    }
}
