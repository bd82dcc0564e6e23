//! Podcast records.

use serde::{Deserialize, Serialize};

use super::episode::Episode;
use super::id::EntityId;
use crate::storage::{EntityKind, Storable};

/// A podcast with its episodes embedded inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    /// Stable identifier (SHA256 of the feed URL)
    pub id: EntityId,

    pub title: String,

    /// RSS feed URL
    pub feed_url: String,

    /// Filesystem-safe display name. Never used to address storage.
    #[serde(default)]
    pub safe_title: String,

    /// Episodes in feed order
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

impl Podcast {
    /// Create a podcast whose id is derived from its feed URL
    pub fn new(feed_url: impl Into<String>, title: impl Into<String>) -> Self {
        let feed_url = feed_url.into();
        let title = title.into();

        Self {
            id: EntityId::from_key(&feed_url),
            safe_title: safe_title(&title),
            title,
            feed_url,
            episodes: Vec::new(),
        }
    }

    /// Attach episodes, pointing their parent link at this podcast
    pub fn with_episodes(mut self, episodes: Vec<Episode>) -> Self {
        self.episodes = episodes;
        self.link_episodes();
        self
    }

    /// Set every embedded episode's parent link to this podcast's id
    pub fn link_episodes(&mut self) {
        for episode in &mut self.episodes {
            episode.podcast_id = self.id.clone();
        }
    }

    /// Look up an embedded episode
    pub fn episode(&self, id: &str) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.id.as_str() == id)
    }
}

impl Storable for Podcast {
    const KIND: EntityKind = EntityKind::Podcast;

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

/// Turn a title into a name that is safe to show as a file or folder name
pub fn safe_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");

    if joined.is_empty() {
        "untitled".to_string()
    } else {
        joined
    }
}
