//! Episode records.
//!
//! An episode is stored twice: inline inside its podcast document and as a
//! standalone document in the episode store. File names kept on the record
//! are bare names; absolute paths are always derived from the episode id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::EntityId;
use crate::storage::{EntityKind, FileRole, Storable};

/// A single podcast episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Stable identifier (derived from the feed GUID)
    pub id: EntityId,

    /// Identifier of the owning podcast (lookup only)
    #[serde(default)]
    pub podcast_id: EntityId,

    /// Publication time
    pub published: DateTime<Utc>,

    pub title: String,

    #[serde(default)]
    pub author: String,

    /// Duration in seconds (0 when the feed does not say)
    #[serde(default)]
    pub duration_seconds: u64,

    /// Enclosure size in bytes as advertised by the feed
    #[serde(default)]
    pub size: u64,

    /// Source URL of the audio enclosure
    pub audio_url: String,

    /// Episode artwork URL
    #[serde(default)]
    pub image: String,

    /// Name of the downloaded audio file, once the download is confirmed
    #[serde(default)]
    pub audio_file: Option<String>,

    /// Name of the transcript file, if one was produced
    #[serde(default)]
    pub transcript_file: Option<String>,
}

impl Episode {
    /// Create a new episode with no download state
    pub fn new(
        id: EntityId,
        title: impl Into<String>,
        audio_url: impl Into<String>,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            podcast_id: EntityId::default(),
            published,
            title: title.into(),
            author: String::new(),
            duration_seconds: 0,
            size: 0,
            audio_url: audio_url.into(),
            image: String::new(),
            audio_file: None,
            transcript_file: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Whether a download was confirmed and recorded for this episode
    pub fn is_downloaded(&self) -> bool {
        self.audio_file.is_some()
    }
}

impl Storable for Episode {
    const KIND: EntityKind = EntityKind::Episode;

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

/// Files stored per episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeFile {
    /// Downloaded audio
    Audio,

    /// Transcript JSON
    Transcript,
}

impl From<EpisodeFile> for FileRole {
    fn from(file: EpisodeFile) -> Self {
        match file {
            EpisodeFile::Audio => FileRole::Audio,
            EpisodeFile::Transcript => FileRole::Transcript,
        }
    }
}

impl std::fmt::Display for EpisodeFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodeFile::Audio => write!(f, "audio"),
            EpisodeFile::Transcript => write!(f, "transcript"),
        }
    }
}
