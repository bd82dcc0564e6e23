//! GUID-keyed file storage for podcast records.
//!
//! # Storage Layout
//!
//! ```text
//! <base>/
//! ├── podcasts/
//! │   └── <podcast-id>.json            # Podcast with episodes inline
//! ├── episodes/
//! │   └── <episode-id>.json            # Standalone episode record
//! ├── downloads/
//! │   ├── <episode-id>.mp3             # Audio
//! │   └── <episode-id>_transcript.json # Transcript
//! └── cache/
//!     └── <podcast-id>.xml             # Raw feed content
//! ```
//!
//! Layers, leaves first:
//! - EntityStore: JSON documents and artifact paths keyed by identifier
//! - Repository: typed save/load/list for one entity kind
//! - Persistence: one repository per kind plus path helpers

pub mod entity_store;
pub mod persistence;
pub mod repository;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use entity_store::EntityStore;
pub use persistence::{HasRepository, Persistence};
pub use repository::Repository;

/// File extension used for downloaded audio
pub const AUDIO_EXTENSION: &str = "mp3";

/// Errors raised inside the storage layer.
///
/// These never cross the public storage API: they are logged and turned
/// into `false` / `None` results at the boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persisted entity kinds, each with its own directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Podcast,
    Episode,
}

impl EntityKind {
    /// Directory name under the storage base
    pub fn dir_name(self) -> &'static str {
        match self {
            EntityKind::Podcast => "podcasts",
            EntityKind::Episode => "episodes",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Podcast => write!(f, "podcast"),
            EntityKind::Episode => write!(f, "episode"),
        }
    }
}

/// Binary artifacts stored next to the JSON records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// Episode audio (`downloads/<id>.mp3`)
    Audio,

    /// Episode transcript (`downloads/<id>_transcript.json`)
    Transcript,

    /// Raw feed content (`cache/<id>.xml`)
    FeedCache,
}

impl FileRole {
    /// Directory name under the storage base
    pub fn dir_name(self) -> &'static str {
        match self {
            FileRole::Audio | FileRole::Transcript => "downloads",
            FileRole::FeedCache => "cache",
        }
    }

    /// File name for an identifier
    pub fn file_name(self, id: &str) -> String {
        match self {
            FileRole::Audio => format!("{}.{}", id, AUDIO_EXTENSION),
            FileRole::Transcript => format!("{}_transcript.json", id),
            FileRole::FeedCache => format!("{}.xml", id),
        }
    }
}

/// A record that can be persisted by identifier.
///
/// The kind selects the storage directory; the identifier is the file stem.
pub trait Storable: Serialize + DeserializeOwned {
    /// Kind this type is stored under
    const KIND: EntityKind;

    /// Identifier used as the document key. Empty means "not assigned".
    fn id(&self) -> &str;
}

/// Check that an identifier can be used as a file stem
pub(crate) fn validate_id(id: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(['/', '\\'])
        && !id.contains('\0');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_role_names() {
        assert_eq!(FileRole::Audio.file_name("abc"), "abc.mp3");
        assert_eq!(FileRole::Transcript.file_name("abc"), "abc_transcript.json");
        assert_eq!(FileRole::FeedCache.file_name("abc"), "abc.xml");
        assert_eq!(FileRole::Audio.dir_name(), "downloads");
        assert_eq!(FileRole::FeedCache.dir_name(), "cache");
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("0123abcd").is_ok());
        assert!(validate_id("e1").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("../escape").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id(".hidden").is_err());
    }
}
