//! Domain types for the podcast library.
//!
//! This module contains the persisted records:
//! - EntityId: Stable identifier shared by records and their files
//! - Podcast: Feed metadata with its episodes embedded inline
//! - Episode: One feed entry and its download state

pub mod episode;
pub mod id;
pub mod podcast;

// Re-export commonly used types
pub use episode::{Episode, EpisodeFile};
pub use id::EntityId;
pub use podcast::{safe_title, Podcast};
