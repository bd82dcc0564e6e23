//! podvault - GUID-keyed podcast library
//!
//! Fetches RSS feeds, stores podcast and episode records as one JSON
//! document per identifier, and downloads episode audio incrementally.
//!
//! # Architecture
//!
//! Storage is addressed by stable identifiers, never by titles:
//! - Podcast ids are derived from the feed URL
//! - Episode ids are derived from the feed item GUID
//! - Audio, transcript and feed cache paths are derived from those ids
//!
//! # Modules
//!
//! - `storage`: Entity store, typed repositories, persistence facade
//! - `core`: PodcastManager (commit, dedup, downloads)
//! - `domain`: Data structures (Podcast, Episode, EntityId)
//! - `adapters`: External system integrations (HTTP downloader, RSS feeds)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Fetch a feed and download new episodes
//! podvault fetch https://example.com/feed.xml
//!
//! # List stored podcasts
//! podvault podcasts
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod storage;

// Re-export main types at crate root for convenience
pub use adapters::{DownloadItem, DownloadOutcome, DownloadSummary, Downloader, HttpDownloader};
pub use core::PodcastManager;
pub use domain::{EntityId, Episode, EpisodeFile, Podcast};
pub use storage::{EntityKind, EntityStore, FileRole, Persistence, Repository, Storable};
