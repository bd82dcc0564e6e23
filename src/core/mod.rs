//! Core orchestration logic.
//!
//! This module contains:
//! - PodcastManager: Snapshot commit, new-episode detection and downloads

pub mod manager;

// Re-export commonly used types
pub use manager::{total_size, PodcastManager};
