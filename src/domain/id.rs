//! Stable entity identifiers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifier of a persisted entity (SHA256(key)[0:16]).
///
/// Doubles as the filename stem of every file stored for the entity, so it
/// never changes once assigned, even if the podcast or episode is renamed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Derive an identifier from a stable key (feed URL, episode GUID, ...)
    pub fn from_key(key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let result = hasher.finalize();

        // First 8 bytes (16 hex chars)
        Self(hex::encode(&result[..8]))
    }

    /// Wrap an identifier that was assigned elsewhere
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
