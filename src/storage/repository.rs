//! Typed repository over the entity store.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{EntityStore, Storable};

/// Typed access to the documents of one entity kind
pub struct Repository<T> {
    store: Arc<EntityStore>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _kind: PhantomData,
        }
    }
}

impl<T: Storable> Repository<T> {
    /// Bind a repository for `T::KIND` to a store
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    /// Save an entity under its identifier.
    ///
    /// Returns `false` without touching disk if the identifier is empty.
    pub fn save(&self, entity: &T) -> bool {
        let id = entity.id();
        if id.is_empty() {
            warn!(kind = %T::KIND, "refusing to save entity without identifier");
            return false;
        }

        match serde_json::to_value(entity) {
            Ok(document) => self.store.save(T::KIND, id, &document),
            Err(e) => {
                warn!(kind = %T::KIND, id, error = %e, "failed to serialize entity");
                false
            }
        }
    }

    /// Load an entity. Missing or undecodable documents yield `None`.
    pub fn load(&self, id: &str) -> Option<T> {
        let document = self.store.load(T::KIND, id)?;

        match serde_json::from_value(document) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!(kind = %T::KIND, id, error = %e, "document does not match schema");
                None
            }
        }
    }

    /// Identifiers currently stored for this kind
    pub fn list_ids(&self) -> Vec<String> {
        self.store.list_ids(T::KIND)
    }

    /// Load every stored entity, skipping any that fail to load
    pub fn list_all(&self) -> Vec<T> {
        let ids = self.list_ids();
        let total = ids.len();

        let entities: Vec<T> = ids.iter().filter_map(|id| self.load(id)).collect();

        if entities.len() < total {
            debug!(
                kind = %T::KIND,
                skipped = total - entities.len(),
                "skipped unreadable documents"
            );
        }

        entities
    }

    /// Check whether an identifier is stored
    pub fn exists(&self, id: &str) -> bool {
        self.list_ids().iter().any(|stored| stored == id)
    }

    /// Remove an entity. Returns `false` if nothing was stored.
    pub fn delete(&self, id: &str) -> bool {
        self.store.delete(T::KIND, id)
    }

    /// Candidates whose identifier is not stored yet.
    ///
    /// Lists the store once, so the cost is linear in store size plus
    /// candidate count. Candidate order is preserved.
    pub fn filter_new(&self, candidates: &[T]) -> Vec<T>
    where
        T: Clone,
    {
        let stored: HashSet<String> = self.list_ids().into_iter().collect();

        candidates
            .iter()
            .filter(|candidate| !stored.contains(candidate.id()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EntityKind;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Storable for Note {
        const KIND: EntityKind = EntityKind::Episode;

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str) -> Note {
        Note {
            id: id.to_string(),
            body: format!("body of {}", id),
        }
    }

    fn create_test_repo() -> (Repository<Note>, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(EntityStore::new(temp.path()));
        (Repository::new(store), temp)
    }

    #[test]
    fn test_save_and_load() {
        let (repo, _temp) = create_test_repo();

        assert!(repo.save(&note("a")));
        assert_eq!(repo.load("a"), Some(note("a")));
        assert_eq!(repo.load("b"), None);
    }

    #[test]
    fn test_save_without_id_fails() {
        let (repo, temp) = create_test_repo();

        assert!(!repo.save(&note("")));
        assert!(!temp.path().join("episodes").exists());
    }

    #[test]
    fn test_load_schema_mismatch_is_absent() {
        let (repo, temp) = create_test_repo();
        let store = EntityStore::new(temp.path());
        store.save(EntityKind::Episode, "odd", &serde_json::json!({"id": 5}));

        assert!(repo.load("odd").is_none());
        assert!(repo.exists("odd"));
    }

    #[test]
    fn test_exists_and_delete() {
        let (repo, _temp) = create_test_repo();
        repo.save(&note("a"));

        assert!(repo.exists("a"));
        assert!(!repo.exists("b"));
        assert!(repo.delete("a"));
        assert!(!repo.exists("a"));
        assert!(!repo.delete("a"));
    }

    #[test]
    fn test_filter_new_preserves_order() {
        let (repo, _temp) = create_test_repo();
        repo.save(&note("b"));

        let candidates = vec![note("c"), note("b"), note("a")];
        let new: Vec<String> = repo
            .filter_new(&candidates)
            .into_iter()
            .map(|n| n.id)
            .collect();

        assert_eq!(new, vec!["c".to_string(), "a".to_string()]);
    }
}
