use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::errors::{Result, ZipSyncError};
use crate::model::{Entity, StableId};

/// Writes produced by one unit of work, applied atomically by a store
#[derive(Debug, Clone)]
pub struct CommitSet<E> {
    pub upserts: Vec<(StableId, E)>,
    pub deletes: Vec<StableId>,
}

impl<E> Default for CommitSet<E> {
    fn default() -> Self {
        Self {
            upserts: Vec::new(),
            deletes: Vec::new(),
        }
    }
}

impl<E> CommitSet<E> {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Persistent collection of one entity type, addressed by stable id and
/// searchable by unique key.
///
/// Only committed state is visible through this trait. Pending changes live
/// in a [`Context`](super::Context) until it saves.
pub trait KeyedStore<E: Entity> {
    /// Committed entities whose key is in `keys`, sorted by key ascending.
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if the lookup cannot be performed. Callers must
    /// treat this as fatal for the whole batch.
    fn fetch_sorted(&self, keys: &[E::Key]) -> Result<Vec<(StableId, E)>>;

    /// # Errors
    ///
    /// Returns `StoreFetch` if the lookup cannot be performed.
    fn get(&self, id: StableId) -> Result<Option<E>>;

    /// Committed entities matching `predicate`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if the scan cannot be performed.
    fn fetch_matching(&self, predicate: &dyn Fn(&E) -> bool) -> Result<Vec<(StableId, E)>>;

    /// # Errors
    ///
    /// Returns `StoreFetch` if the count cannot be performed.
    fn count(&self) -> Result<usize>;

    /// Reserve `n` permanent ids for entities about to be committed.
    fn allocate_ids(&mut self, n: usize) -> Vec<StableId>;

    /// Apply all writes or none.
    ///
    /// # Errors
    ///
    /// Returns `StoreCommit` or `UniqueKeyConflict` and leaves the store
    /// untouched.
    fn commit(&mut self, writes: CommitSet<E>) -> Result<()>;

    /// Delete committed entities matching `predicate` without loading them
    /// into a context. Returns the ids removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreCommit` if the delete cannot be applied.
    fn batch_delete(&mut self, predicate: &dyn Fn(&E) -> bool) -> Result<Vec<StableId>>;
}

/// A committed entity together with its bookkeeping timestamps
#[derive(Debug, Clone)]
pub struct StoredEntity<E> {
    pub entity: E,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory [`KeyedStore`]
///
/// Not thread-safe; a store is owned by one writer at a time (see the
/// engine's store worker).
#[derive(Debug, Clone)]
pub struct MemoryStore<E> {
    entities: BTreeMap<StableId, StoredEntity<E>>,
    enforce_unique_keys: bool,
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            enforce_unique_keys: false,
        }
    }

    /// Reject commits that would leave two entities with the same key.
    ///
    /// Off by default, which lets callers observe duplicates produced by
    /// nested reconciliation.
    pub fn with_unique_keys(mut self, enforce: bool) -> Self {
        self.enforce_unique_keys = enforce;
        self
    }

    /// Seed the store with an already-committed entity
    ///
    /// # Errors
    ///
    /// Returns `UniqueKeyConflict` when key enforcement is on and the key is
    /// taken.
    pub fn insert_committed(&mut self, entity: E) -> Result<StableId> {
        let id = StableId::new();
        self.commit(CommitSet {
            upserts: vec![(id, entity)],
            deletes: Vec::new(),
        })?;
        Ok(id)
    }

    pub fn stored(&self, id: StableId) -> Option<&StoredEntity<E>> {
        self.entities.get(&id)
    }

    /// All committed entities ordered by key, ties broken by id
    pub fn all_sorted(&self) -> Vec<(StableId, &E)> {
        let mut all: Vec<(StableId, &E)> = self
            .entities
            .iter()
            .map(|(id, stored)| (*id, &stored.entity))
            .collect();
        all.sort_by(|a, b| a.1.unique_key().cmp(&b.1.unique_key()).then(a.0.cmp(&b.0)));
        all
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn check_unique_keys(&self, writes: &CommitSet<E>) -> Result<()> {
        let deleted: HashSet<StableId> = writes.deletes.iter().copied().collect();
        let rewritten: HashSet<StableId> = writes.upserts.iter().map(|(id, _)| *id).collect();

        let mut owners: HashMap<E::Key, StableId> = self
            .entities
            .iter()
            .filter(|(id, _)| !deleted.contains(id) && !rewritten.contains(id))
            .map(|(id, stored)| (stored.entity.unique_key(), *id))
            .collect();

        for (id, entity) in &writes.upserts {
            if deleted.contains(id) {
                continue;
            }
            let key = entity.unique_key();
            if let Some(owner) = owners.insert(key.clone(), *id) {
                if owner != *id {
                    return Err(ZipSyncError::UniqueKeyConflict {
                        entity: E::ENTITY_NAME.to_string(),
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<E: Entity> KeyedStore<E> for MemoryStore<E> {
    fn fetch_sorted(&self, keys: &[E::Key]) -> Result<Vec<(StableId, E)>> {
        let wanted: HashSet<&E::Key> = keys.iter().collect();
        let mut found: Vec<(StableId, E)> = self
            .entities
            .iter()
            .filter(|(_, stored)| wanted.contains(&stored.entity.unique_key()))
            .map(|(id, stored)| (*id, stored.entity.clone()))
            .collect();
        found.sort_by(|a, b| a.1.unique_key().cmp(&b.1.unique_key()).then(a.0.cmp(&b.0)));
        Ok(found)
    }

    fn get(&self, id: StableId) -> Result<Option<E>> {
        Ok(self.entities.get(&id).map(|stored| stored.entity.clone()))
    }

    fn fetch_matching(&self, predicate: &dyn Fn(&E) -> bool) -> Result<Vec<(StableId, E)>> {
        Ok(self
            .entities
            .iter()
            .filter(|(_, stored)| predicate(&stored.entity))
            .map(|(id, stored)| (*id, stored.entity.clone()))
            .collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.entities.len())
    }

    fn allocate_ids(&mut self, n: usize) -> Vec<StableId> {
        (0..n).map(|_| StableId::new()).collect()
    }

    fn commit(&mut self, writes: CommitSet<E>) -> Result<()> {
        if self.enforce_unique_keys {
            self.check_unique_keys(&writes)?;
        }

        let now = Utc::now();
        for id in &writes.deletes {
            self.entities.remove(id);
        }
        for (id, entity) in writes.upserts {
            if writes.deletes.contains(&id) {
                continue;
            }
            match self.entities.get_mut(&id) {
                Some(stored) => {
                    stored.entity = entity;
                    stored.updated_at = now;
                }
                None => {
                    self.entities.insert(
                        id,
                        StoredEntity {
                            entity,
                            created_at: now,
                            updated_at: now,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn batch_delete(&mut self, predicate: &dyn Fn(&E) -> bool) -> Result<Vec<StableId>> {
        let doomed: Vec<StableId> = self
            .entities
            .iter()
            .filter(|(_, stored)| predicate(&stored.entity))
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            self.entities.remove(id);
        }
        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UniqueIdentifiable;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: i64,
        label: String,
    }

    impl UniqueIdentifiable for Item {
        type Key = i64;

        fn unique_key(&self) -> i64 {
            self.key
        }
    }

    impl Entity for Item {
        const ENTITY_NAME: &'static str = "Item";

        fn with_key(key: i64) -> Self {
            Item {
                key,
                label: String::new(),
            }
        }
    }

    #[test]
    fn test_fetch_sorted_returns_only_requested_keys_in_key_order() {
        let mut store = MemoryStore::new();
        for key in [5, 1, 3, 9] {
            store.insert_committed(Item::with_key(key)).unwrap();
        }

        let found = store.fetch_sorted(&[9, 3, 4]).unwrap();
        let keys: Vec<i64> = found.iter().map(|(_, e)| e.key).collect();
        assert_eq!(keys, vec![3, 9]);
    }

    #[test]
    fn test_commit_updates_timestamp_and_keeps_created_at() {
        let mut store = MemoryStore::new();
        let id = store.insert_committed(Item::with_key(1)).unwrap();
        let created = store.stored(id).unwrap().created_at;

        let mut changed = Item::with_key(1);
        changed.label = "new".to_string();
        store
            .commit(CommitSet {
                upserts: vec![(id, changed)],
                deletes: vec![],
            })
            .unwrap();

        let stored = store.stored(id).unwrap();
        assert_eq!(stored.entity.label, "new");
        assert_eq!(stored.created_at, created);
        assert!(stored.updated_at >= created);
    }

    #[test]
    fn test_duplicate_keys_allowed_by_default() {
        let mut store = MemoryStore::new();
        store.insert_committed(Item::with_key(1)).unwrap();
        store.insert_committed(Item::with_key(1)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_unique_key_enforcement_rejects_whole_commit() {
        let mut store = MemoryStore::new().with_unique_keys(true);
        store.insert_committed(Item::with_key(1)).unwrap();

        let result = store.commit(CommitSet {
            upserts: vec![
                (StableId::new(), Item::with_key(2)),
                (StableId::new(), Item::with_key(1)),
            ],
            deletes: vec![],
        });

        assert!(matches!(
            result,
            Err(ZipSyncError::UniqueKeyConflict { ref key, .. }) if key == "1"
        ));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_unique_key_freed_by_delete_in_same_commit() {
        let mut store = MemoryStore::new().with_unique_keys(true);
        let old = store.insert_committed(Item::with_key(1)).unwrap();

        store
            .commit(CommitSet {
                upserts: vec![(StableId::new(), Item::with_key(1))],
                deletes: vec![old],
            })
            .unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert!(store.stored(old).is_none());
    }

    #[test]
    fn test_batch_delete_returns_removed_ids() {
        let mut store = MemoryStore::new();
        let even = store.insert_committed(Item::with_key(2)).unwrap();
        store.insert_committed(Item::with_key(3)).unwrap();

        let removed = store.batch_delete(&|item: &Item| item.key % 2 == 0).unwrap();

        assert_eq!(removed, vec![even]);
        assert_eq!(store.count().unwrap(), 1);
    }
}
