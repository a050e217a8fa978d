use std::collections::{BTreeSet, HashMap, HashSet};

use crate::cache::EntityCache;
use crate::errors::{Result, ZipSyncError};
use crate::model::{Entity, EntityId, LocalHandle, StableId};
use crate::ops::changeset::Changeset;
use crate::ops::store::{CommitSet, KeyedStore};
use crate::{log_op_end, log_op_error, log_op_start};

/// Lifecycle of an entity registered in a [`Context`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Created in this unit of work, not yet committed
    Inserted,
    /// Loaded from the store, unchanged
    Fetched,
    /// Loaded from the store and modified
    Updated,
    /// Committed entity scheduled for deletion
    Deleted,
}

#[derive(Debug)]
struct Slot<E> {
    entity: E,
    state: SlotState,
}

/// Unit of work over one [`KeyedStore`].
///
/// Entities are loaded into the context, modified in place and written back
/// together by [`save`](Context::save). Each committed entity is registered
/// at most once, so fetching it again returns the same pending version.
/// Lookups by key see pending inserts as well as committed entities.
///
/// The context indexes registered entities by key when they are registered.
/// Callers must not change the key of an entity obtained through
/// [`entity_mut`](Context::entity_mut).
pub struct Context<'s, E: Entity> {
    store: &'s mut dyn KeyedStore<E>,
    slots: HashMap<EntityId, Slot<E>>,
    by_key: HashMap<E::Key, HashSet<EntityId>>,
    aliases: HashMap<LocalHandle, StableId>,
    next_handle: u64,
}

impl<'s, E: Entity> Context<'s, E> {
    pub fn new(store: &'s mut dyn KeyedStore<E>) -> Self {
        Self {
            store,
            slots: HashMap::new(),
            by_key: HashMap::new(),
            aliases: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Map a provisional handle that has since been stabilised to its
    /// stable id.
    pub fn resolve(&self, id: EntityId) -> EntityId {
        match id {
            EntityId::Provisional(handle) => self
                .aliases
                .get(&handle)
                .map(|stable| EntityId::Stable(*stable))
                .unwrap_or(id),
            stable => stable,
        }
    }

    pub fn state(&self, id: EntityId) -> Option<SlotState> {
        self.slots.get(&self.resolve(id)).map(|slot| slot.state)
    }

    /// Register a blank entity carrying `key`.
    pub fn insert(&mut self, key: E::Key) -> EntityId {
        self.insert_entity(E::with_key(key))
    }

    pub fn insert_entity(&mut self, entity: E) -> EntityId {
        let id = EntityId::Provisional(LocalHandle::new(self.next_handle));
        self.next_handle += 1;
        self.index(entity.unique_key(), id);
        self.slots.insert(
            id,
            Slot {
                entity,
                state: SlotState::Inserted,
            },
        );
        id
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if `id` is not registered, or
    /// `EntityDeleted` if it was deleted in this unit of work.
    pub fn entity(&self, id: EntityId) -> Result<&E> {
        let slot = self.live_slot(id)?;
        Ok(&slot.entity)
    }

    /// Mutable access; marks a fetched entity as updated.
    ///
    /// # Errors
    ///
    /// Same as [`entity`](Context::entity).
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut E> {
        let resolved = self.resolve(id);
        let slot = self
            .slots
            .get_mut(&resolved)
            .ok_or_else(|| ZipSyncError::EntityNotFound {
                entity_id: id.to_string(),
            })?;
        match slot.state {
            SlotState::Deleted => {
                return Err(ZipSyncError::EntityDeleted {
                    entity_id: id.to_string(),
                })
            }
            SlotState::Fetched => slot.state = SlotState::Updated,
            SlotState::Inserted | SlotState::Updated => {}
        }
        Ok(&mut slot.entity)
    }

    fn live_slot(&self, id: EntityId) -> Result<&Slot<E>> {
        let slot = self
            .slots
            .get(&self.resolve(id))
            .ok_or_else(|| ZipSyncError::EntityNotFound {
                entity_id: id.to_string(),
            })?;
        if slot.state == SlotState::Deleted {
            return Err(ZipSyncError::EntityDeleted {
                entity_id: id.to_string(),
            });
        }
        Ok(slot)
    }

    /// Schedule an entity for deletion. A pending insert is simply dropped.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if `id` is not registered.
    pub fn delete(&mut self, id: EntityId) -> Result<()> {
        let resolved = self.resolve(id);
        let slot = self
            .slots
            .get_mut(&resolved)
            .ok_or_else(|| ZipSyncError::EntityNotFound {
                entity_id: id.to_string(),
            })?;
        if slot.state != SlotState::Inserted {
            slot.state = SlotState::Deleted;
            return Ok(());
        }
        if let Some(slot) = self.slots.remove(&resolved) {
            self.unindex(&slot.entity.unique_key(), resolved);
        }
        Ok(())
    }

    /// Delete every entity, committed or pending, that matches `predicate`.
    /// Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if committed entities cannot be scanned.
    pub fn delete_where<F>(&mut self, predicate: F) -> Result<usize>
    where
        F: Fn(&E) -> bool,
    {
        for (id, entity) in self.store.fetch_matching(&predicate)? {
            self.register_fetched(id, entity);
        }
        let doomed: Vec<EntityId> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.state != SlotState::Deleted && predicate(&slot.entity))
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            self.delete(*id)?;
        }
        Ok(doomed.len())
    }

    /// Number of entities that would exist after saving.
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if the store cannot count.
    pub fn count(&self) -> Result<usize> {
        let committed = self.store.count()?;
        let (inserted, deleted) =
            self.slots
                .values()
                .fold((0usize, 0usize), |(ins, del), slot| match slot.state {
                    SlotState::Inserted => (ins + 1, del),
                    SlotState::Deleted => (ins, del + 1),
                    _ => (ins, del),
                });
        Ok(committed + inserted - deleted.min(committed))
    }

    fn register_fetched(&mut self, id: StableId, entity: E) -> EntityId {
        let id = EntityId::Stable(id);
        if !self.slots.contains_key(&id) {
            self.index(entity.unique_key(), id);
            self.slots.insert(
                id,
                Slot {
                    entity,
                    state: SlotState::Fetched,
                },
            );
        }
        id
    }

    fn index(&mut self, key: E::Key, id: EntityId) {
        self.by_key.entry(key).or_default().insert(id);
    }

    fn unindex(&mut self, key: &E::Key, id: EntityId) {
        if let Some(ids) = self.by_key.get_mut(key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_key.remove(key);
            }
        }
    }

    /// Entities whose key is in `keys`, sorted by key ascending.
    ///
    /// Committed entities are loaded with one store fetch and registered.
    /// Pending inserts with a matching key are included; entities deleted in
    /// this unit of work are not.
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if the store lookup fails. Nothing is
    /// registered in that case.
    pub fn fetch_sorted(&mut self, keys: &[E::Key]) -> Result<Vec<(E::Key, EntityId)>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        for (id, entity) in self.store.fetch_sorted(keys)? {
            self.register_fetched(id, entity);
        }

        let wanted: BTreeSet<&E::Key> = keys.iter().collect();
        let mut found: Vec<(E::Key, EntityId)> = Vec::new();
        for key in wanted {
            let Some(ids) = self.by_key.get(key) else {
                continue;
            };
            for id in ids {
                let live = self
                    .slots
                    .get(id)
                    .is_some_and(|slot| slot.state != SlotState::Deleted);
                if live {
                    found.push((key.clone(), *id));
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// The registered entity for a stable id, loading it from the store if
    /// it is not registered yet. `None` if it was deleted or never existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if the store lookup fails.
    pub fn object_with_id(&mut self, id: StableId) -> Result<Option<EntityId>> {
        let entity_id = EntityId::Stable(id);
        if let Some(slot) = self.slots.get(&entity_id) {
            return Ok((slot.state != SlotState::Deleted).then_some(entity_id));
        }
        match self.store.get(id)? {
            Some(entity) => Ok(Some(self.register_fetched(id, entity))),
            None => Ok(None),
        }
    }

    /// Give every provisional entity in `ids` a permanent id from the store
    /// and return the stable ids in the same order.
    ///
    /// Old provisional handles keep resolving to the same entity.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if an id is not registered; no id is
    /// stabilised in that case.
    pub fn obtain_permanent_ids(&mut self, ids: &[EntityId]) -> Result<Vec<StableId>> {
        let mut pending: BTreeSet<LocalHandle> = BTreeSet::new();
        for id in ids {
            match self.resolve(*id) {
                EntityId::Provisional(handle) => {
                    if !self.slots.contains_key(&EntityId::Provisional(handle)) {
                        return Err(ZipSyncError::EntityNotFound {
                            entity_id: id.to_string(),
                        });
                    }
                    pending.insert(handle);
                }
                EntityId::Stable(_) => {}
            }
        }

        let fresh = self.store.allocate_ids(pending.len());
        for (handle, stable) in pending.into_iter().zip(fresh) {
            let provisional = EntityId::Provisional(handle);
            if let Some(slot) = self.slots.remove(&provisional) {
                let key = slot.entity.unique_key();
                self.unindex(&key, provisional);
                self.index(key, EntityId::Stable(stable));
                self.slots.insert(EntityId::Stable(stable), slot);
                self.aliases.insert(handle, stable);
            }
        }

        ids.iter()
            .map(|id| match self.resolve(*id) {
                EntityId::Stable(stable) => Ok(stable),
                EntityId::Provisional(_) => Err(ZipSyncError::Internal {
                    message: format!("store allocated too few ids for {}", id),
                }),
            })
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        self.slots.values().any(|slot| slot.state != SlotState::Fetched)
    }

    /// Commit all pending changes and report what was touched.
    ///
    /// # Errors
    ///
    /// Returns the store's commit error. Pending changes stay in the context
    /// so the caller can retry or roll back.
    pub fn save(&mut self) -> Result<Changeset> {
        if !self.has_changes() {
            return Ok(Changeset::default());
        }
        log_op_start!("save", entity = E::ENTITY_NAME);
        let start = std::time::Instant::now();

        let provisional: Vec<EntityId> = self
            .slots
            .keys()
            .filter(|id| id.is_provisional())
            .copied()
            .collect();
        self.obtain_permanent_ids(&provisional)?;

        let mut writes = CommitSet::default();
        let mut inserted = Vec::new();
        let mut updated = Vec::new();
        for (id, slot) in &self.slots {
            let Some(stable) = id.stable() else {
                continue;
            };
            match slot.state {
                SlotState::Inserted => {
                    writes.upserts.push((stable, slot.entity.clone()));
                    inserted.push(stable);
                }
                SlotState::Updated => {
                    writes.upserts.push((stable, slot.entity.clone()));
                    updated.push(stable);
                }
                SlotState::Deleted => writes.deletes.push(stable),
                SlotState::Fetched => {}
            }
        }
        writes.upserts.sort_by_key(|(id, _)| *id);
        writes.deletes.sort();
        let deleted = writes.deletes.clone();

        if let Err(err) = self.store.commit(writes) {
            log_op_error!(
                "save",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                entity = E::ENTITY_NAME
            );
            return Err(err);
        }

        for id in &deleted {
            let id = EntityId::Stable(*id);
            if let Some(slot) = self.slots.remove(&id) {
                self.unindex(&slot.entity.unique_key(), id);
            }
        }
        for slot in self.slots.values_mut() {
            slot.state = SlotState::Fetched;
        }

        let changes = Changeset::new(inserted, updated, deleted);
        log_op_end!(
            "save",
            duration_ms = start.elapsed().as_millis() as u64,
            entity = E::ENTITY_NAME,
            inserted = changes.inserted().len(),
            updated = changes.updated().len(),
            deleted = changes.deleted().len()
        );
        Ok(changes)
    }

    /// Discard every pending change and forget all registered entities.
    pub fn rollback(&mut self) {
        self.slots.clear();
        self.by_key.clear();
        self.aliases.clear();
    }

    /// Find the entity holding `key`, consulting `cache` first and
    /// registering a store hit in it.
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if the lookup fails.
    pub fn fetch_object(
        &mut self,
        key: &E::Key,
        cache: Option<&EntityCache>,
    ) -> Result<Option<EntityId>> {
        if let Some(cache) = cache {
            if let Some(id) = cache.object(self, key)? {
                return Ok(Some(id));
            }
        }
        let found = self
            .fetch_sorted(std::slice::from_ref(key))?
            .first()
            .map(|(_, id)| *id);
        if let (Some(cache), Some(id)) = (cache, found) {
            cache.register(self, &[id])?;
        }
        Ok(found)
    }

    /// Insert a blank entity for `key` and register it in `cache`.
    ///
    /// # Errors
    ///
    /// Returns an error only if cache registration fails.
    pub fn insert_object(&mut self, key: E::Key, cache: Option<&EntityCache>) -> Result<EntityId> {
        let id = self.insert(key);
        if let Some(cache) = cache {
            cache.register(self, &[id])?;
        }
        Ok(self.resolve(id))
    }

    /// [`fetch_object`](Context::fetch_object), falling back to
    /// [`insert_object`](Context::insert_object).
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if the lookup fails.
    pub fn fetch_or_insert(&mut self, key: E::Key, cache: Option<&EntityCache>) -> Result<EntityId> {
        match self.fetch_object(&key, cache)? {
            Some(id) => Ok(id),
            None => self.insert_object(key, cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::ops::store::MemoryStore;

    fn seeded(keys: &[&str]) -> MemoryStore<Record> {
        let mut store = MemoryStore::new();
        for key in keys {
            store.insert_committed(Record::with_key(key.to_string())).unwrap();
        }
        store
    }

    #[test]
    fn test_fetch_registers_once_and_keeps_pending_changes() {
        let mut store = seeded(&["a"]);
        let mut ctx = Context::new(&mut store);

        let (_, id) = ctx.fetch_sorted(&["a".to_string()]).unwrap()[0].clone();
        ctx.entity_mut(id)
            .unwrap()
            .fields
            .insert("n".to_string(), 1.into());

        let again = ctx.fetch_sorted(&["a".to_string()]).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].1, id);
        assert_eq!(ctx.entity(id).unwrap().fields["n"], 1);
        assert_eq!(ctx.state(id), Some(SlotState::Updated));
    }

    #[test]
    fn test_fetch_sees_pending_inserts() {
        let mut store = seeded(&["b"]);
        let mut ctx = Context::new(&mut store);
        let pending = ctx.insert("a".to_string());

        let found = ctx
            .fetch_sorted(&["a".to_string(), "b".to_string()])
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0], ("a".to_string(), pending));
    }

    #[test]
    fn test_provisional_handle_resolves_after_stabilisation() {
        let mut store = MemoryStore::<Record>::new();
        let mut ctx = Context::new(&mut store);
        let id = ctx.insert("k".to_string());

        let stable = ctx.obtain_permanent_ids(&[id]).unwrap()[0];

        assert_eq!(ctx.resolve(id), EntityId::Stable(stable));
        assert_eq!(ctx.entity(id).unwrap().key, "k");
    }

    #[test]
    fn test_save_reports_changeset_and_settles_state() {
        let mut store = seeded(&["a", "b"]);
        let mut ctx = Context::new(&mut store);
        let found = ctx
            .fetch_sorted(&["a".to_string(), "b".to_string()])
            .unwrap();
        ctx.entity_mut(found[0].1).unwrap();
        ctx.delete(found[1].1).unwrap();
        let new = ctx.insert("c".to_string());

        let changes = ctx.save().unwrap();

        assert_eq!(changes.inserted().len(), 1);
        assert_eq!(changes.updated().len(), 1);
        assert_eq!(changes.deleted().len(), 1);
        assert!(!ctx.has_changes());
        assert_eq!(ctx.state(new), Some(SlotState::Fetched));
        drop(ctx);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_insert_then_delete_leaves_no_trace() {
        let mut store = MemoryStore::<Record>::new();
        let mut ctx = Context::new(&mut store);
        let id = ctx.insert("gone".to_string());
        ctx.delete(id).unwrap();

        assert_eq!(ctx.count().unwrap(), 0);
        assert!(ctx.save().unwrap().is_empty());
    }

    #[test]
    fn test_count_includes_pending_changes() {
        let mut store = seeded(&["a", "b", "c"]);
        let mut ctx = Context::new(&mut store);
        ctx.insert("d".to_string());
        let deleted = ctx.delete_where(|r: &Record| r.key == "a").unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(ctx.count().unwrap(), 3);
    }

    #[test]
    fn test_deleted_entity_rejects_access() {
        let mut store = seeded(&["a"]);
        let mut ctx = Context::new(&mut store);
        let id = ctx.fetch_sorted(&["a".to_string()]).unwrap()[0].1;
        ctx.delete(id).unwrap();

        assert!(matches!(
            ctx.entity_mut(id),
            Err(ZipSyncError::EntityDeleted { .. })
        ));
        assert!(ctx.fetch_sorted(&["a".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_rollback_discards_pending_inserts() {
        let mut store = MemoryStore::<Record>::new();
        let mut ctx = Context::new(&mut store);
        ctx.insert("a".to_string());
        ctx.rollback();

        assert_eq!(ctx.count().unwrap(), 0);
        assert!(!ctx.has_changes());
    }

    #[test]
    fn test_fetch_or_insert_registers_in_cache() {
        let mut store = seeded(&["a"]);
        let cache = EntityCache::new();
        let mut ctx = Context::new(&mut store);

        let existing = ctx.fetch_or_insert("a".to_string(), Some(&cache)).unwrap();
        let created = ctx.fetch_or_insert("z".to_string(), Some(&cache)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(ctx.state(existing), Some(SlotState::Fetched));
        assert_eq!(ctx.state(created), Some(SlotState::Inserted));
        assert_eq!(
            ctx.fetch_object(&"z".to_string(), Some(&cache)).unwrap(),
            Some(created)
        );
    }

    #[test]
    fn test_key_lookup_follows_stabilisation_delete_and_save() {
        let mut store = seeded(&["a", "b"]);
        let mut ctx = Context::new(&mut store);
        let key = |k: &str| vec![k.to_string()];

        // a pending insert is found under its stable id once stabilised
        let pending = ctx.insert("p".to_string());
        let stable = ctx.obtain_permanent_ids(&[pending]).unwrap()[0];
        assert_eq!(
            ctx.fetch_sorted(&key("p")).unwrap(),
            vec![("p".to_string(), EntityId::Stable(stable))]
        );

        // a dropped pending insert and a deleted committed entity are gone
        let dropped = ctx.insert("q".to_string());
        ctx.delete(dropped).unwrap();
        let a = ctx.fetch_sorted(&key("a")).unwrap()[0].1;
        ctx.delete(a).unwrap();
        assert!(ctx.fetch_sorted(&key("q")).unwrap().is_empty());
        assert!(ctx.fetch_sorted(&key("a")).unwrap().is_empty());

        // after saving, the remaining entities are still found exactly once
        ctx.save().unwrap();
        let all = ctx
            .fetch_sorted(&["a", "b", "p", "q"].map(String::from))
            .unwrap();
        let keys: Vec<&str> = all.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "p"]);
    }
}
