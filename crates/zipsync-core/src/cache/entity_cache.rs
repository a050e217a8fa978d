use crate::cache::Cache;
use crate::config::CacheOptions;
use crate::errors::Result;
use crate::model::{Entity, EntityId, StableId, UniqueKey};
use crate::ops::Context;

/// Identity cache from `(entity name, unique key)` to stable id.
///
/// Owned by the caller and passed by reference into reconciliation. Only
/// stable ids are cached, so registration stabilises provisional entities
/// first.
pub struct EntityCache {
    ids: Cache<(&'static str, String), StableId>,
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityCache {
    pub fn new() -> Self {
        Self {
            ids: Cache::named("entity-ids"),
        }
    }

    pub fn from_options(options: &CacheOptions) -> Self {
        let cache = Self::new();
        cache.ids.set_count_limit(options.count_limit);
        cache.ids.set_total_cost_limit(options.total_cost_limit);
        cache
    }

    /// Remember every entity in `ids` under its current key.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `EntityDeleted` if an id no longer
    /// resolves in `ctx`.
    pub fn register<E: Entity>(&self, ctx: &mut Context<'_, E>, ids: &[EntityId]) -> Result<()> {
        let stable = ctx.obtain_permanent_ids(ids)?;
        for (id, stable_id) in ids.iter().zip(stable) {
            let key = ctx.entity(*id)?.unique_key();
            self.ids
                .insert(stable_id, (E::ENTITY_NAME, key.to_string()), 1);
        }
        Ok(())
    }

    /// Look up the entity cached for `key`, loading it into `ctx` if needed.
    ///
    /// A cached id whose entity is gone is dropped and reported as a miss.
    ///
    /// # Errors
    ///
    /// Returns `StoreFetch` if loading the entity from the store fails.
    pub fn object<E: Entity>(
        &self,
        ctx: &mut Context<'_, E>,
        key: &E::Key,
    ) -> Result<Option<EntityId>> {
        let cache_key = (E::ENTITY_NAME, key.to_string());
        let Some(stable_id) = self.ids.value(&cache_key) else {
            return Ok(None);
        };
        match ctx.object_with_id(stable_id)? {
            Some(id) => Ok(Some(id)),
            None => {
                self.ids.remove(&cache_key);
                Ok(None)
            }
        }
    }

    /// Forget one key.
    pub fn forget<K: UniqueKey>(&self, entity_name: &'static str, key: &K) {
        self.ids.remove(&(entity_name, key.to_string()));
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&self) {
        self.ids.clear();
    }

    /// Underlying cache, for installing an eviction callback or adjusting
    /// limits.
    pub fn ids(&self) -> &Cache<(&'static str, String), StableId> {
        &self.ids
    }
}
