//! Batch insert-or-update by unique key.
//!
//! The reconciler sorts a batch of intermediates by key, loads every
//! matching entity with a single fetch and pairs the two sorted sequences in
//! one linear walk. Intermediates without a match get a fresh entity seeded
//! with their key.
//!
//! # Fetch snapshot
//!
//! The matching entities are looked up once, before any configure callback
//! runs. Entities inserted after that point are not part of the snapshot.
//! Calling [`insert_or_update`] again from inside `configure` over keys that
//! the outer call has not reached yet therefore creates a second entity for
//! each of those keys: the inner call inserts them, and the outer call later
//! inserts its own copy from its stale snapshot. An identity cache does not
//! prevent this, because entities are registered in the cache only after the
//! configure pass completes.
//!
//! # Duplicate keys
//!
//! A batch must not contain the same key twice. The reconciler does not
//! de-duplicate; use [`check_unique_keys`] to validate a batch first.

pub mod merge;

use std::collections::HashMap;

use crate::cache::EntityCache;
use crate::errors::{Result, ZipSyncError};
use crate::model::{Entity, EntityId, UniqueIdentifiable};
use crate::ops::Context;
use crate::{log_op_end, log_op_error, log_op_start};

pub use merge::{merge_sorted, Pairing};

/// Outcome of one reconciliation, in key order
#[derive(Debug)]
pub struct Reconciliation<'a, I> {
    pub to_update: Vec<(&'a I, EntityId)>,
    pub to_insert: Vec<(&'a I, EntityId)>,
}

impl<I> Default for Reconciliation<'_, I> {
    fn default() -> Self {
        Self {
            to_update: Vec::new(),
            to_insert: Vec::new(),
        }
    }
}

impl<I> Reconciliation<'_, I> {
    pub fn len(&self) -> usize {
        self.to_update.len() + self.to_insert.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entity touched, updates first
    pub fn ids(&self) -> Vec<EntityId> {
        self.to_update
            .iter()
            .chain(&self.to_insert)
            .map(|(_, id)| *id)
            .collect()
    }
}

/// Pair every intermediate with an existing entity or a new one.
///
/// New entities are inserted into `ctx` immediately. With a `cache`, keys it
/// already knows skip the fetch, and every touched entity is registered in it
/// afterwards.
///
/// # Errors
///
/// Returns `StoreFetch` when the batch lookup fails. No entity is inserted
/// in that case.
pub fn reconcile<'a, E, I>(
    ctx: &mut Context<'_, E>,
    intermediates: &'a [I],
    cache: Option<&EntityCache>,
) -> Result<Reconciliation<'a, I>>
where
    E: Entity,
    I: UniqueIdentifiable<Key = E::Key>,
{
    if intermediates.is_empty() {
        return Ok(Reconciliation::default());
    }
    log_op_start!(
        "reconcile",
        entity = E::ENTITY_NAME,
        batch_len = intermediates.len()
    );
    let start = std::time::Instant::now();

    let pairings = plan(ctx, intermediates, cache).map_err(|err| {
        log_op_error!(
            "reconcile",
            err.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            entity = E::ENTITY_NAME
        );
        err
    })?;

    let mut outcome = Reconciliation::default();
    for pairing in pairings {
        match pairing {
            Pairing::Update(intermediate, id) => outcome.to_update.push((intermediate, id)),
            Pairing::Insert(intermediate) => {
                let id = ctx.insert(intermediate.unique_key());
                outcome.to_insert.push((intermediate, id));
            }
        }
    }

    if let Some(cache) = cache {
        register_live(ctx, cache, &outcome)?;
    }

    log_op_end!(
        "reconcile",
        duration_ms = start.elapsed().as_millis() as u64,
        entity = E::ENTITY_NAME,
        updated = outcome.to_update.len(),
        inserted = outcome.to_insert.len()
    );
    Ok(outcome)
}

/// Reconcile and run `configure` on every pair, in key order.
///
/// A new entity is inserted right before its `configure` call. Errors from
/// `configure` propagate immediately; entities created so far stay in `ctx`
/// (use [`Context::rollback`] to discard them).
///
/// # Errors
///
/// Returns `StoreFetch` when the batch lookup fails, or the first error
/// returned by `configure`.
pub fn insert_or_update<'a, E, I, F>(
    ctx: &mut Context<'_, E>,
    intermediates: &'a [I],
    cache: Option<&EntityCache>,
    mut configure: F,
) -> Result<Reconciliation<'a, I>>
where
    E: Entity,
    I: UniqueIdentifiable<Key = E::Key>,
    F: FnMut(&I, EntityId, &mut Context<'_, E>) -> Result<()>,
{
    if intermediates.is_empty() {
        return Ok(Reconciliation::default());
    }
    log_op_start!(
        "insert_or_update",
        entity = E::ENTITY_NAME,
        batch_len = intermediates.len()
    );
    let start = std::time::Instant::now();

    let result = configure_all(ctx, intermediates, cache, &mut configure);

    match result {
        Ok(outcome) => {
            log_op_end!(
                "insert_or_update",
                duration_ms = start.elapsed().as_millis() as u64,
                entity = E::ENTITY_NAME,
                updated = outcome.to_update.len(),
                inserted = outcome.to_insert.len()
            );
            Ok(outcome)
        }
        Err(err) => {
            log_op_error!(
                "insert_or_update",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                entity = E::ENTITY_NAME
            );
            Err(err)
        }
    }
}

/// Reject a batch that holds the same key more than once.
///
/// # Errors
///
/// Returns `DuplicateKey` naming the smallest repeated key.
pub fn check_unique_keys<E, I>(intermediates: &[I]) -> Result<()>
where
    E: Entity,
    I: UniqueIdentifiable<Key = E::Key>,
{
    let mut keys: Vec<E::Key> = intermediates.iter().map(|i| i.unique_key()).collect();
    keys.sort();
    match keys.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(ZipSyncError::DuplicateKey {
            entity: E::ENTITY_NAME.to_string(),
            key: pair[0].to_string(),
        }),
        None => Ok(()),
    }
}

/// Sort, consult the cache, fetch the rest and merge.
fn plan<'a, E, I>(
    ctx: &mut Context<'_, E>,
    intermediates: &'a [I],
    cache: Option<&EntityCache>,
) -> Result<Vec<Pairing<'a, I>>>
where
    E: Entity,
    I: UniqueIdentifiable<Key = E::Key>,
{
    let mut sorted: Vec<&'a I> = intermediates.iter().collect();
    sorted.sort_by_key(|intermediate| intermediate.unique_key());

    let mut cached: HashMap<usize, EntityId> = HashMap::new();
    if let Some(cache) = cache {
        for (pos, intermediate) in sorted.iter().enumerate() {
            if let Some(id) = cache.object(ctx, &intermediate.unique_key())? {
                cached.insert(pos, id);
            }
        }
    }

    let uncached: Vec<&'a I> = sorted
        .iter()
        .enumerate()
        .filter(|(pos, _)| !cached.contains_key(pos))
        .map(|(_, intermediate)| *intermediate)
        .collect();
    let keys: Vec<E::Key> = uncached.iter().map(|i| i.unique_key()).collect();

    let existing = ctx.fetch_sorted(&keys).map_err(|err| match err {
        ZipSyncError::StoreFetch { .. } => err,
        other => ZipSyncError::StoreFetch {
            entity: E::ENTITY_NAME.to_string(),
            reason: other.to_string(),
        },
    })?;

    let mut merged = merge_sorted(&uncached, &existing).into_iter();
    let mut pairings = Vec::with_capacity(sorted.len());
    for (pos, intermediate) in sorted.iter().enumerate() {
        match cached.get(&pos) {
            Some(id) => pairings.push(Pairing::Update(*intermediate, *id)),
            None => {
                if let Some(pairing) = merged.next() {
                    pairings.push(pairing);
                }
            }
        }
    }
    Ok(pairings)
}

fn configure_all<'a, E, I, F>(
    ctx: &mut Context<'_, E>,
    intermediates: &'a [I],
    cache: Option<&EntityCache>,
    configure: &mut F,
) -> Result<Reconciliation<'a, I>>
where
    E: Entity,
    I: UniqueIdentifiable<Key = E::Key>,
    F: FnMut(&I, EntityId, &mut Context<'_, E>) -> Result<()>,
{
    let pairings = plan(ctx, intermediates, cache)?;
    let mut outcome = Reconciliation::default();
    for pairing in pairings {
        match pairing {
            Pairing::Update(intermediate, id) => {
                configure(intermediate, id, ctx)?;
                outcome.to_update.push((intermediate, id));
            }
            Pairing::Insert(intermediate) => {
                let id = ctx.insert(intermediate.unique_key());
                configure(intermediate, id, ctx)?;
                outcome.to_insert.push((intermediate, id));
            }
        }
    }
    if let Some(cache) = cache {
        register_live(ctx, cache, &outcome)?;
    }
    Ok(outcome)
}

fn register_live<E, I>(
    ctx: &mut Context<'_, E>,
    cache: &EntityCache,
    outcome: &Reconciliation<'_, I>,
) -> Result<()>
where
    E: Entity,
{
    let live: Vec<EntityId> = outcome
        .ids()
        .into_iter()
        .filter(|id| ctx.entity(*id).is_ok())
        .collect();
    cache.register(ctx, &live)
}
