//! Import operations built on the reconciler.
//!
//! An import applies intermediates in two passes per chunk: every
//! intermediate's properties first, then every intermediate's
//! relationships. Relationships may point at entities created by the
//! properties pass of the same chunk, which the second pass finds because
//! lookups by key see pending inserts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::EntityCache;
use crate::config::ImportOptions;
use crate::errors::{Result, ZipSyncError};
use crate::model::{Entity, EntityId, StableId, UniqueIdentifiable};
use crate::ops::{Changeset, Context, KeyedStore};
use crate::reconcile::insert_or_update;
use crate::{log_op_end, log_op_error, log_op_progress, log_op_start};

/// An intermediate record that knows how to populate its entity.
pub trait Updatable: UniqueIdentifiable {
    type Entity: Entity<Key = Self::Key>;

    /// Whether the properties pass runs for this type
    const HAS_PROPERTIES: bool = true;
    /// Whether the relationships pass runs for this type
    const HAS_RELATIONSHIPS: bool = false;

    /// Copy plain values onto the entity.
    ///
    /// # Errors
    ///
    /// Implementations return `InvalidInput` for values they cannot apply.
    fn update_properties(&self, _entity: &mut Self::Entity) -> Result<()> {
        Ok(())
    }

    /// Link the entity to others, resolving them through `ctx` and `cache`.
    ///
    /// # Errors
    ///
    /// Implementations propagate lookup failures and return `InvalidInput`
    /// for links they cannot apply.
    fn update_relationships(
        &self,
        _id: EntityId,
        _ctx: &mut Context<'_, Self::Entity>,
        _cache: Option<&EntityCache>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Number of configure passes an import of `I` makes over its input
pub fn pass_count<I: Updatable>() -> usize {
    usize::from(I::HAS_PROPERTIES) + usize::from(I::HAS_RELATIONSHIPS)
}

/// Shared flag for cancelling a running import
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configure calls completed so far out of the total for the import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportProgress {
    pub completed: usize,
    pub total: usize,
}

impl ImportProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Import `intermediates` in chunks of `options.batch_size`, saving after
/// each chunk, and return the accumulated changeset.
///
/// Cancellation is checked before each chunk and again before each save.
/// A cancelled chunk is rolled back entirely; chunks saved earlier stay
/// committed. A configure error also rolls back the current chunk.
///
/// # Errors
///
/// Returns `InvalidConfig` for unusable options, `Cancelled` when `cancel`
/// was raised, `StoreFetch` or a commit error from the store, or the first
/// error from an `Updatable` callback.
pub fn import_batch<I, P>(
    store: &mut dyn KeyedStore<I::Entity>,
    intermediates: &[I],
    options: &ImportOptions,
    cache: Option<&EntityCache>,
    cancel: &CancelFlag,
    mut progress: P,
) -> Result<Changeset>
where
    I: Updatable,
    P: FnMut(ImportProgress),
{
    options.validate()?;
    let entity = <I::Entity as Entity>::ENTITY_NAME;
    log_op_start!(
        "import_batch",
        entity = entity,
        batch_len = intermediates.len()
    );
    let start = std::time::Instant::now();

    let total = intermediates.len() * pass_count::<I>();
    let mut completed = 0usize;
    let mut committed_batches = 0usize;
    let mut changes = Changeset::default();
    let mut ctx = Context::new(store);

    for chunk in intermediates.chunks(options.batch_size) {
        let outcome = import_chunk(
            &mut ctx,
            chunk,
            cache,
            cancel,
            committed_batches,
            &mut |step| {
                completed += step;
                progress(ImportProgress { completed, total });
            },
        );
        match outcome {
            Ok(saved) => {
                changes = changes.merged(saved);
                committed_batches += 1;
                log_op_progress!(
                    "import_batch",
                    entity = entity,
                    committed_batches = committed_batches,
                    completed = completed,
                    total = total
                );
            }
            Err(err) => {
                ctx.rollback();
                log_op_error!(
                    "import_batch",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = entity,
                    committed_batches = committed_batches
                );
                return Err(err);
            }
        }
    }

    log_op_end!(
        "import_batch",
        duration_ms = start.elapsed().as_millis() as u64,
        entity = entity,
        inserted = changes.inserted().len(),
        updated = changes.updated().len()
    );
    Ok(changes)
}

fn import_chunk<I, S>(
    ctx: &mut Context<'_, I::Entity>,
    chunk: &[I],
    cache: Option<&EntityCache>,
    cancel: &CancelFlag,
    committed_batches: usize,
    step: &mut S,
) -> Result<Changeset>
where
    I: Updatable,
    S: FnMut(usize),
{
    let cancelled = || ZipSyncError::Cancelled { committed_batches };
    if cancel.is_cancelled() {
        return Err(cancelled());
    }

    if I::HAS_PROPERTIES {
        insert_or_update(ctx, chunk, cache, |intermediate, id, ctx| {
            intermediate.update_properties(ctx.entity_mut(id)?)?;
            step(1);
            Ok(())
        })?;
    }

    if I::HAS_RELATIONSHIPS {
        insert_or_update(ctx, chunk, cache, |intermediate, id, ctx| {
            intermediate.update_relationships(id, ctx, cache)?;
            step(1);
            Ok(())
        })?;
    }

    if cancel.is_cancelled() {
        return Err(cancelled());
    }
    ctx.save()
}

/// Import a single intermediate: find or create its entity, run both
/// passes and save.
///
/// # Errors
///
/// Returns lookup, callback and commit errors; nothing is saved on error.
pub fn import_one<I: Updatable>(
    store: &mut dyn KeyedStore<I::Entity>,
    intermediate: &I,
    cache: Option<&EntityCache>,
) -> Result<Changeset> {
    let mut ctx = Context::new(store);
    let id = ctx.fetch_or_insert(intermediate.unique_key(), cache)?;
    if I::HAS_PROPERTIES {
        intermediate.update_properties(ctx.entity_mut(id)?)?;
    }
    if I::HAS_RELATIONSHIPS {
        intermediate.update_relationships(id, &mut ctx, cache)?;
    }
    ctx.save()
}

/// Delete every committed entity matching `predicate` directly in the
/// store and return the removed ids.
///
/// # Errors
///
/// Returns the store's delete error.
pub fn batch_delete<E, F>(store: &mut dyn KeyedStore<E>, predicate: F) -> Result<Vec<StableId>>
where
    E: Entity,
    F: Fn(&E) -> bool,
{
    log_op_start!("batch_delete", entity = E::ENTITY_NAME);
    let start = std::time::Instant::now();

    match store.batch_delete(&predicate) {
        Ok(removed) => {
            log_op_end!(
                "batch_delete",
                duration_ms = start.elapsed().as_millis() as u64,
                entity = E::ENTITY_NAME,
                deleted = removed.len()
            );
            Ok(removed)
        }
        Err(err) => {
            log_op_error!(
                "batch_delete",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                entity = E::ENTITY_NAME
            );
            Err(err)
        }
    }
}
