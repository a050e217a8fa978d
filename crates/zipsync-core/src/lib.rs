//! zipsync core - keyed reconciliation and change-to-edit diffing
//!
//! This crate provides:
//! - Unique-key identity with provisional and stable entity ids
//! - A unit-of-work `Context` over a pluggable `KeyedStore`, with an in-memory store
//! - The sorted-merge reconciler (`reconcile`, `insert_or_update`)
//! - Chunked two-pass imports producing a `Changeset`
//! - Bounded caches, including the caller-owned identity cache
//! - The diff emitter: classification, batching, channel driver and snapshot diffing
//! - Error and logging facilities shared by the other zipsync crates

pub mod cache;
pub mod config;
pub mod diff;
pub mod errors;
pub mod import;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod reconcile;

// Re-export commonly used types
pub use cache::{Cache, EntityCache};
pub use config::{CacheOptions, ImportOptions};
pub use errors::{ExError, ExErrorKind, Result, ZipSyncError};
pub use import::{batch_delete, import_batch, import_one, CancelFlag, ImportProgress, Updatable};
pub use model::{Entity, EntityId, Record, RecordInput, StableId, UniqueIdentifiable, UniqueKey};
pub use ops::{Changeset, Context, KeyedStore, MemoryStore};
pub use reconcile::{check_unique_keys, insert_or_update, reconcile, Reconciliation};
