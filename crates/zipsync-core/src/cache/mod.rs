//! Caller-owned caches used to short-circuit reconciliation fetches.

pub mod bounded;
pub mod entity_cache;

pub use bounded::{Cache, EvictionCallback};
pub use entity_cache::EntityCache;
