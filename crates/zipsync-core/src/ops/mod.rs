pub mod changeset;
pub mod context;
pub mod store;

pub use changeset::Changeset;
pub use context::{Context, SlotState};
pub use store::{CommitSet, KeyedStore, MemoryStore, StoredEntity};
