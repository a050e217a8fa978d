//! Change-to-edit diff emitter.
//!
//! Raw per-item change notifications are classified into list edit
//! operations and accumulated between a will-change and a did-change
//! boundary, then handed to the consumer as one atomic batch.
//!
//! ## Entry points
//!
//! - [`classify`] turns one [`RawChange`] into one or two edits.
//! - [`DiffEmitter`] buffers edits for one batch.
//! - [`run_emitter`] drives an emitter from a channel of [`DiffMessage`]s.
//! - [`diff_snapshots`] derives raw changes from two ordered snapshots.
//!
//! ## Guarantees
//!
//! - A change that moves an item always yields an update at the old position
//!   followed by the move, so a visible row is refreshed before it is moved.
//! - No edit is emitted outside a will-change/did-change pair.
//! - Malformed changes are contract violations and panic.

pub mod channel;
pub mod classify;
pub mod emitter;
pub mod model;
pub mod snapshot;

pub use channel::{run_emitter, DiffMessage};
pub use classify::{classify, classify_section};
pub use emitter::DiffEmitter;
pub use model::{ChangeKind, EditOperation, IndexPath, RawChange, SectionChange};
pub use snapshot::{
    diff_snapshots, edits_for_snapshots, Snapshot, SnapshotChanges, SnapshotItem, SnapshotSection,
};
