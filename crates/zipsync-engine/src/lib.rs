//! zipsync engine - threading around the core algorithms
//!
//! The core reconciler and diff emitter are synchronous. This crate confines
//! each store to one writer thread that runs jobs in submission order, and
//! runs the diff emitter on its own thread behind channels.

pub mod diff_worker;
pub mod worker;

pub use diff_worker::DiffWorker;
pub use worker::{JobHandle, StoreWorker};
