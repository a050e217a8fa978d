//! Channel-driven emitter loop.

use crossbeam_channel::{Receiver, Sender};

use super::emitter::DiffEmitter;
use super::model::{EditOperation, RawChange, SectionChange};

/// Message from a change source to the emitter loop
#[derive(Debug, Clone, PartialEq)]
pub enum DiffMessage<P> {
    BeginBatch,
    Change(RawChange<P>),
    Section(SectionChange),
    EndBatch,
}

/// Consume `messages` until the sending side disconnects, sending one edit
/// list per completed batch to `batches`. Returns the number of batches
/// sent.
///
/// A batch still open when `messages` disconnects is dropped. The loop also
/// stops early once `batches` has no receiver.
///
/// # Panics
///
/// Panics on a change or `EndBatch` received outside a batch, and on a
/// malformed change.
pub fn run_emitter<P>(
    messages: Receiver<DiffMessage<P>>,
    batches: Sender<Vec<EditOperation<P>>>,
) -> usize {
    let mut emitter = DiffEmitter::new();
    let mut sent = 0;

    for message in messages.iter() {
        match message {
            DiffMessage::BeginBatch => {
                if emitter.is_in_batch() {
                    tracing::warn!(
                        pending = emitter.pending_len(),
                        "batch restarted before it ended; pending edits dropped"
                    );
                }
                emitter.will_change();
            }
            DiffMessage::Change(change) => emitter.push(change),
            DiffMessage::Section(change) => emitter.push_section(change),
            DiffMessage::EndBatch => {
                if batches.send(emitter.did_change()).is_err() {
                    break;
                }
                sent += 1;
            }
        }
    }

    if emitter.is_in_batch() {
        tracing::debug!(
            pending = emitter.pending_len(),
            "change source disconnected mid-batch; batch dropped"
        );
        emitter.discard();
    }
    sent
}
