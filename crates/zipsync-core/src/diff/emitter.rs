use super::classify::{classify, classify_section};
use super::model::{EditOperation, RawChange, SectionChange};
use crate::log_op_progress;

/// Accumulates the edits of one change batch.
///
/// ```
/// use zipsync_core::diff::{DiffEmitter, IndexPath, RawChange};
///
/// let mut emitter = DiffEmitter::new();
/// emitter.will_change();
/// emitter.push(RawChange::moved(IndexPath::new(0, 0), IndexPath::new(0, 5), "row"));
/// let edits = emitter.did_change();
/// assert_eq!(edits.len(), 2);
/// ```
#[derive(Debug)]
pub struct DiffEmitter<P> {
    buffer: Vec<EditOperation<P>>,
    in_batch: bool,
    batches: u64,
}

impl<P> Default for DiffEmitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> DiffEmitter<P> {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            in_batch: false,
            batches: 0,
        }
    }

    /// Open a batch, dropping anything left from an unfinished one.
    pub fn will_change(&mut self) {
        self.buffer.clear();
        self.in_batch = true;
    }

    /// # Panics
    ///
    /// Panics outside a batch or when `change` is malformed.
    pub fn push(&mut self, change: RawChange<P>) {
        assert!(
            self.in_batch,
            "item change received outside a will_change/did_change batch"
        );
        self.buffer.extend(classify(change));
    }

    /// # Panics
    ///
    /// Panics outside a batch.
    pub fn push_section(&mut self, change: SectionChange) {
        assert!(
            self.in_batch,
            "section change received outside a will_change/did_change batch"
        );
        self.buffer.push(classify_section(change));
    }

    /// Close the batch and hand over its edits in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if no batch is open.
    pub fn did_change(&mut self) -> Vec<EditOperation<P>> {
        assert!(self.in_batch, "did_change called without will_change");
        self.in_batch = false;
        self.batches += 1;
        let edits = std::mem::take(&mut self.buffer);
        log_op_progress!(
            "diff_batch",
            batch = self.batches,
            edits = edits.len()
        );
        edits
    }

    /// Abandon the open batch without emitting anything.
    pub fn discard(&mut self) {
        self.buffer.clear();
        self.in_batch = false;
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_in_batch(&self) -> bool {
        self.in_batch
    }

    /// Number of batches flushed so far
    pub fn batches(&self) -> u64 {
        self.batches
    }
}
