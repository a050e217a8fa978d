//! Diff emitter on its own thread.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use zipsync_core::diff::{run_emitter, DiffMessage, EditOperation, RawChange, SectionChange};
use zipsync_core::{Result, ZipSyncError};

/// A running diff emitter fed through a channel.
///
/// Change sources send [`DiffMessage`]s (directly or through the helper
/// methods); every completed batch arrives on [`batches`](DiffWorker::batches)
/// as one edit list. A malformed change panics the emitter thread, after
/// which sends fail with `WorkerUnavailable`.
pub struct DiffWorker<P> {
    messages: Sender<DiffMessage<P>>,
    batches: Receiver<Vec<EditOperation<P>>>,
    thread: JoinHandle<usize>,
}

impl<P: Send + 'static> DiffWorker<P> {
    /// # Errors
    ///
    /// Returns `WorkerUnavailable` if the thread cannot be started.
    pub fn spawn() -> Result<Self> {
        let (messages, inbox) = unbounded();
        let (outbox, batches) = unbounded();
        let thread = thread::Builder::new()
            .name("zipsync-diff".to_string())
            .spawn(move || run_emitter(inbox, outbox))
            .map_err(|e| ZipSyncError::WorkerUnavailable {
                reason: e.to_string(),
            })?;
        Ok(Self {
            messages,
            batches,
            thread,
        })
    }

    /// Another sender for a change source on a different thread
    pub fn sender(&self) -> Sender<DiffMessage<P>> {
        self.messages.clone()
    }

    pub fn batches(&self) -> &Receiver<Vec<EditOperation<P>>> {
        &self.batches
    }

    /// # Errors
    ///
    /// Returns `WorkerUnavailable` if the emitter thread has stopped.
    pub fn send(&self, message: DiffMessage<P>) -> Result<()> {
        self.messages
            .send(message)
            .map_err(|_| ZipSyncError::WorkerUnavailable {
                reason: "diff emitter has stopped".to_string(),
            })
    }

    /// # Errors
    ///
    /// Same as [`send`](DiffWorker::send).
    pub fn begin_batch(&self) -> Result<()> {
        self.send(DiffMessage::BeginBatch)
    }

    /// # Errors
    ///
    /// Same as [`send`](DiffWorker::send).
    pub fn push(&self, change: RawChange<P>) -> Result<()> {
        self.send(DiffMessage::Change(change))
    }

    /// # Errors
    ///
    /// Same as [`send`](DiffWorker::send).
    pub fn push_section(&self, change: SectionChange) -> Result<()> {
        self.send(DiffMessage::Section(change))
    }

    /// # Errors
    ///
    /// Same as [`send`](DiffWorker::send).
    pub fn end_batch(&self) -> Result<()> {
        self.send(DiffMessage::EndBatch)
    }

    /// Block until the next completed batch arrives.
    ///
    /// # Errors
    ///
    /// Returns `WorkerUnavailable` once the emitter has stopped and every
    /// batch has been received.
    pub fn recv_batch(&self) -> Result<Vec<EditOperation<P>>> {
        self.batches
            .recv()
            .map_err(|_| ZipSyncError::WorkerUnavailable {
                reason: "diff emitter has stopped".to_string(),
            })
    }

    /// Close this worker's sender and wait for the emitter to drain.
    /// Returns the number of batches emitted over the worker's lifetime.
    ///
    /// Senders handed out by [`sender`](DiffWorker::sender) must be dropped
    /// too, or this blocks.
    ///
    /// # Errors
    ///
    /// Returns `WorkerUnavailable` if the emitter thread panicked.
    pub fn finish(self) -> Result<usize> {
        let DiffWorker {
            messages,
            batches,
            thread,
        } = self;
        drop(messages);
        let emitted = thread.join().map_err(|_| ZipSyncError::WorkerUnavailable {
            reason: "diff emitter panicked".to_string(),
        });
        drop(batches);
        emitted
    }
}
