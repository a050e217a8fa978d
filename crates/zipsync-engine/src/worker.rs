//! Single-writer store worker.
//!
//! A [`StoreWorker`] moves a store onto a dedicated thread and runs the jobs
//! submitted to it one at a time, in submission order. Callers never touch
//! the store directly; they get a [`JobHandle`] per job and wait on it.
//!
//! ```text
//! callers (many)
//!   ↓ submit
//! job queue (crossbeam channel, FIFO)
//!   ↓
//! store thread: owns the store and the identity cache
//!   ↓
//! per-job result channel → JobHandle::wait
//! ```
//!
//! Cancelling a job that has not started yet discards it. Cancelling a
//! running import stops it at the next chunk boundary; the chunk in flight
//! is rolled back and earlier chunks stay committed.
//!
//! Each job carries the [`RequestContext`] captured when it was submitted.
//! The worker logs its request id and queue wait with the job's start and
//! end lines; [`JobHandle::request_id`] returns the same id to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use zipsync_core::{
    batch_delete, import_batch, CancelFlag, Changeset, Entity, EntityCache, ImportOptions,
    ImportProgress, KeyedStore, Result, StableId, Updatable, ZipSyncError,
};
use zipsync_core::{log_op_end, log_op_error, log_op_start};
use zipsync_core_types::{JobId, RequestContext, RequestId};

type Task<S> = Box<dyn FnOnce(&mut S, Option<&EntityCache>, &CancelFlag) -> Result<()> + Send>;

struct Envelope<S> {
    id: JobId,
    request: RequestContext,
    cancel: CancelFlag,
    task: Task<S>,
}

/// Owner thread for one store
pub struct StoreWorker<S> {
    jobs: Option<Sender<Envelope<S>>>,
    thread: Option<JoinHandle<S>>,
    next_id: AtomicU64,
}

/// Handle to one submitted job
pub struct JobHandle<T> {
    id: JobId,
    request_id: RequestId,
    cancel: CancelFlag,
    result: Receiver<Result<T>>,
    progress: Receiver<ImportProgress>,
}

impl<T> JobHandle<T> {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Request id the worker logs for this job
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Ask the worker to discard this job, or to stop it at the next chunk
    /// boundary if it is already running.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Progress reports of an import job; never yields for other jobs.
    pub fn progress(&self) -> &Receiver<ImportProgress> {
        &self.progress
    }

    /// Block until the job has run.
    ///
    /// # Errors
    ///
    /// Returns the job's own error, `Cancelled` for a discarded job, or
    /// `WorkerUnavailable` if the worker stopped before reporting.
    pub fn wait(self) -> Result<T> {
        self.result
            .recv()
            .map_err(|_| ZipSyncError::WorkerUnavailable {
                reason: format!("store worker stopped before finishing {}", self.id),
            })?
    }

    /// The job's result if it has already run.
    pub fn try_wait(&self) -> Option<Result<T>> {
        self.result.try_recv().ok()
    }
}

impl<S: Send + 'static> StoreWorker<S> {
    /// Move `store` onto a new worker thread. With a `cache`, every import
    /// job on this worker shares it.
    ///
    /// # Errors
    ///
    /// Returns `WorkerUnavailable` if the thread cannot be started.
    pub fn spawn(store: S, cache: Option<EntityCache>) -> Result<Self> {
        let (jobs_tx, jobs_rx) = unbounded::<Envelope<S>>();
        let thread = thread::Builder::new()
            .name("zipsync-store".to_string())
            .spawn(move || run_jobs(store, cache, jobs_rx))
            .map_err(|e| ZipSyncError::WorkerUnavailable {
                reason: e.to_string(),
            })?;

        Ok(Self {
            jobs: Some(jobs_tx),
            thread: Some(thread),
            next_id: AtomicU64::new(1),
        })
    }

    /// Queue an import of `intermediates`.
    ///
    /// # Errors
    ///
    /// Returns `WorkerUnavailable` if the worker has stopped.
    pub fn submit_import<I>(
        &self,
        intermediates: Vec<I>,
        options: ImportOptions,
    ) -> Result<JobHandle<Changeset>>
    where
        I: Updatable + Send + 'static,
        S: KeyedStore<I::Entity>,
    {
        let (progress_tx, progress_rx) = unbounded();
        self.enqueue(progress_rx, move |store, cache, cancel| {
            import_batch(store, &intermediates, &options, cache, cancel, |p| {
                // The handle may have been dropped; progress is best effort.
                let _ = progress_tx.send(p);
            })
        })
    }

    /// Queue a direct delete of every committed entity matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `WorkerUnavailable` if the worker has stopped.
    pub fn submit_batch_delete<E, F>(&self, predicate: F) -> Result<JobHandle<Vec<StableId>>>
    where
        E: Entity,
        F: Fn(&E) -> bool + Send + 'static,
        S: KeyedStore<E>,
    {
        let (_, progress_rx) = unbounded();
        self.enqueue(progress_rx, move |store, _, _| {
            batch_delete::<E, _>(store, &predicate)
        })
    }

    /// Queue arbitrary work against the store, e.g. a read.
    ///
    /// # Errors
    ///
    /// Returns `WorkerUnavailable` if the worker has stopped.
    pub fn submit<T, F>(&self, job: F) -> Result<JobHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> Result<T> + Send + 'static,
    {
        let (_, progress_rx) = unbounded();
        self.enqueue(progress_rx, move |store, _, _| job(store))
    }

    fn enqueue<T, F>(&self, progress: Receiver<ImportProgress>, job: F) -> Result<JobHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut S, Option<&EntityCache>, &CancelFlag) -> Result<T> + Send + 'static,
    {
        let unavailable = || ZipSyncError::WorkerUnavailable {
            reason: "store worker has shut down".to_string(),
        };
        let jobs = self.jobs.as_ref().ok_or_else(unavailable)?;

        let id = JobId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = RequestContext::new();
        let request_id = request.request_id;
        let cancel = CancelFlag::new();
        let (result_tx, result_rx) = bounded(1);

        let task: Task<S> = Box::new(move |store, cache, cancel| {
            let result = if cancel.is_cancelled() {
                Err(ZipSyncError::Cancelled {
                    committed_batches: 0,
                })
            } else {
                job(store, cache, cancel)
            };
            let status = result.as_ref().map(|_| ()).map_err(Clone::clone);
            let _ = result_tx.send(result);
            status
        });

        jobs.send(Envelope {
            id,
            request,
            cancel: cancel.clone(),
            task,
        })
        .map_err(|_| unavailable())?;

        Ok(JobHandle {
            id,
            request_id,
            cancel,
            result: result_rx,
            progress,
        })
    }

    /// Finish every queued job, stop the thread and hand the store back.
    ///
    /// # Errors
    ///
    /// Returns `WorkerUnavailable` if the worker thread panicked.
    pub fn shutdown(mut self) -> Result<S> {
        self.jobs.take();
        let thread = self
            .thread
            .take()
            .ok_or_else(|| ZipSyncError::WorkerUnavailable {
                reason: "store worker already stopped".to_string(),
            })?;
        thread.join().map_err(|_| ZipSyncError::WorkerUnavailable {
            reason: "store worker panicked".to_string(),
        })
    }
}

impl<S> Drop for StoreWorker<S> {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run_jobs<S>(mut store: S, cache: Option<EntityCache>, jobs: Receiver<Envelope<S>>) -> S {
    for envelope in jobs.iter() {
        let request_id = envelope.request.request_id;
        log_op_start!(
            "store_job",
            job_id = envelope.id.value(),
            request_id = %request_id,
            queued_ms = envelope.request.elapsed().as_millis() as u64
        );
        let start = std::time::Instant::now();

        match (envelope.task)(&mut store, cache.as_ref(), &envelope.cancel) {
            Ok(()) => {
                log_op_end!(
                    "store_job",
                    duration_ms = start.elapsed().as_millis() as u64,
                    job_id = envelope.id.value(),
                    request_id = %request_id
                );
            }
            Err(err) => {
                log_op_error!(
                    "store_job",
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    job_id = envelope.id.value(),
                    request_id = %request_id
                );
            }
        }
    }
    store
}
