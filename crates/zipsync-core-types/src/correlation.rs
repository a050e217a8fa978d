//! Correlation ids for work handed to a store worker.
//!
//! A [`RequestContext`] is captured on the submitting thread when a job is
//! queued and travels with the job. The worker logs its request id next to
//! the [`JobId`], and the caller reads the same id off its job handle.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id of one submitted request. UUIDv7, so ids sort by submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequence number of a job submitted to a store worker.
///
/// Jobs on one worker are numbered from 1 in submission order, which is
/// also their execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(u64);

impl JobId {
    pub fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Captured at submission; tells the worker who asked and when
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    submitted_at: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            submitted_at: Instant::now(),
        }
    }

    /// Time since submission. Read when a job starts, this is how long it
    /// sat in the queue.
    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
