//! Per-job bookkeeping: identity, lifecycle state, cancellation and the blobs a job owns.

mod registry;
mod storage;

pub use registry::{ActiveJobGuard, ActiveJobs};
pub use storage::ScopedStorage;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rand::{distributions::Alphanumeric, Rng};

use crate::{KasaneError, KasaneResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Resolving,
    Fetching,
    Reassembling,
    Delivering,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Cooperative cancellation flag shared between a job and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> KasaneResult<()> {
        if self.is_cancelled() {
            Err(KasaneError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// State of one download job.
#[derive(Debug)]
pub struct JobContext {
    id: String,
    file_name: String,
    cancel: CancelHandle,
    state: JobState,
}

impl JobContext {
    pub fn new(file_name: impl Into<String>, cancel: CancelHandle) -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        Self::with_id(id, file_name, cancel)
    }

    pub fn with_id(id: impl Into<String>, file_name: impl Into<String>, cancel: CancelHandle) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            cancel,
            state: JobState::Created,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `state`. Terminal states are final and later transitions are ignored.
    pub fn transition(&mut self, state: JobState) {
        if self.state.is_terminal() {
            tracing::debug!("Job {} already {:?}, ignoring {:?}", self.id, self.state, state);
            return;
        }
        tracing::debug!("Job {}: {:?} -> {:?}", self.id, self.state, state);
        self.state = state;
    }
}
