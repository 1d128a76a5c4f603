use std::sync::atomic::{AtomicUsize, Ordering};

static GLOBAL_ACTIVE_JOBS: ActiveJobs = ActiveJobs::new();

/// Count of jobs in flight. Hosts use it to stay alive while work is pending.
#[derive(Debug, Default)]
pub struct ActiveJobs {
    count: AtomicUsize,
}

impl ActiveJobs {
    pub const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    /// Process-wide registry used by the pipeline.
    pub fn global() -> &'static ActiveJobs {
        &GLOBAL_ACTIVE_JOBS
    }

    /// Register a job. It stays registered until the returned guard is dropped.
    pub fn add(&self) -> ActiveJobGuard<'_> {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Job added. Active jobs: {count}");
        ActiveJobGuard { registry: self }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }
}

#[must_use = "the job is unregistered as soon as the guard is dropped"]
pub struct ActiveJobGuard<'a> {
    registry: &'a ActiveJobs,
}

impl Drop for ActiveJobGuard<'_> {
    fn drop(&mut self) {
        let count = self.registry.count.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!("Job removed. Active jobs: {count}");
    }
}
