//! Tokio blocking-pool adapter
//!
//! Lets a host that already runs a tokio runtime register that runtime's
//! blocking pool as a service instead of starting another set of threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

use super::{ExecutionContext, Job};
use crate::error::{Error, Result};

/// Runs jobs with [`Handle::spawn_blocking`]
///
/// Submitting after the runtime shut down fails with
/// [`Error::ContextShutdown`].
#[derive(Debug, Clone)]
pub struct TokioBlocking {
    handle: Handle,
}

impl TokioBlocking {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the calling thread is running in
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| Error::Internal(format!("No tokio runtime on this thread: {}", e)))
    }
}

/// Flags a job that tokio dropped without running it
struct Guarded {
    job: Option<Job>,
    dropped: Arc<AtomicBool>,
}

impl Guarded {
    fn run(mut self) {
        if let Some(job) = self.job.take() {
            job();
        }
    }
}

impl Drop for Guarded {
    fn drop(&mut self) {
        if self.job.is_some() {
            self.dropped.store(true, Ordering::Release);
        }
    }
}

impl ExecutionContext for TokioBlocking {
    fn execute(&self, job: Job) -> Result<()> {
        let dropped = Arc::new(AtomicBool::new(false));
        let guarded = Guarded {
            job: Some(job),
            dropped: Arc::clone(&dropped),
        };

        // A runtime that is shutting down drops the task inside this call.
        // The join handle is detached; the outcome travels through the job itself.
        drop(self.handle.spawn_blocking(move || guarded.run()));

        if dropped.load(Ordering::Acquire) {
            return Err(Error::context_shutdown(self.describe()));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "tokio blocking pool".to_string()
    }
}
