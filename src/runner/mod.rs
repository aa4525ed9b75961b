//! Async task runner
//!
//! Runs work on the active execution context and delivers the outcome to the
//! main context. Per submission:
//! 1. `before_start` fires on the caller's thread
//! 2. the work runs on the active context, its result or panic captured
//! 3. exactly one terminal callback is posted to the main context

mod callback;
mod outcome;

pub use callback::{callbacks, Callbacks, TaskCallback};
pub use outcome::{TaskOutcome, WorkError};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::config::RunnerConfig;
use crate::context::{ExecutionContext, Job};
use crate::dispatch::MainContext;
use crate::error::Result;
use crate::logging;
use crate::registry::{ExecutorRegistry, SharedContext};

// ─────────────────────────────────────────────────────────────────
// Task Runner
// ─────────────────────────────────────────────────────────────────

/// Owns the executor registry and the main context handle
///
/// Registration and selection take `&mut self`; submission takes `&self`.
/// The active context is resolved when a task is submitted, so a later
/// `set_service` does not move work that is already queued.
pub struct TaskRunner {
    registry: ExecutorRegistry,
    main: Arc<dyn MainContext>,
    next_task_id: AtomicU64,
    submitted: AtomicU64,
}

impl TaskRunner {
    /// Runner with the built-in services and `single` active
    pub fn new(main: impl MainContext + 'static) -> Self {
        Self::with_registry(ExecutorRegistry::new(), main)
    }

    /// Runner with built-ins sized and selected by configuration
    pub fn from_config(config: &RunnerConfig, main: impl MainContext + 'static) -> Result<Self> {
        let mut registry =
            ExecutorRegistry::with_presets(config.multi.pool_config(), config.single.pool_config())?;
        registry.select(&config.runner.default_service)?;

        Ok(Self::with_registry(registry, main))
    }

    pub fn with_registry(registry: ExecutorRegistry, main: impl MainContext + 'static) -> Self {
        Self {
            registry,
            main: Arc::new(main),
            next_task_id: AtomicU64::new(1),
            submitted: AtomicU64::new(0),
        }
    }

    /// Add or overwrite a named service
    pub fn register_service(
        &mut self,
        name: impl Into<String>,
        context: impl ExecutionContext + 'static,
    ) -> &mut Self {
        self.registry.register(name, context);
        self
    }

    pub fn register_shared_service(&mut self, name: impl Into<String>, context: SharedContext) -> &mut Self {
        self.registry.register_shared(name, context);
        self
    }

    /// Make `name` the active service
    pub fn set_service(&mut self, name: &str) -> Result<&mut Self> {
        self.registry.select(name)?;
        Ok(self)
    }

    pub fn active_service(&self) -> &str {
        self.registry.active_name()
    }

    /// Registered service names, sorted
    pub fn services(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Submissions accepted by an execution context so far
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Run `work` on the active service and report back on the main context
    ///
    /// `callback.before_start` runs here, before submission. If the active
    /// context refuses the job, the error is returned and no terminal
    /// callback will fire. Errors and panics from `work` reach
    /// `callback.on_failure` as a [`WorkError`].
    pub fn execute_async<W, R, E, C>(&self, work: W, mut callback: C) -> Result<()>
    where
        W: FnOnce() -> std::result::Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        C: TaskCallback<R, E> + Send + 'static,
    {
        let task = self.next_task_id.fetch_add(1, Ordering::Relaxed);

        callback.before_start();

        let context = self.registry.active_context()?;
        let main = Arc::clone(&self.main);
        let span = logging::task_span(task, self.registry.active_name());

        let job: Job = Box::new(move || {
            let outcome = span.in_scope(|| TaskOutcome::capture(work));
            trace!(parent: &span, success = outcome.is_success(), "Work finished");

            let delivery_span = span.clone();
            let delivery: Job = Box::new(move || delivery_span.in_scope(|| outcome.deliver(callback)));
            if let Err(e) = main.post(delivery) {
                error!(parent: &span, error = %e, "Outcome lost, main context refused delivery");
            }
        });

        if let Err(e) = context.execute(job) {
            warn!(
                task,
                service = %self.registry.active_name(),
                error = %e,
                "Submission rejected"
            );
            return Err(e);
        }

        self.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(task, service = %self.registry.active_name(), "Task submitted");
        Ok(())
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("registry", &self.registry)
            .field("submitted", &self.submitted())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
