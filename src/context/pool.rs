//! Grow-on-demand worker pool
//!
//! Workers pull jobs FIFO from one shared queue and park on a condition
//! variable while it is empty. The pool starts no threads until the first
//! job arrives.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use super::{panic_message, ExecutionContext, Job};
use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Pool Configuration
// ─────────────────────────────────────────────────────────────────

/// Sizing and naming for a [`ThreadPool`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Prefix for worker thread names
    pub name: String,

    /// Workers kept alive even when idle
    pub core_threads: usize,

    /// Upper bound on live workers
    pub max_threads: usize,

    /// Idle time after which a worker above `core_threads` retires
    pub keep_alive: Duration,

    /// Maximum jobs waiting for a worker (`None` = unbounded)
    pub queue_capacity: Option<usize>,
}

impl PoolConfig {
    /// Floor of the multi-worker preset
    pub const MULTI_CORE_THREADS: usize = 5;

    /// Ceiling of the multi-worker preset
    pub const MULTI_MAX_THREADS: usize = 128;

    /// Idle timeout of the multi-worker preset
    pub const MULTI_KEEP_ALIVE: Duration = Duration::from_secs(1);

    /// Multi-worker preset: 5..128 workers, unbounded queue, 1s idle teardown
    pub fn multi() -> Self {
        Self {
            name: "offload-multi".to_string(),
            core_threads: Self::MULTI_CORE_THREADS,
            max_threads: Self::MULTI_MAX_THREADS,
            keep_alive: Self::MULTI_KEEP_ALIVE,
            queue_capacity: None,
        }
    }

    /// Single-worker preset: one worker, strict submission order
    pub fn single() -> Self {
        Self {
            name: "offload-single".to_string(),
            core_threads: 1,
            max_threads: 1,
            keep_alive: Self::MULTI_KEEP_ALIVE,
            queue_capacity: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_core_threads(mut self, n: usize) -> Self {
        self.core_threads = n;
        self
    }

    pub fn with_max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Check the sizing is usable
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config_field_invalid("name", "pool name cannot be empty"));
        }
        if self.max_threads == 0 {
            return Err(Error::config_field_invalid(
                "max_threads",
                format!("pool '{}' needs at least one worker", self.name),
            ));
        }
        if self.core_threads > self.max_threads {
            return Err(Error::config_field_invalid(
                "core_threads",
                format!(
                    "pool '{}': core_threads ({}) exceeds max_threads ({})",
                    self.name, self.core_threads, self.max_threads
                ),
            ));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::multi()
    }
}

/// Point-in-time view of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Live worker threads
    pub workers: usize,

    /// Workers parked waiting for a job
    pub idle: usize,

    /// Jobs waiting for a worker
    pub queued: usize,

    /// Jobs finished since the pool was created
    pub completed: u64,

    /// Whether the pool stopped accepting jobs
    pub shutdown: bool,
}

// ─────────────────────────────────────────────────────────────────
// Thread Pool
// ─────────────────────────────────────────────────────────────────

/// Worker pool bounded by a floor and a ceiling of threads
///
/// A worker is started while fewer than `core_threads` are alive, or when
/// pending jobs outnumber idle workers and the ceiling is not reached.
/// Otherwise the job waits in the queue. Dropping the pool shuts it down;
/// queued jobs still run.
pub struct ThreadPool {
    shared: Arc<Shared>,
}

struct Shared {
    config: PoolConfig,
    state: Mutex<PoolState>,
    work_available: Condvar,
    next_worker_id: AtomicUsize,
    completed: AtomicU64,
}

#[derive(Default)]
struct PoolState {
    queue: VecDeque<Job>,
    workers: usize,
    idle: usize,
    shutdown: bool,
}

impl ThreadPool {
    /// Create a pool after validating its configuration
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    /// The multi-worker preset
    pub fn multi() -> Self {
        Self::from_config(PoolConfig::multi())
    }

    /// The single-worker preset
    pub fn single() -> Self {
        Self::from_config(PoolConfig::single())
    }

    pub(crate) fn from_config(config: PoolConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(PoolState::default()),
                work_available: Condvar::new(),
                next_worker_id: AtomicUsize::new(0),
                completed: AtomicU64::new(0),
            }),
        }
    }

    /// Pool name (worker thread name prefix)
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            workers: state.workers,
            idle: state.idle,
            queued: state.queue.len(),
            completed: self.shared.completed.load(Ordering::Acquire),
            shutdown: state.shutdown,
        }
    }

    /// Stop accepting jobs; workers drain the queue and exit
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }
        self.shared.work_available.notify_all();
        debug!(pool = %self.name(), "Pool shut down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shutdown
    }
}

impl ExecutionContext for ThreadPool {
    fn execute(&self, job: Job) -> Result<()> {
        let shared = &self.shared;
        let config = &shared.config;
        let mut state = shared.state.lock();

        if state.shutdown {
            return Err(Error::context_shutdown(&config.name));
        }

        let pending = state.queue.len() + 1;
        let grow = state.workers < config.core_threads
            || (pending > state.idle && state.workers < config.max_threads);

        if !grow {
            if let Some(capacity) = config.queue_capacity {
                if state.queue.len() >= capacity {
                    return Err(Error::rejected(
                        &config.name,
                        format!(
                            "queue full ({} waiting, {} workers busy)",
                            capacity, state.workers
                        ),
                    ));
                }
            }
        }

        state.queue.push_back(job);

        if grow {
            state.workers += 1;
            // The new worker blocks on the state lock until we release it.
            if let Err(source) = shared.spawn_worker() {
                state.workers -= 1;
                if state.workers == 0 {
                    state.queue.pop_back();
                    return Err(Error::WorkerSpawn {
                        context: config.name.clone(),
                        source,
                    });
                }
                warn!(pool = %config.name, error = %source, "Could not grow pool, job queued");
            }
        }

        drop(state);
        shared.work_available.notify_one();
        Ok(())
    }

    fn describe(&self) -> String {
        let config = &self.shared.config;
        let queue = match config.queue_capacity {
            Some(capacity) => capacity.to_string(),
            None => "unbounded".to_string(),
        };
        format!(
            "thread pool '{}' ({}..{} workers, keep-alive {}ms, queue {})",
            config.name,
            config.core_threads,
            config.max_threads,
            config.keep_alive.as_millis(),
            queue
        )
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn spawn_worker(self: &Arc<Self>) -> std::io::Result<()> {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(self);

        thread::Builder::new()
            .name(format!("{}-{}", self.config.name, id))
            .spawn(move || shared.run_worker())
            .map(drop)
    }

    fn run_worker(&self) {
        debug!(pool = %self.config.name, "Worker started");

        while let Some(job) = self.next_job() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                error!(
                    pool = %self.config.name,
                    panic = %panic_message(payload.as_ref()),
                    "Job panicked, worker continues"
                );
            }
            self.completed.fetch_add(1, Ordering::Release);
        }

        debug!(pool = %self.config.name, "Worker retired");
    }

    /// Block until a job is available; `None` means this worker must exit
    fn next_job(&self) -> Option<Job> {
        let mut state = self.state.lock();

        loop {
            if let Some(job) = state.queue.pop_front() {
                return Some(job);
            }

            if state.shutdown {
                state.workers -= 1;
                return None;
            }

            let may_retire = state.workers > self.config.core_threads;

            state.idle += 1;
            let timed_out = if may_retire {
                self.work_available
                    .wait_for(&mut state, self.config.keep_alive)
                    .timed_out()
            } else {
                self.work_available.wait(&mut state);
                false
            };
            state.idle -= 1;

            if timed_out && state.queue.is_empty() && state.workers > self.config.core_threads {
                state.workers -= 1;
                return None;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_presets() {
        let multi = PoolConfig::multi();
        assert_eq!(multi.core_threads, 5);
        assert_eq!(multi.max_threads, 128);
        assert_eq!(multi.keep_alive, Duration::from_secs(1));
        assert!(multi.queue_capacity.is_none());

        let single = PoolConfig::single();
        assert_eq!(single.core_threads, 1);
        assert_eq!(single.max_threads, 1);
    }

    #[test]
    fn test_validation() {
        assert!(PoolConfig::multi().validate().is_ok());
        assert!(PoolConfig::multi().with_max_threads(0).validate().is_err());
        assert!(PoolConfig::multi().with_core_threads(200).validate().is_err());
        assert!(PoolConfig::multi().with_name("  ").validate().is_err());
        assert!(PoolConfig::multi().with_core_threads(0).validate().is_ok());
    }

    #[test]
    fn test_no_threads_until_first_job() {
        let pool = ThreadPool::multi();
        assert_eq!(pool.stats().workers, 0);
    }

    #[test]
    fn test_single_preserves_submission_order() {
        let pool = ThreadPool::single();
        let (tx, rx) = mpsc::channel();

        for i in 0..50 {
            let tx = tx.clone();
            pool.execute(Box::new(move || tx.send(i).unwrap())).unwrap();
        }

        let order: Vec<i32> = (0..50).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
        assert_eq!(pool.stats().workers, 1);
    }

    #[test]
    fn test_multi_runs_in_parallel() {
        let pool = ThreadPool::multi();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        for _ in 0..4 {
            let running = running.clone();
            let peak = peak.clone();
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(100));
                running.fetch_sub(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            }))
            .unwrap();
        }

        for _ in 0..4 {
            rx.recv_timeout(WAIT).unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_bounded_queue_rejects() {
        let config = PoolConfig::single()
            .with_name("bounded")
            .with_queue_capacity(Some(1));
        let pool = ThreadPool::new(config).unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        pool.execute(Box::new(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        }))
        .unwrap();
        started_rx.recv_timeout(WAIT).unwrap();

        // One slot in the queue, then full
        pool.execute(Box::new(|| {})).unwrap();
        let err = pool.execute(Box::new(|| {})).unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
        assert!(err.is_scheduling());

        release_tx.send(()).unwrap();
        assert!(wait_for(|| pool.stats().completed == 2));
    }

    #[test]
    fn test_shutdown_rejects_new_jobs() {
        let pool = ThreadPool::single();
        pool.shutdown();

        assert!(pool.is_shutdown());
        let err = pool.execute(Box::new(|| {})).unwrap_err();
        assert!(matches!(err, Error::ContextShutdown { .. }));
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let pool = ThreadPool::single();
        let (tx, rx) = mpsc::channel();

        for i in 0..10 {
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                thread::sleep(Duration::from_millis(2));
                tx.send(i).unwrap();
            }))
            .unwrap();
        }
        pool.shutdown();

        let drained: Vec<i32> = (0..10).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(drained.len(), 10);
        assert!(wait_for(|| pool.stats().workers == 0));
    }

    #[test]
    fn test_worker_survives_panicking_job() {
        let pool = ThreadPool::single();
        let (tx, rx) = mpsc::channel();

        pool.execute(Box::new(|| panic!("boom"))).unwrap();
        pool.execute(Box::new(move || tx.send("still alive").unwrap())).unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "still alive");
        assert_eq!(pool.stats().workers, 1);
    }

    #[test]
    fn test_idle_workers_above_core_retire() {
        let config = PoolConfig::multi()
            .with_name("elastic")
            .with_core_threads(0)
            .with_max_threads(2)
            .with_keep_alive(Duration::from_millis(50));
        let pool = ThreadPool::new(config).unwrap();
        let (tx, rx) = mpsc::channel();

        pool.execute(Box::new(move || tx.send(()).unwrap())).unwrap();
        rx.recv_timeout(WAIT).unwrap();

        assert!(wait_for(|| pool.stats().workers == 0));
    }

    #[test]
    fn test_worker_thread_names() {
        let pool = ThreadPool::new(PoolConfig::single().with_name("named")).unwrap();
        let (tx, rx) = mpsc::channel();

        pool.execute(Box::new(move || {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
        }))
        .unwrap();

        let name = rx.recv_timeout(WAIT).unwrap().unwrap();
        assert!(name.starts_with("named-"));
    }

    #[test]
    fn test_describe() {
        let description = ThreadPool::multi().describe();
        assert!(description.contains("offload-multi"));
        assert!(description.contains("5..128"));
        assert!(description.contains("unbounded"));
    }
}
