//! Host-pumped main loop
//!
//! The thread that pumps a [`MainLoop`] is the main context. Posted jobs run
//! there one at a time in posting order.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

use super::MainContext;
use crate::context::{panic_message, Job};
use crate::error::{Error, Result};

struct Shared {
    state: Mutex<LoopState>,
    posted: Condvar,
}

#[derive(Default)]
struct LoopState {
    jobs: VecDeque<Job>,
    quit: bool,
}

impl Shared {
    fn quit(&self) {
        self.state.lock().quit = true;
        self.posted.notify_all();
    }
}

/// Queue of closures waiting for the main context
pub struct MainLoop {
    shared: Arc<Shared>,
}

/// Cloneable posting side of a [`MainLoop`]
#[derive(Clone)]
pub struct MainHandle {
    shared: Arc<Shared>,
}

impl MainLoop {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LoopState::default()),
                posted: Condvar::new(),
            }),
        }
    }

    pub fn handle(&self) -> MainHandle {
        MainHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stop accepting new jobs; already-posted jobs still run
    pub fn quit(&self) {
        self.shared.quit();
    }

    pub fn pending(&self) -> usize {
        self.shared.state.lock().jobs.len()
    }

    /// Pump until the loop is quit and drained
    pub fn run(&self) {
        debug!("Main loop running");
        while let Some(job) = self.next_job(None) {
            run_job(job);
        }
        debug!("Main loop stopped");
    }

    /// Run every job posted so far without blocking; returns how many ran
    pub fn run_pending(&self) -> usize {
        let jobs: Vec<Job> = self.shared.state.lock().jobs.drain(..).collect();
        let count = jobs.len();
        for job in jobs {
            run_job(job);
        }
        count
    }

    /// Pump until `done()` holds or `timeout` passes; returns the final `done()`
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        // A timeout past the end of time means no deadline
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if done() {
                return true;
            }
            match self.next_job(deadline) {
                Some(job) => run_job(job),
                None => return done(),
            }
        }
    }

    /// Wait for the next job; `None` on quit-and-drained or deadline
    fn next_job(&self, deadline: Option<Instant>) -> Option<Job> {
        let mut state = self.shared.state.lock();

        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.quit {
                return None;
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.posted.wait_until(&mut state, deadline).timed_out() {
                        return state.jobs.pop_front();
                    }
                }
                None => self.shared.posted.wait(&mut state),
            }
        }
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        self.shared.quit();
    }
}

impl MainHandle {
    /// Quit the loop this handle posts to
    pub fn quit(&self) {
        self.shared.quit();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().quit
    }
}

impl MainContext for MainHandle {
    fn post(&self, job: Job) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.quit {
                return Err(Error::MainContextClosed);
            }
            state.jobs.push_back(job);
        }
        self.shared.posted.notify_one();
        Ok(())
    }
}

fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(
            panic = %panic_message(payload.as_ref()),
            "Main context job panicked, loop continues"
        );
    }
}
