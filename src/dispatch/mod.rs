//! Main-context dispatch
//!
//! Terminal callbacks always run on one designated "main" context. The host
//! supplies it through [`MainContext`]; this module ships three versions:
//! - [`MainLoop`]: a queue pumped by whichever thread the host designates
//! - [`MainThread`]: a dedicated thread pumping a `MainLoop`
//! - [`Inline`]: delivers on the posting thread

mod main_loop;
mod main_thread;

pub use main_loop::{MainHandle, MainLoop};
pub use main_thread::MainThread;

use crate::context::{Inline, Job};
use crate::error::Result;

/// Schedules closures onto the designated main context
pub trait MainContext: Send + Sync {
    /// Queue `job` to run on the main context
    ///
    /// Fails with [`Error::MainContextClosed`](crate::Error::MainContextClosed)
    /// once the context stopped accepting work.
    fn post(&self, job: Job) -> Result<()>;
}

impl MainContext for Inline {
    fn post(&self, job: Job) -> Result<()> {
        job();
        Ok(())
    }
}
