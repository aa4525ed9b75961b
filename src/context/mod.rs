//! Execution contexts
//!
//! An execution context accepts a unit of work and runs it somewhere else:
//! - [`ThreadPool`] backs both built-in services
//! - [`TokioBlocking`] hands work to a tokio runtime's blocking pool
//! - [`Inline`] runs work on the submitting thread (tests, debugging)

mod blocking;
mod inline;
mod pool;

pub use self::blocking::TokioBlocking;
pub use self::inline::Inline;
pub use self::pool::{PoolConfig, PoolStats, ThreadPool};

use std::any::Any;

use crate::error::Result;

/// A zero-argument unit of work, boxed for transfer between threads
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run submitted jobs asynchronously
///
/// Ordering and concurrency are properties of the implementation. A context
/// that cannot take the job returns a scheduling error and drops it.
pub trait ExecutionContext: Send + Sync {
    /// Submit a job for execution
    fn execute(&self, job: Job) -> Result<()>;

    /// Short human-readable description, used in listings and logs
    fn describe(&self) -> String {
        "external context".to_string()
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
