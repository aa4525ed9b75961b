use super::{ExecutionContext, Job};
use crate::error::Result;

/// Runs every job immediately on the thread that submits it
///
/// Also usable as a [`MainContext`](crate::dispatch::MainContext), in which
/// case outcomes are delivered on whichever worker finished the work.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl ExecutionContext for Inline {
    fn execute(&self, job: Job) -> Result<()> {
        job();
        Ok(())
    }

    fn describe(&self) -> String {
        "inline (caller thread)".to_string()
    }
}
