//! Dedicated main-context thread
//!
//! For hosts without a UI loop of their own: one named thread pumps a
//! [`MainLoop`] and serializes every delivery.

use std::thread::{self, JoinHandle, ThreadId};

use super::{MainContext, MainHandle, MainLoop};
use crate::context::Job;
use crate::error::{Error, Result};

/// A thread that runs a [`MainLoop`] until shut down
pub struct MainThread {
    handle: MainHandle,
    thread_id: ThreadId,
    join: Option<JoinHandle<()>>,
}

impl MainThread {
    /// Default thread name
    pub const DEFAULT_NAME: &'static str = "offload-main";

    pub fn spawn() -> Result<Self> {
        Self::spawn_named(Self::DEFAULT_NAME)
    }

    pub fn spawn_named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let main_loop = MainLoop::new();
        let handle = main_loop.handle();

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || main_loop.run())
            .map_err(|source| Error::WorkerSpawn {
                context: name,
                source,
            })?;

        Ok(Self {
            handle,
            thread_id: join.thread().id(),
            join: Some(join),
        })
    }

    /// Posting handle for this thread
    pub fn handle(&self) -> MainHandle {
        self.handle.clone()
    }

    /// Identity of the thread that runs deliveries
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Quit the loop and wait for already-posted jobs to finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.handle.quit();
        if let Some(join) = self.join.take() {
            // Joining from inside a delivery would wait on ourselves.
            if join.thread().id() != thread::current().id() {
                let _ = join.join();
            }
        }
    }
}

impl MainContext for MainThread {
    fn post(&self, job: Job) -> Result<()> {
        self.handle.post(job)
    }
}

impl Drop for MainThread {
    fn drop(&mut self) {
        self.stop();
    }
}
