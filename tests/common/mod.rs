//! Common test utilities and fixtures
//!
//! Shared by the integration test crates; not every crate uses every helper.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tempfile::TempDir;

use offload::{TaskCallback, WorkError};

/// Temporary directory holding one config file
pub struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("offload.toml");
        Self { temp_dir, config_path }
    }

    pub fn with_config(content: &str) -> Self {
        let fixture = Self::new();
        fixture.write_config(content);
        fixture
    }

    pub fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    pub fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    pub fn dir(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }
}

/// Get a command for the offload binary
pub fn offload_cmd() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("offload").unwrap()
}

/// One observed callback invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeforeStart { task: u32, thread: ThreadId },
    Success { task: u32, value: i64, thread: ThreadId },
    Failure { task: u32, message: String, panicked: bool, thread: ThreadId },
}

impl Event {
    pub fn task(&self) -> u32 {
        match self {
            Event::BeforeStart { task, .. } | Event::Success { task, .. } | Event::Failure { task, .. } => *task,
        }
    }

    pub fn thread(&self) -> ThreadId {
        match self {
            Event::BeforeStart { thread, .. }
            | Event::Success { thread, .. }
            | Event::Failure { thread, .. } => *thread,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::BeforeStart { .. })
    }
}

/// Shared event log written by [`Recorder`] callbacks
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn recorder(&self, task: u32) -> Recorder {
        Recorder {
            task,
            log: self.clone(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn terminal_count(&self) -> usize {
        self.events.lock().iter().filter(|e| e.is_terminal()).count()
    }

    /// Terminal events in delivery order
    pub fn terminals(&self) -> Vec<Event> {
        self.events.lock().iter().filter(|e| e.is_terminal()).cloned().collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// Callback that records every call, with the thread it ran on
pub struct Recorder {
    task: u32,
    log: EventLog,
}

impl<E: std::fmt::Display> TaskCallback<i64, E> for Recorder {
    fn before_start(&mut self) {
        self.log.push(Event::BeforeStart {
            task: self.task,
            thread: thread::current().id(),
        });
    }

    fn on_success(self, value: i64) {
        self.log.push(Event::Success {
            task: self.task,
            value,
            thread: thread::current().id(),
        });
    }

    fn on_failure(self, error: WorkError<E>) {
        self.log.push(Event::Failure {
            task: self.task,
            message: error.to_string(),
            panicked: error.is_panic(),
            thread: thread::current().id(),
        });
    }
}
