//! offload - run work in the background, get the result back on the main context
//!
//! A [`TaskRunner`] owns an [`ExecutorRegistry`] of named execution contexts
//! and a [`MainContext`]. Work submitted with [`TaskRunner::execute_async`]
//! runs on the active context; its outcome is always delivered on the main
//! context.
//!
//! ```no_run
//! use std::time::Duration;
//! use offload::{callbacks, MainLoop, TaskRunner, WorkError};
//!
//! let main_loop = MainLoop::new();
//! let runner = TaskRunner::new(main_loop.handle());
//!
//! runner
//!     .execute_async(
//!         || Ok::<_, String>(6 * 7),
//!         callbacks(
//!             |value: i32| println!("answer: {value}"),
//!             |error: WorkError<String>| eprintln!("failed: {error}"),
//!         ),
//!     )
//!     .unwrap();
//!
//! main_loop.run_until(Duration::from_secs(1), || false);
//! ```

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runner;

pub use config::RunnerConfig;
pub use context::{ExecutionContext, Inline, Job, PoolConfig, PoolStats, ThreadPool, TokioBlocking};
pub use dispatch::{MainContext, MainHandle, MainLoop, MainThread};
pub use error::{Error, ErrorCode, Result};
pub use registry::{ExecutorRegistry, SharedContext, MULTI, SINGLE};
pub use runner::{callbacks, Callbacks, TaskCallback, TaskOutcome, TaskRunner, WorkError};
