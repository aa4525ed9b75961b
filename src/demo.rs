//! `offload demo`: submit a batch of tasks and report where callbacks ran
//!
//! The process main thread pumps a [`MainLoop`] and acts as the main
//! context, so every terminal callback must observe its thread id.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use offload::{Error, MainLoop, Result, RunnerConfig, TaskCallback, TaskRunner, WorkError};

use crate::cli::DemoArgs;

/// Deliberate failure injected by `--fail-every`
#[derive(Debug, Error)]
#[error("task {0} failed on request")]
struct InjectedFailure(u32);

/// Summary printed at the end of a demo run
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub service: String,
    pub tasks: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub worker_threads: usize,
    pub callbacks_on_main: bool,
    pub in_submission_order: bool,
    pub completion_order: Vec<u32>,
    pub elapsed_ms: u64,
}

impl DemoReport {
    pub fn print(&self, json: bool) -> Result<()> {
        if json {
            let text = serde_json::to_string_pretty(self)
                .map_err(|e| Error::Internal(format!("Failed to serialize report: {}", e)))?;
            println!("{}", text);
            return Ok(());
        }

        println!("Service:              {}", self.service);
        println!("Tasks:                {}", self.tasks);
        println!("Succeeded:            {}", self.succeeded);
        println!("Failed:               {}", self.failed);
        println!("Worker threads:       {}", self.worker_threads);
        println!("Callbacks on main:    {}", yes_no(self.callbacks_on_main));
        println!("In submission order:  {}", yes_no(self.in_submission_order));
        println!("Elapsed:              {} ms", self.elapsed_ms);
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[derive(Default)]
struct Tally {
    succeeded: u32,
    failed: u32,
    workers: HashSet<ThreadId>,
    off_main: u32,
    order: Vec<u32>,
}

impl Tally {
    fn finished(&self) -> u32 {
        self.succeeded + self.failed
    }
}

/// Records one task's callbacks into the shared tally
struct DemoCallback {
    index: u32,
    main: ThreadId,
    tally: Arc<Mutex<Tally>>,
}

impl DemoCallback {
    fn finish(&self, ok: bool) {
        let mut tally = self.tally.lock();
        if thread::current().id() != self.main {
            tally.off_main += 1;
        }
        if ok {
            tally.succeeded += 1;
        } else {
            tally.failed += 1;
        }
        tally.order.push(self.index);
    }
}

impl TaskCallback<u32, InjectedFailure> for DemoCallback {
    fn before_start(&mut self) {
        debug!(task = self.index, "Submitting");
    }

    fn on_success(self, _value: u32) {
        self.finish(true);
    }

    fn on_failure(self, error: WorkError<InjectedFailure>) {
        debug!(task = self.index, error = %error, "Task failed");
        self.finish(false);
    }
}

/// Run the demo on the calling thread, which becomes the main context
pub fn run_demo(config: &RunnerConfig, args: &DemoArgs) -> Result<DemoReport> {
    let main_loop = MainLoop::new();
    let mut runner = TaskRunner::from_config(config, main_loop.handle())?;
    if let Some(service) = &args.service {
        runner.set_service(service)?;
    }

    let main = thread::current().id();
    let tally = Arc::new(Mutex::new(Tally::default()));
    let started = Instant::now();

    info!(
        service = %runner.active_service(),
        tasks = args.tasks,
        work_ms = args.work_ms,
        "Demo started"
    );

    for index in 0..args.tasks {
        let work_tally = Arc::clone(&tally);
        let work_ms = args.work_ms;
        let fail = args.fail_every > 0 && (index + 1) % args.fail_every == 0;

        runner.execute_async(
            move || {
                work_tally.lock().workers.insert(thread::current().id());
                if work_ms > 0 {
                    thread::sleep(Duration::from_millis(work_ms));
                }
                if fail {
                    Err(InjectedFailure(index))
                } else {
                    Ok(index)
                }
            },
            DemoCallback {
                index,
                main,
                tally: Arc::clone(&tally),
            },
        )?;
    }

    let budget = demo_budget(args.work_ms, args.tasks);
    let done = main_loop.run_until(budget, || tally.lock().finished() == args.tasks);
    if !done {
        warn!(finished = tally.lock().finished(), "Demo timed out");
        return Err(Error::Internal(format!(
            "Timed out after {:?} waiting for {} tasks",
            budget, args.tasks
        )));
    }

    let tally = tally.lock();
    let report = DemoReport {
        service: runner.active_service().to_string(),
        tasks: args.tasks,
        succeeded: tally.succeeded,
        failed: tally.failed,
        worker_threads: tally.workers.len(),
        callbacks_on_main: tally.off_main == 0,
        in_submission_order: tally.order.windows(2).all(|w| w[0] < w[1]),
        completion_order: tally.order.clone(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        workers = report.worker_threads,
        "Demo finished"
    );
    Ok(report)
}

/// Time allowed for all tasks to report back, as if they ran one by one
fn demo_budget(work_ms: u64, tasks: u32) -> Duration {
    Duration::from_secs(30).saturating_add(Duration::from_millis(work_ms.saturating_mul(u64::from(tasks))))
}
