//! Logging for offload hosts
//!
//! The library only emits `tracing` events. Work and its terminal callback
//! run inside a `task` span carrying the task id and service name, so events
//! from a worker thread and from the main context can be matched up.
//! Hosts that want the events printed call [`init_logging`] or
//! [`init_simple`].

use std::fs;
use std::io;
use std::path::Path;

use tracing::{Level, Span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

/// Rotation values accepted in `[logging] rotation`
pub const ROTATIONS: [&str; 4] = ["minutely", "hourly", "daily", "never"];

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Keeps the file writer alive; dropping it flushes pending lines
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Span wrapping one submission, on the worker and on the main context
pub fn task_span(task: u64, service: &str) -> Span {
    tracing::info_span!("task", id = task, service = %service)
}

/// Install the global subscriber from `[logging]` and the CLI flags
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<LogGuards> {
    let level = effective_level(settings, verbose, quiet);

    let (file, file_guard) = match settings.file.as_deref() {
        Some(path) => {
            let rotation = parse_rotation(&settings.rotation)?;
            let (layer, guard) = build_file_layer(path, rotation, settings.max_files, settings.json_format)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_env_filter(level)?)
        .with(output_layer(io::stderr, settings.json_format, true))
        .with(file)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(%level, file = ?settings.file, rotation = %settings.rotation, "Logging initialized");

    Ok(LogGuards {
        _file_guard: file_guard,
    })
}

/// Stderr-only subscriber for commands that never load a config
pub fn init_simple(level: Level) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_env_filter(level)?)
        .with(output_layer(io::stderr, false, true))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

/// `-q` wins over `-v`; otherwise each `-v` steps one level down from the config
fn effective_level(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => settings.level.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn parse_rotation(value: &str) -> Result<Rotation> {
    match value.to_lowercase().as_str() {
        "minutely" => Ok(Rotation::MINUTELY),
        "hourly" => Ok(Rotation::HOURLY),
        "daily" => Ok(Rotation::DAILY),
        "never" => Ok(Rotation::NEVER),
        other => Err(Error::config_field_invalid(
            "logging.rotation",
            format!("Invalid rotation '{}'. Must be one of: {}", other, ROTATIONS.join(", ")),
        )),
    }
}

/// RUST_LOG tunes other crates; this crate always follows the effective level
fn build_env_filter(level: Level) -> Result<EnvFilter> {
    let base = level.to_string().to_lowercase();
    let own = format!("{}={}", env!("CARGO_CRATE_NAME"), base)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid log directive: {}", e)))?;

    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&base))
        .add_directive(own))
}

/// One format for console and file
///
/// Thread names stay on because pool workers are named after their service.
/// Stdout is never used, so `demo --json` output stays parseable.
fn output_layer<S, W>(writer: W, json: bool, ansi: bool) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_names(true);

    if json {
        Box::new(
            layer
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_span_events(FmtSpan::CLOSE),
        )
    } else {
        Box::new(layer.with_ansi(ansi).compact())
    }
}

fn build_file_layer<S>(
    log_file: &str,
    rotation: Rotation,
    max_files: u32,
    json: bool,
) -> Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let path = Path::new(log_file);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory).map_err(|source| Error::IoWrite {
        path: directory.to_path_buf(),
        source,
    })?;

    let prefix = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or(env!("CARGO_CRATE_NAME"));

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(max_files.max(1) as usize)
        .build(directory)
        .map_err(|e| Error::Config(format!("Failed to create log file appender: {}", e)))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((output_layer(writer, json, false), guard))
}
