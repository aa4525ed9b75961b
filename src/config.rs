//! Configuration for offload
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (OFFLOAD_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! Only the built-in services are configurable. Contexts registered at
//! runtime are owned by the caller.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::PoolConfig;
use crate::error::{Error, Result};
use crate::logging::ROTATIONS;
use crate::registry::{MULTI, SINGLE};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Runner settings
    pub runner: RunnerSettings,

    /// Multi-worker built-in service
    pub multi: MultiSettings,

    /// Single-worker built-in service
    pub single: SingleSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Service selected at startup: "single" or "multi"
    pub default_service: String,
}

/// Multi-worker pool sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiSettings {
    /// Workers kept alive while idle
    pub core_threads: usize,

    /// Upper bound on live workers
    pub max_threads: usize,

    /// Idle time before a worker above the floor retires (milliseconds)
    pub keep_alive_ms: u64,

    /// Maximum queued jobs (0 = unbounded)
    pub queue_capacity: usize,

    /// Worker thread name prefix
    pub thread_name: String,
}

/// Single-worker pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleSettings {
    /// Maximum queued jobs (0 = unbounded)
    pub queue_capacity: usize,

    /// Worker thread name
    pub thread_name: String,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// File rotation: minutely, hourly, daily, never
    pub rotation: String,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            default_service: SINGLE.to_string(),
        }
    }
}

impl Default for MultiSettings {
    fn default() -> Self {
        let preset = PoolConfig::multi();
        Self {
            core_threads: preset.core_threads,
            max_threads: preset.max_threads,
            keep_alive_ms: preset.keep_alive.as_millis() as u64,
            queue_capacity: 0, // Unbounded
            thread_name: preset.name,
        }
    }
}

impl Default for SingleSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 0,
            thread_name: PoolConfig::single().name,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            rotation: "daily".to_string(),
            max_files: 5,
            json_format: false,
        }
    }
}

impl MultiSettings {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::multi()
            .with_name(self.thread_name.clone())
            .with_core_threads(self.core_threads)
            .with_max_threads(self.max_threads)
            .with_keep_alive(Duration::from_millis(self.keep_alive_ms))
            .with_queue_capacity(capacity(self.queue_capacity))
    }
}

impl SingleSettings {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::single()
            .with_name(self.thread_name.clone())
            .with_queue_capacity(capacity(self.queue_capacity))
    }
}

fn capacity(configured: usize) -> Option<usize> {
    (configured > 0).then_some(configured)
}

impl RunnerConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::ConfigNotFound {
                path: path.clone(),
                source: Some(e),
            })?;
            config = Self::parse(&content)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse TOML text without overrides or validation
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: e.message().to_string(),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            // Current directory
            Some(PathBuf::from("offload.toml")),
            // User config directory
            dirs::config_dir().map(|p| p.join("offload").join("config.toml")),
            // Home directory
            dirs::home_dir().map(|p| p.join(".offload.toml")),
        ];

        for path in search_paths.iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `OFFLOAD_*` overrides from `lookup`; unparsable values are ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Runner settings
        if let Some(val) = lookup("OFFLOAD_DEFAULT_SERVICE") {
            self.runner.default_service = val;
        }

        // Multi-worker settings
        override_parsed(&lookup, "OFFLOAD_MULTI_CORE_THREADS", &mut self.multi.core_threads);
        override_parsed(&lookup, "OFFLOAD_MULTI_MAX_THREADS", &mut self.multi.max_threads);
        override_parsed(&lookup, "OFFLOAD_MULTI_KEEP_ALIVE_MS", &mut self.multi.keep_alive_ms);
        override_parsed(&lookup, "OFFLOAD_MULTI_QUEUE_CAPACITY", &mut self.multi.queue_capacity);

        // Single-worker settings
        override_parsed(&lookup, "OFFLOAD_SINGLE_QUEUE_CAPACITY", &mut self.single.queue_capacity);

        // Logging settings
        if let Some(val) = lookup("OFFLOAD_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("OFFLOAD_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("OFFLOAD_LOG_ROTATION") {
            self.logging.rotation = val;
        }
        if let Some(val) = lookup("OFFLOAD_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let service = self.runner.default_service.as_str();
        if service != MULTI && service != SINGLE {
            return Err(Error::config_field_invalid(
                "runner.default_service",
                format!("'{}' is not a built-in service (expected '{}' or '{}')", service, SINGLE, MULTI),
            ));
        }

        self.multi.pool_config().validate()?;
        self.single.pool_config().validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        if !ROTATIONS.contains(&self.logging.rotation.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.rotation",
                format!(
                    "Invalid rotation '{}'. Must be one of: {}",
                    self.logging.rotation,
                    ROTATIONS.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Serialize the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn override_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(val) = lookup(key) {
        match val.parse() {
            Ok(n) => *target = n,
            Err(_) => warn!(key, value = %val, "Ignoring unparsable environment override"),
        }
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location written by [`init_config`]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("offload"))
        .or_else(|| dirs::home_dir().map(|p| p.join(".offload")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::IoWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|source| Error::IoWrite {
        path: config_path.clone(),
        source,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
pub fn generate_default_config() -> String {
    r#"# offload configuration

[runner]
# Service selected at startup: "single" or "multi"
default_service = "single"

[multi]
# Workers kept alive while idle
core_threads = 5

# Upper bound on live workers
max_threads = 128

# Idle time before a worker above core_threads retires (milliseconds)
keep_alive_ms = 1000

# Maximum queued jobs (0 = unbounded)
queue_capacity = 0

# Worker thread name prefix
thread_name = "offload-multi"

[single]
# Maximum queued jobs (0 = unbounded)
queue_capacity = 0

# Worker thread name
thread_name = "offload-single"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.offload/logs/offload.log"

# Start a new log file: minutely, hourly, daily, never
rotation = "daily"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
