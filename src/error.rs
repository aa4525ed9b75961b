//! Error types for offload
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for the driver binary
//!
//! Failures raised by submitted work never use this type. They travel to the
//! callback as [`WorkError`](crate::runner::WorkError).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for offload operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    UnknownService = 110,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Scheduling errors (3xx)
    Rejected = 300,
    ContextShutdown = 301,
    WorkerSpawn = 302,

    // Dispatch errors (4xx)
    MainContextClosed = 400,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Scheduling errors
            400..=499 => 40, // Dispatch errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for offload
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error(
        "Configuration validation failed: {message}{}",
        .field.as_ref().map(|f| format!(" (field: {})", f)).unwrap_or_default()
    )]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Selected a service name that was never registered
    #[error("Unknown service '{name}' (registered: {})", .registered.join(", "))]
    UnknownService { name: String, registered: Vec<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Scheduling Errors
    // ─────────────────────────────────────────────────────────────

    /// The execution context has no capacity for another job
    #[error("Execution context '{context}' rejected the job: {reason}")]
    Rejected { context: String, reason: String },

    /// The execution context no longer accepts jobs
    #[error("Execution context '{context}' is shut down")]
    ContextShutdown { context: String },

    /// No worker thread could be started for the job
    #[error("Failed to start a worker thread for '{context}'")]
    WorkerSpawn {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Dispatch Errors
    // ─────────────────────────────────────────────────────────────

    /// The main context stopped accepting deliveries
    #[error("Main context is closed")]
    MainContextClosed,

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,
            Error::UnknownService { .. } => ErrorCode::UnknownService,

            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::Rejected { .. } => ErrorCode::Rejected,
            Error::ContextShutdown { .. } => ErrorCode::ContextShutdown,
            Error::WorkerSpawn { .. } => ErrorCode::WorkerSpawn,

            Error::MainContextClosed => ErrorCode::MainContextClosed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if this is a configuration error (caller misconfiguration)
    pub fn is_configuration(&self) -> bool {
        (100..200).contains(&(self.code() as u16))
    }

    /// Check if this is a scheduling error (the context refused the job)
    pub fn is_scheduling(&self) -> bool {
        (300..400).contains(&(self.code() as u16))
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Rejected { .. } | Error::WorkerSpawn { .. } | Error::Io(_) | Error::IoWrite { .. }
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'offload config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'offload config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the [multi] and [single] pool settings. core_threads must not exceed max_threads."
            ),
            Error::UnknownService { .. } => Some(
                "Register the service before selecting it, or use one of the built-ins: 'single', 'multi'."
            ),
            Error::Rejected { .. } => Some(
                "The pool queue is full. Raise 'queue_capacity' (0 = unbounded) or submit less work at once."
            ),
            Error::ContextShutdown { .. } => Some(
                "The execution context was shut down. Register a fresh context under the same name."
            ),
            Error::WorkerSpawn { .. } => Some(
                "The OS refused to start a thread. Lower 'max_threads' or check process limits (ulimit -u)."
            ),
            Error::MainContextClosed => Some(
                "Keep the main loop running until every submitted task has delivered its outcome."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        let code = self.code();
        format!("[{}] {}", code.as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an unknown service error
    pub fn unknown_service(name: impl Into<String>, registered: Vec<String>) -> Self {
        Error::UnknownService {
            name: name.into(),
            registered,
        }
    }

    /// Create a rejected job error
    pub fn rejected(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Rejected {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Create a context shutdown error
    pub fn context_shutdown(context: impl Into<String>) -> Self {
        Error::ContextShutdown {
            context: context.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::UnknownService.as_str(), "E110");
        assert_eq!(ErrorCode::Rejected.as_str(), "E300");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigNotFound.exit_code(), 10);
        assert_eq!(ErrorCode::UnknownService.exit_code(), 10);
        assert_eq!(ErrorCode::IoRead.exit_code(), 20);
        assert_eq!(ErrorCode::Rejected.exit_code(), 30);
        assert_eq!(ErrorCode::MainContextClosed.exit_code(), 40);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_unknown_service_display() {
        let err = Error::unknown_service("bogus", vec!["multi".into(), "single".into()]);
        let msg = err.to_string();
        assert!(msg.contains("bogus"));
        assert!(msg.contains("multi, single"));
    }

    #[test]
    fn test_validation_display_names_field() {
        let err = Error::config_field_invalid("multi.max_threads", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration validation failed: must be at least 1 (field: multi.max_threads)"
        );
        assert!(!Error::config_validation("bad").to_string().contains("field"));
    }

    #[test]
    fn test_error_categories() {
        let err = Error::unknown_service("bogus", vec![]);
        assert!(err.is_configuration());
        assert!(!err.is_scheduling());

        let err = Error::rejected("offload-multi", "queue full");
        assert!(err.is_scheduling());
        assert!(!err.is_configuration());

        assert!(Error::context_shutdown("pool").is_scheduling());
        assert!(!Error::MainContextClosed.is_scheduling());
    }

    #[test]
    fn test_error_retryable() {
        assert!(Error::rejected("pool", "full").is_retryable());
        assert!(!Error::context_shutdown("pool").is_retryable());
        assert!(!Error::unknown_service("x", vec![]).is_retryable());
    }

    #[test]
    fn test_error_suggestions() {
        let err = Error::config_not_found("/test");
        assert!(err.suggestion().unwrap().contains("config init"));

        let err = Error::rejected("pool", "full");
        assert!(err.suggestion().unwrap().contains("queue_capacity"));

        assert!(Error::Internal("x".into()).suggestion().is_none());
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::unknown_service("bogus", vec!["single".into()]);
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E110"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let err = Error::config_not_found("/test/config.toml");
        let formatted = err.format_for_log();

        assert!(formatted.contains("[E100]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
