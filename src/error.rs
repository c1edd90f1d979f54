//! Error types for `punchline`
//!
//! One domain error per subsystem (joke fetching, the reveal state machine,
//! configuration) plus a top-level error that maps onto process exit codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::reveal::Phase;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `punchline` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Joke could not be fetched or decoded
    pub const FETCH_ERROR: i32 = 4;

    /// Reveal state machine rejected an action
    pub const REVEAL_ERROR: i32 = 5;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `punchline` operations.
///
/// Aggregates the domain errors and maps each onto an exit code.
#[derive(Debug, Error)]
pub enum PunchlineError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Joke provider failure
    #[error(transparent)]
    Fetch(#[from] JokeFetchError),

    /// Reveal state machine error
    #[error(transparent)]
    Reveal(#[from] RevealError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PunchlineError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Fetch(_) => ExitCode::FETCH_ERROR,
            Self::Reveal(_) => ExitCode::REVEAL_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Joke Fetch Errors
// ============================================================================

/// Coarse classification of a fetch failure.
///
/// The user only ever sees one notice; the kind is kept for logs and
/// metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Transport failure, timeout, or non-success HTTP status
    Network,
    /// Payload arrived but did not match the joke shape
    Decode,
}

impl FetchErrorKind {
    /// Stable lowercase label used in events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Decode => "decode",
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to obtain a joke from a [`JokeProvider`](crate::joke::JokeProvider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JokeFetchError {
    /// Connection or transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Endpoint answered with a non-success status
    #[error("joke endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// Request did not complete within the configured timeout
    #[error("joke request timed out")]
    Timeout,

    /// Response body exceeded the size cap
    #[error("response body exceeds {limit} byte limit")]
    TooLarge {
        /// Configured cap in bytes
        limit: usize,
    },

    /// Response body is not a valid joke payload
    #[error("malformed joke payload: {0}")]
    Decode(String),

    /// Provider has nothing to serve
    #[error("joke provider is empty")]
    Exhausted,
}

impl JokeFetchError {
    /// Returns the coarse failure kind.
    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Decode(_) => FetchErrorKind::Decode,
            Self::Network(_)
            | Self::HttpStatus(_)
            | Self::Timeout
            | Self::TooLarge { .. }
            | Self::Exhausted => FetchErrorKind::Network,
        }
    }
}

// ============================================================================
// Reveal Errors
// ============================================================================

/// Errors raised by the reveal state machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RevealError {
    /// Action is not accepted in the current phase
    #[error("cannot {action} while in phase {from}")]
    InvalidTransition {
        /// Phase the machine was in
        from: Phase,
        /// Rejected action name
        action: &'static str,
    },

    /// Machine was shut down before the cycle completed
    #[error("reveal machine shut down")]
    Shutdown,
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("config file {path} is {size} bytes (limit: {limit})")]
    TooLarge {
        /// Path to the configuration file
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Limit in bytes
        limit: u64,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "timings.setup_hold")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Tests
// ============================================================================
