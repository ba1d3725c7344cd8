//! Error types for `equipswap`
//!
//! The hierarchy separates the two fatal classes (configuration and
//! acquisition) from the recoverable ones (hook I/O and revert
//! preconditions), which the monitor only ever logs.

use std::path::PathBuf;
use thiserror::Error;

use crate::swap::slot::{LogicalSlot, PhysicalSlot};

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `equipswap` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid file, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Target process could not be acquired within the search timeout
    pub const ACQUISITION_ERROR: i32 = 4;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `equipswap` operations.
///
/// Aggregates the domain errors that are allowed to reach a caller and maps
/// each to an exit code.
#[derive(Debug, Error)]
pub enum EquipSwapError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Monitor loop error (acquisition)
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),
}

impl EquipSwapError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Monitor(MonitorError::AcquisitionTimeout { .. }) => ExitCode::ACQUISITION_ERROR,
            Self::Monitor(MonitorError::TaskFailed { .. }) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// Every variant is fatal: no partial configuration is ever accepted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be parsed
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
    #[error("validation failed for {path}: {}", format_issues(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "`RingTriggers[2]`")
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
    /// Prevents the configuration from being used
    Error,
    /// Reported, but the configuration still loads
    Warning,
}

// ============================================================================
// Hook Errors
// ============================================================================

/// Failures reported by the game hook capability.
///
/// All of these are recoverable from the monitor's point of view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    /// Reading a slot identifier failed
    #[error("failed to read {slot} for player {player}: {reason}")]
    ReadFailed {
        /// Player index the read targeted
        player: usize,
        /// Slot that was read
        slot: PhysicalSlot,
        /// Underlying reason
        reason: String,
    },

    /// Writing a slot identifier failed
    #[error("failed to write {value} to {slot} for player {player}: {reason}")]
    WriteFailed {
        /// Player index the write targeted
        player: usize,
        /// Slot that was written
        slot: PhysicalSlot,
        /// Value that was being written
        value: i32,
        /// Underlying reason
        reason: String,
    },

    /// Reading the active effect set failed
    #[error("failed to read active effects for player {player}: {reason}")]
    EffectsUnreadable {
        /// Player index
        player: usize,
        /// Underlying reason
        reason: String,
    },

    /// The entity handle no longer resolves to a live player
    #[error("player {player} is no longer available")]
    EntityUnavailable {
        /// Player index
        player: usize,
    },
}

impl HookError {
    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ReadFailed { .. } => "read",
            Self::WriteFailed { .. } => "write",
            Self::EffectsUnreadable { .. } => "effects",
            Self::EntityUnavailable { .. } => "entity",
        }
    }
}

// ============================================================================
// Swap Errors
// ============================================================================

/// Errors raised while applying or reverting a temporary swap.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SwapError {
    /// A revert was requested for a slot with no active override
    #[error("no temporary swap is active for {slot}")]
    NoActiveSwap {
        /// The logical slot that was asked to revert
        slot: LogicalSlot,
    },

    /// The live value no longer matches the override destination
    #[error(
        "{slot} holds {found}, not the expected temporary id {expected}; cannot safely revert"
    )]
    UnexpectedValue {
        /// The physical slot that was inspected
        slot: PhysicalSlot,
        /// Identifier the override wrote
        expected: i32,
        /// Identifier actually found
        found: i32,
    },

    /// The underlying hook call failed
    #[error(transparent)]
    Hook(#[from] HookError),
}

// ============================================================================
// Monitor Errors
// ============================================================================

/// Errors that terminate a monitor run.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The target could not be acquired within the configured timeout
    #[error("target process not found within {timeout_ms} ms")]
    AcquisitionTimeout {
        /// Configured search timeout in milliseconds
        timeout_ms: u64,
    },

    /// The background monitor task panicked or was aborted
    #[error("monitor task failed: {reason}")]
    TaskFailed {
        /// Join error description
        reason: String,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `equipswap` operations.
pub type Result<T> = std::result::Result<T, EquipSwapError>;

// ============================================================================
// Tests
// ============================================================================
