//! Unified error hierarchy for ReadyRS
//!
//! The computational engines (load, readiness, mission, session analytics) never
//! return errors: degraded input degrades the result instead. Only the ingestion
//! and persistence boundaries produce the faults defined here.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all ReadyRS operations
#[derive(Debug, Error)]
pub enum ReadyError {
    /// Malformed ingestion record
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationFault),

    /// Persistent store failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceFault),

    /// Telemetry fetch returned nothing usable
    #[error("Data unavailable: {0}")]
    DataUnavailable(#[from] DataUnavailableFault),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single ingestion record that could not be accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {record_index}: field `{field}` {reason}")]
pub struct ValidationFault {
    /// Zero-based position of the record in the submitted batch
    pub record_index: usize,

    /// Name of the offending field as it appears in the batch
    pub field: String,

    /// What was wrong with it
    pub reason: String,
}

impl ValidationFault {
    pub fn new(record_index: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            record_index,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Persistent store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceFault {
    /// A write did not reach the store
    #[error("Write failed during {operation}: {reason}")]
    WriteFailed { operation: String, reason: String },

    /// The store could not be read
    #[error("Read failed from {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    /// The store was readable but its content was not
    #[error("Corrupted store at {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },
}

/// Telemetry that was requested but came back empty or partial
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{metric}: {reason}")]
pub struct DataUnavailableFault {
    pub metric: String,
    pub reason: String,
}

impl DataUnavailableFault {
    pub fn new(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for ReadyRS operations
pub type Result<T> = std::result::Result<T, ReadyError>;

impl ReadyError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReadyError::Persistence(PersistenceFault::WriteFailed { .. })
                | ReadyError::DataUnavailable(_)
                | ReadyError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReadyError::Validation(_) => ErrorSeverity::Warning,
            ReadyError::DataUnavailable(_) => ErrorSeverity::Info,
            ReadyError::Persistence(PersistenceFault::Corrupted { .. }) => ErrorSeverity::Critical,
            ReadyError::Persistence(_) => ErrorSeverity::Error,
            ReadyError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ReadyError::Validation(fault) => format!(
                "Schedule entry #{} was skipped: {} {}",
                fault.record_index + 1,
                fault.field,
                fault.reason
            ),
            ReadyError::Persistence(PersistenceFault::WriteFailed { operation, .. }) => format!(
                "Could not save {}. Today's result is still shown but was not stored.",
                operation
            ),
            ReadyError::DataUnavailable(fault) => format!(
                "No {} data was available; neutral defaults were used.",
                fault.metric
            ),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
