//! Error types for the audit pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single raw record could not be turned into a `MetricRecord`.
/// The record is skipped; the rest of the snapshot still applies.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedRecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no url")]
    MissingUrl,

    #[error("record url is not a non-empty string")]
    InvalidUrl,
}

/// The whole snapshot is unusable. Project phase is left untouched and the
/// caller may retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotRejectedError {
    #[error("snapshot is not valid JSON: {0}")]
    Unparseable(String),

    #[error("snapshot is not a JSON object")]
    NotAnObject,

    #[error("snapshot has an invalid shape: {0}")]
    Shape(String),
}

/// No snapshot arrived within the staleness window. Never returned to
/// callers; it is recorded as the failure reason of the project.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("no snapshot received for {silent_for_secs}s (timeout {timeout_secs}s)")]
pub struct StalenessTimeoutError {
    pub silent_for_secs: i64,
    pub timeout_secs: i64,
}

/// Configuration loading or validation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Lookup and ingestion errors for tracked projects
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("project not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    SnapshotRejected(#[from] SnapshotRejectedError),
}
