use crate::error::StalenessTimeoutError;
use crate::models::audit::aggregate::{AggregateSummary, HistogramSpec, ProjectAggregate};
use crate::models::audit::record::MetricRecord;
use crate::services::ResultStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Project lifecycle phase
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Queued,
    Running,
    Partial,
    Complete,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase_str = match self {
            Phase::Queued => "queued",
            Phase::Running => "running",
            Phase::Partial => "partial",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        };
        write!(f, "{}", phase_str)
    }
}

/// Why a project ended up `failed`. All three end the same way; the reason is
/// only kept for display.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    RunnerFault { message: Option<String> },
    StalenessTimeout(StalenessTimeoutError),
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::RunnerFault { message: Some(m) } => {
                write!(f, "job runner failed: {}", m)
            }
            FailureReason::RunnerFault { message: None } => write!(f, "job runner failed"),
            FailureReason::StalenessTimeout(e) => write!(f, "{}", e),
            FailureReason::Cancelled => write!(f, "cancelled by user"),
        }
    }
}

// Details supplied when a migration project is submitted
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProjectInfo {
    pub project_name: String,
    pub description: Option<String>,
    pub old_base_url: Option<String>,
    pub new_base_url: Option<String>,
}

/// Everything known about one tracked project.
///
/// Only the job tracker mutates a `ProjectState`; everyone else reads it.
#[derive(Debug, Clone)]
pub struct ProjectState {
    project_id: String,
    pub(crate) info: ProjectInfo,
    pub(crate) phase: Phase,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_snapshot_at: DateTime<Utc>,
    pub(crate) stage: Option<String>,
    pub(crate) progress: Option<f64>,
    pub(crate) failure: Option<FailureReason>,
    pub(crate) store: ResultStore,
}

impl ProjectState {
    pub fn new(
        project_id: impl Into<String>,
        info: ProjectInfo,
        spec: HistogramSpec,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            info,
            phase: Phase::Queued,
            created_at: now,
            last_snapshot_at: now,
            stage: None,
            progress: None,
            failure: None,
            store: ResultStore::new(spec),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn info(&self) -> &ProjectInfo {
        &self.info
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_snapshot_at(&self) -> DateTime<Utc> {
        self.last_snapshot_at
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn get_records(&self) -> Vec<&MetricRecord> {
        self.store.get_records()
    }

    pub fn get_aggregate(&self) -> AggregateSummary {
        self.store.get_aggregate()
    }

    pub fn aggregate(&self) -> &ProjectAggregate {
        self.store.aggregate()
    }
}
