// src/models/mod.rs

pub mod api;
pub mod app;
pub mod audit;

pub use api::{CreateProjectRequest, ExportParams};
pub use app::AppState;
pub use audit::{
    AggregateSummary, AuditInsights, FailureReason, HistogramSpec, MetricRecord, Phase, PhaseHint,
    ProjectAggregate, ProjectInfo, ProjectState, RecordStatus, ScoreStats, SeoBands, Snapshot,
};
