pub mod aggregate;
pub mod insights;
pub mod project;
pub mod record;
pub mod snapshot;

pub use aggregate::{AggregateSummary, HistogramSpec, ProjectAggregate};
pub use insights::{AuditInsights, ScoreStats, SeoBands};
pub use project::{FailureReason, Phase, ProjectInfo, ProjectState};
pub use record::{MetricRecord, RecordStatus};
pub use snapshot::{PhaseHint, Snapshot};
