// src/services/site_audit_service/mod.rs

pub mod compute;
pub mod export;
pub mod registry;
pub mod runner;
pub mod store;
pub mod tracker;

pub use compute::{
    compute_insights, compute_score_stats, normalize, recompute_aggregate, update_aggregate,
};
pub use export::{
    export, export_csv, export_csv_section, export_json, json_report, parse_json_report, JsonReport,
    ReportFormat, ReportSection,
};
pub use registry::{ProjectListing, ProjectRegistry, SharedProject};
pub use runner::{spawn_poller, spawn_staleness_watchdog, RunnerClient};
pub use store::{ApplyOutcome, ResultStore};
pub use tracker::{JobTracker, SnapshotOutcome};
