pub mod site_audit_service;

pub use site_audit_service::{
    compute_insights, compute_score_stats, export, export_csv, export_csv_section, export_json,
    json_report, normalize, parse_json_report, recompute_aggregate, spawn_poller,
    spawn_staleness_watchdog, update_aggregate, ApplyOutcome, JobTracker, JsonReport,
    ProjectListing, ProjectRegistry, ReportFormat, ReportSection, ResultStore, RunnerClient,
    SharedProject, SnapshotOutcome,
};
