use crate::config::Config;
use crate::error::RegistryError;
use crate::models::{HistogramSpec, Phase, ProjectInfo, ProjectState, Snapshot};
use crate::services::site_audit_service::export::export_json;
use crate::services::site_audit_service::tracker::{JobTracker, SnapshotOutcome};
use crate::utils::{project_log, sanitize_filename, save_report};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub type SharedProject = Arc<RwLock<ProjectState>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectListing {
    pub project_id: String,
    pub project_name: String,
    pub phase: Phase,
}

/// All projects tracked by this process, indexed by project id.
///
/// Each project sits behind its own lock, so a snapshot for one project
/// never waits on another, and readers only ever see a project before or
/// after a whole snapshot has been applied.
pub struct ProjectRegistry {
    projects: RwLock<HashMap<String, SharedProject>>,
    tracker: JobTracker,
    spec: HistogramSpec,
    activity_log_dir: Option<PathBuf>,
    report_dir: Option<PathBuf>,
}

impl ProjectRegistry {
    pub fn new(tracker: JobTracker, spec: HistogramSpec) -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            tracker,
            spec,
            activity_log_dir: None,
            report_dir: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(JobTracker::new(config.staleness_timeout), config.histogram)
            .with_activity_log_dir(config.log_dir.clone())
            .with_report_dir(config.report_dir.clone())
    }

    pub fn with_activity_log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.activity_log_dir = dir;
        self
    }

    pub fn with_report_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.report_dir = dir;
        self
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub async fn create(&self, info: ProjectInfo, now: DateTime<Utc>) -> String {
        let project_id = Uuid::new_v4().to_string();
        let state = ProjectState::new(project_id.clone(), info, self.spec, now);
        info!("project {} created ({})", project_id, state.info().project_name);
        let queued = format!("Project queued: {}", state.info().project_name);

        self.projects
            .write()
            .await
            .insert(project_id.clone(), Arc::new(RwLock::new(state)));
        self.log_activity(&project_id, &queued).await;
        project_id
    }

    /// Stop tracking a project. Returns the removed project, if it existed.
    pub async fn remove(&self, project_id: &str) -> Result<SharedProject, RegistryError> {
        let removed = self
            .projects
            .write()
            .await
            .remove(project_id)
            .ok_or_else(|| RegistryError::NotFound(project_id.to_string()))?;
        info!("project {} removed", project_id);
        self.log_activity(project_id, "Project removed").await;
        Ok(removed)
    }

    pub async fn get(&self, project_id: &str) -> Option<SharedProject> {
        self.projects.read().await.get(project_id).cloned()
    }

    async fn require(&self, project_id: &str) -> Result<SharedProject, RegistryError> {
        self.get(project_id)
            .await
            .ok_or_else(|| RegistryError::NotFound(project_id.to_string()))
    }

    pub async fn list(&self) -> Vec<ProjectListing> {
        let projects: Vec<SharedProject> = self.projects.read().await.values().cloned().collect();
        let mut listings = Vec::with_capacity(projects.len());
        for project in projects {
            let state = project.read().await;
            listings.push(ProjectListing {
                project_id: state.project_id().to_string(),
                project_name: state.info().project_name.clone(),
                phase: state.phase(),
            });
        }
        listings.sort_by(|a, b| {
            a.project_name
                .cmp(&b.project_name)
                .then_with(|| a.project_id.cmp(&b.project_id))
        });
        listings
    }

    /// Validate and apply one runner snapshot to a project.
    pub async fn ingest(
        &self,
        project_id: &str,
        raw: Value,
        now: DateTime<Utc>,
    ) -> Result<SnapshotOutcome, RegistryError> {
        let project = self.require(project_id).await?;
        let snapshot = match Snapshot::from_value(raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("project {}: snapshot rejected: {}", project_id, e);
                self.log_activity(project_id, &format!("❌ Snapshot rejected: {}", e))
                    .await;
                return Err(e.into());
            }
        };

        let (outcome, completed_report) = {
            let mut state = project.write().await;
            let outcome = self.tracker.apply_snapshot(&mut state, &snapshot, now);
            let completed_report = (outcome.phase_changed() && outcome.phase == Phase::Complete)
                .then(|| export_json(&state));
            (outcome, completed_report)
        };

        self.log_activity(
            project_id,
            &format!(
                "Snapshot applied: {} new/updated, {} unchanged, {} skipped",
                outcome.applied, outcome.unchanged, outcome.skipped
            ),
        )
        .await;
        if outcome.phase_changed() {
            self.log_activity(
                project_id,
                &format!("Phase {} -> {}", outcome.previous_phase, outcome.phase),
            )
            .await;
        }
        if let Some(report) = completed_report {
            self.save_completed_report(project_id, &report).await;
        }

        Ok(outcome)
    }

    pub async fn cancel(&self, project_id: &str) -> Result<Phase, RegistryError> {
        let project = self.require(project_id).await?;
        let (cancelled, phase) = {
            let mut state = project.write().await;
            let cancelled = self.tracker.cancel(&mut state);
            (cancelled, state.phase())
        };
        if cancelled {
            self.log_activity(project_id, "❌ Cancelled by user").await;
        }
        Ok(phase)
    }

    /// Fail every running or partial project that has gone silent.
    /// Returns the ids that were failed.
    pub async fn sweep_stale(&self, now: DateTime<Utc>) -> Vec<String> {
        let projects: Vec<(String, SharedProject)> = self
            .projects
            .read()
            .await
            .iter()
            .map(|(id, project)| (id.clone(), project.clone()))
            .collect();

        let mut failed = Vec::new();
        for (project_id, project) in projects {
            let stale = self.tracker.check_staleness(&mut *project.write().await, now);
            if stale {
                self.log_activity(&project_id, "❌ No snapshot within the staleness timeout")
                    .await;
                failed.push(project_id);
            }
        }
        failed.sort();
        failed
    }

    async fn log_activity(&self, project_id: &str, text: &str) {
        if let Some(dir) = &self.activity_log_dir {
            if let Err(e) = project_log(dir, project_id, text).await {
                warn!("project {}: could not write activity log: {}", project_id, e);
            }
        }
    }

    async fn save_completed_report(&self, project_id: &str, report: &[u8]) {
        let Some(dir) = &self.report_dir else {
            return;
        };
        let path = dir.join(format!("{}.json", sanitize_filename(project_id)));
        match save_report(&path, report).await {
            Ok(()) => {
                info!("project {}: report saved to {}", project_id, path.display());
                self.log_activity(project_id, "✅ Report saved").await;
            }
            Err(e) => warn!("project {}: could not save report: {:#}", project_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapshotRejectedError;
    use chrono::Duration;
    use serde_json::json;

    fn registry() -> ProjectRegistry {
        ProjectRegistry::new(JobTracker::new(Duration::seconds(60)), HistogramSpec::default())
    }

    fn info(name: &str) -> ProjectInfo {
        ProjectInfo {
            project_name: name.to_string(),
            ..ProjectInfo::default()
        }
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("migration-audit-test-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn projects_are_tracked_independently() {
        let registry = registry();
        let now = Utc::now();
        let first = registry.create(info("first"), now).await;
        let second = registry.create(info("second"), now).await;
        assert_ne!(first, second);

        registry
            .ingest(
                &first,
                json!({
                    "phase_hint": "running",
                    "total_urls": 2,
                    "new_or_updated_records": [{"url": "/a", "seo_score": 50}]
                }),
                now,
            )
            .await
            .unwrap();

        let first_state = registry.get(&first).await.unwrap();
        let second_state = registry.get(&second).await.unwrap();
        assert_eq!(first_state.read().await.phase(), Phase::Running);
        assert_eq!(second_state.read().await.phase(), Phase::Queued);
        assert!(second_state.read().await.store().is_empty());

        let names: Vec<String> =
            registry.list().await.into_iter().map(|l| l.project_name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let registry = registry();
        let err = registry.ingest("nope", json!({}), Utc::now()).await.unwrap_err();
        assert_eq!(err, RegistryError::NotFound("nope".to_string()));
        assert!(registry.cancel("nope").await.is_err());
    }

    #[tokio::test]
    async fn rejected_snapshot_surfaces_as_error() {
        let registry = registry();
        let id = registry.create(info("p"), Utc::now()).await;
        let err = registry.ingest(&id, json!("garbage"), Utc::now()).await.unwrap_err();
        assert_eq!(err, RegistryError::SnapshotRejected(SnapshotRejectedError::NotAnObject));
    }

    #[tokio::test]
    async fn sweep_fails_only_silent_projects() {
        let registry = registry();
        let start = Utc::now();
        let quiet = registry.create(info("quiet"), start).await;
        let chatty = registry.create(info("chatty"), start).await;
        let queued = registry.create(info("queued"), start).await;

        let running = json!({"phase_hint": "running", "total_urls": 1});
        registry.ingest(&quiet, running.clone(), start).await.unwrap();
        registry.ingest(&chatty, running, start + Duration::seconds(50)).await.unwrap();

        let failed = registry.sweep_stale(start + Duration::seconds(90)).await;
        assert_eq!(failed, vec![quiet.clone()]);

        assert_eq!(phase_of(&registry, &quiet).await, Phase::Failed);
        assert_eq!(phase_of(&registry, &chatty).await, Phase::Running);
        assert_eq!(phase_of(&registry, &queued).await, Phase::Queued);
    }

    async fn phase_of(registry: &ProjectRegistry, project_id: &str) -> Phase {
        let project = registry.get(project_id).await.unwrap();
        let phase = project.read().await.phase();
        phase
    }

    #[tokio::test]
    async fn cancel_marks_failed() {
        let registry = registry();
        let id = registry.create(info("p"), Utc::now()).await;
        assert_eq!(registry.cancel(&id).await.unwrap(), Phase::Failed);
        assert_eq!(registry.cancel(&id).await.unwrap(), Phase::Failed);
    }

    #[tokio::test]
    async fn completion_writes_activity_log_and_report() {
        let logs = temp_dir();
        let reports = temp_dir();
        let registry = registry()
            .with_activity_log_dir(Some(logs.clone()))
            .with_report_dir(Some(reports.clone()));
        let now = Utc::now();
        let id = registry.create(info("done"), now).await;

        registry.ingest(&id, json!({"phase_hint": "running", "total_urls": 1}), now).await.unwrap();
        let outcome = registry
            .ingest(
                &id,
                json!({
                    "phase_hint": "completed",
                    "total_urls": 1,
                    "new_or_updated_records": [{"url": "/a", "performance_score": 64}]
                }),
                now,
            )
            .await
            .unwrap();
        assert_eq!(outcome.phase, Phase::Complete);

        let log_file = logs.join(format!("{}.txt", sanitize_filename(&id)));
        let log = std::fs::read_to_string(log_file).unwrap();
        assert!(log.contains("Phase running -> complete"));

        let report_file = reports.join(format!("{}.json", sanitize_filename(&id)));
        let saved = std::fs::read(report_file).unwrap();
        let report = crate::services::parse_json_report(&saved).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.phase, Phase::Complete);

        let _ = std::fs::remove_dir_all(logs);
        let _ = std::fs::remove_dir_all(reports);
    }

    #[tokio::test]
    async fn removed_project_is_forgotten() {
        let logs = temp_dir();
        let registry = registry().with_activity_log_dir(Some(logs.clone()));
        let now = Utc::now();
        let keep = registry.create(info("keep"), now).await;
        let gone = registry.create(info("gone"), now).await;
        registry.cancel(&gone).await.unwrap();

        registry.remove(&gone).await.unwrap();
        assert!(registry.get(&gone).await.is_none());
        assert!(registry.get(&keep).await.is_some());
        assert_eq!(registry.list().await.len(), 1);
        assert_eq!(
            registry.remove(&gone).await.unwrap_err(),
            RegistryError::NotFound(gone.clone())
        );

        let log = std::fs::read_to_string(logs.join(format!("{}.txt", sanitize_filename(&gone))))
            .unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert!(lines[0].ends_with("::Project queued: gone"));
        assert!(lines[1].ends_with("::❌ Cancelled by user"));
        assert!(lines[2].ends_with("::Project removed"));

        let _ = std::fs::remove_dir_all(logs);
    }
}
