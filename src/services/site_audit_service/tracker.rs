use crate::error::{SnapshotRejectedError, StalenessTimeoutError};
use crate::models::{FailureReason, Phase, PhaseHint, ProjectState, Snapshot};
use crate::services::site_audit_service::compute::normalize;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

// Result of applying one snapshot to a project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotOutcome {
    pub previous_phase: Phase,
    pub phase: Phase,
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl SnapshotOutcome {
    pub fn phase_changed(&self) -> bool {
        self.previous_phase != self.phase
    }
}

/// Drives the lifecycle of tracked projects from runner snapshots.
///
/// The tracker holds no project data itself; every call takes the
/// `ProjectState` it should act on.
#[derive(Debug, Clone, Copy)]
pub struct JobTracker {
    staleness_timeout: Duration,
}

impl JobTracker {
    pub fn new(staleness_timeout: Duration) -> Self {
        Self { staleness_timeout }
    }

    pub fn staleness_timeout(&self) -> Duration {
        self.staleness_timeout
    }

    pub fn apply_raw_snapshot(
        &self,
        state: &mut ProjectState,
        raw: Value,
        now: DateTime<Utc>,
    ) -> Result<SnapshotOutcome, SnapshotRejectedError> {
        let snapshot = Snapshot::from_value(raw)?;
        Ok(self.apply_snapshot(state, &snapshot, now))
    }

    /// Apply one snapshot: merge its records, then move the phase on.
    ///
    /// Re-applying a snapshot never changes records or aggregate a second
    /// time. Terminal projects still take the records but keep their phase.
    pub fn apply_snapshot(
        &self,
        state: &mut ProjectState,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
    ) -> SnapshotOutcome {
        let previous_phase = state.phase;
        let mut outcome = SnapshotOutcome {
            previous_phase,
            phase: previous_phase,
            applied: 0,
            unchanged: 0,
            skipped: 0,
        };

        let mut records = Vec::with_capacity(snapshot.new_or_updated_records.len());
        for raw in &snapshot.new_or_updated_records {
            match normalize(raw) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("project {}: skipping record: {}", state.project_id(), e);
                    outcome.skipped += 1;
                }
            }
        }
        let delivered_records = !records.is_empty();

        state.store.set_expected_total(snapshot.total_urls);
        for record in records {
            if state.store.apply(record).changed() {
                outcome.applied += 1;
            } else {
                outcome.unchanged += 1;
            }
        }

        state.last_snapshot_at = state.last_snapshot_at.max(now);
        if let Some(stage) = &snapshot.stage {
            state.stage = Some(stage.clone());
        }
        if let Some(progress) = snapshot.progress.filter(|p| p.is_finite()) {
            state.progress = Some(progress.clamp(0.0, 100.0));
        }

        if previous_phase.is_terminal() {
            if outcome.applied > 0 {
                debug!(
                    "project {}: {} late records after {}",
                    state.project_id(),
                    outcome.applied,
                    previous_phase
                );
            }
            return outcome;
        }

        match self.next_phase(state, snapshot, delivered_records) {
            Transition::Stay => {}
            Transition::To(phase) => {
                info!("project {}: {} -> {}", state.project_id(), previous_phase, phase);
                state.phase = phase;
            }
            Transition::Fail(reason) => fail(state, reason),
        }

        outcome.phase = state.phase;
        outcome
    }

    fn next_phase(
        &self,
        state: &ProjectState,
        snapshot: &Snapshot,
        delivered_records: bool,
    ) -> Transition {
        if snapshot.phase_hint == PhaseHint::Failed {
            return Transition::Fail(FailureReason::RunnerFault {
                message: snapshot.message.clone(),
            });
        }

        match state.phase {
            Phase::Queued => {
                // a runner can finish before its first delivery reaches us
                if snapshot.phase_hint == PhaseHint::Completed
                    && state.store.aggregate().pending_count() == 0
                {
                    Transition::To(Phase::Complete)
                } else if snapshot.phase_hint == PhaseHint::Queued && !delivered_records {
                    Transition::Stay
                } else {
                    Transition::To(Phase::Running)
                }
            }
            Phase::Running | Phase::Partial => {
                let aggregate = state.store.aggregate();
                let finished = aggregate.measured_count() + aggregate.error_count();

                if snapshot.phase_hint == PhaseHint::Completed {
                    if aggregate.pending_count() == 0 {
                        return Transition::To(Phase::Complete);
                    }
                    warn!(
                        "project {}: runner reports completion with {} urls still pending",
                        state.project_id(),
                        aggregate.pending_count()
                    );
                }

                if state.phase == Phase::Running
                    && aggregate.measured_count() > 0
                    && finished < aggregate.total_urls()
                {
                    Transition::To(Phase::Partial)
                } else {
                    Transition::Stay
                }
            }
            Phase::Complete | Phase::Failed => Transition::Stay,
        }
    }

    /// Fail a running or partial project that has been silent for longer
    /// than the staleness timeout. Returns whether the phase changed.
    pub fn check_staleness(&self, state: &mut ProjectState, now: DateTime<Utc>) -> bool {
        if !matches!(state.phase, Phase::Running | Phase::Partial) {
            return false;
        }
        let silent_for = now - state.last_snapshot_at;
        if silent_for <= self.staleness_timeout {
            return false;
        }
        fail(
            state,
            FailureReason::StalenessTimeout(StalenessTimeoutError {
                silent_for_secs: silent_for.num_seconds(),
                timeout_secs: self.staleness_timeout.num_seconds(),
            }),
        );
        true
    }

    /// User cancellation ends the project exactly like a timeout does.
    pub fn cancel(&self, state: &mut ProjectState) -> bool {
        if state.phase.is_terminal() {
            return false;
        }
        fail(state, FailureReason::Cancelled);
        true
    }
}

enum Transition {
    Stay,
    To(Phase),
    Fail(FailureReason),
}

fn fail(state: &mut ProjectState, reason: FailureReason) {
    warn!("project {}: {} -> failed ({})", state.project_id(), state.phase, reason);
    state.phase = Phase::Failed;
    state.failure = Some(reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistogramSpec, ProjectInfo, RecordStatus};
    use crate::services::site_audit_service::export::export_csv;
    use chrono::TimeZone;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn tracker() -> JobTracker {
        JobTracker::new(Duration::seconds(600))
    }

    fn project() -> ProjectState {
        ProjectState::new("p-1", ProjectInfo::default(), HistogramSpec::default(), t0())
    }

    fn snapshot(value: Value) -> Snapshot {
        Snapshot::from_value(value).unwrap()
    }

    fn running(total_urls: u64) -> Snapshot {
        snapshot(json!({"phase_hint": "running", "total_urls": total_urls}))
    }

    fn assert_counts_add_up(state: &ProjectState) {
        let agg = state.get_aggregate();
        assert_eq!(agg.measured_count + agg.error_count + agg.pending_count, agg.total_urls);
        assert_eq!(*state.aggregate(), state.store().recomputed());
    }

    // Three urls: /a measured (clamped), /b errors, then either silence or /c.
    fn run_first_two_snapshots(tracker: &JobTracker, state: &mut ProjectState) {
        let first = tracker.apply_snapshot(
            state,
            &snapshot(json!({
                "phase_hint": "running",
                "total_urls": 3,
                "new_or_updated_records": [{"url": "/a", "performance_score": 150}]
            })),
            t0() + Duration::seconds(10),
        );
        assert_eq!(first.phase, Phase::Running);
        assert_eq!(state.store().get("/a").unwrap().performance_score, Some(100.0));
        assert_eq!(state.get_aggregate().score_histogram["81-100"], 1);
        assert_counts_add_up(state);

        let second = tracker.apply_snapshot(
            state,
            &snapshot(json!({
                "phase_hint": "running",
                "total_urls": 3,
                "new_or_updated_records": [{"url": "/b", "error": "connection refused"}]
            })),
            t0() + Duration::seconds(20),
        );
        assert_eq!(second.phase, Phase::Partial);
        let agg = state.get_aggregate();
        assert_eq!((agg.measured_count, agg.error_count, agg.pending_count), (1, 1, 1));
        assert_counts_add_up(state);
    }

    #[test]
    fn silence_fails_partial_project_but_keeps_results() {
        let tracker = tracker();
        let mut state = project();
        run_first_two_snapshots(&tracker, &mut state);

        assert!(!tracker.check_staleness(&mut state, t0() + Duration::seconds(620)));
        assert_eq!(state.phase(), Phase::Partial);

        assert!(tracker.check_staleness(&mut state, t0() + Duration::seconds(621)));
        assert_eq!(state.phase(), Phase::Failed);
        assert!(matches!(state.failure(), Some(FailureReason::StalenessTimeout(_))));

        let csv = String::from_utf8(export_csv(&state)).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.lines().nth(1).unwrap().starts_with("/a,measured,100,"));
        assert!(csv.lines().nth(2).unwrap().starts_with("/b,error,"));
    }

    #[test]
    fn final_snapshot_completes_project() {
        let tracker = tracker();
        let mut state = project();
        run_first_two_snapshots(&tracker, &mut state);

        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "completed",
                "total_urls": 3,
                "new_or_updated_records": [{"url": "/c", "performance_score": 50, "seo_score": 88}]
            })),
            t0() + Duration::seconds(30),
        );
        assert_eq!(outcome.phase, Phase::Complete);
        let agg = state.get_aggregate();
        assert_eq!(agg.pending_count, 0);
        assert_eq!(agg.avg_performance, Some(75.0));
        assert_counts_add_up(&state);
    }

    #[test]
    fn reapplying_a_snapshot_changes_nothing() {
        let tracker = tracker();
        let mut state = project();
        let snap = snapshot(json!({
            "phase_hint": "running",
            "total_urls": 4,
            "new_or_updated_records": [
                {"url": "/a", "performance_score": 42, "mobile_friendly": true},
                {"url": "/b", "status": "failed"},
                {"url": "/c"}
            ]
        }));

        tracker.apply_snapshot(&mut state, &snap, t0());
        let records: Vec<_> = state.get_records().into_iter().cloned().collect();
        let aggregate = state.aggregate().clone();

        let again = tracker.apply_snapshot(&mut state, &snap, t0());
        assert_eq!(again.applied, 0);
        assert_eq!(again.unchanged, 3);
        let records_again: Vec<_> = state.get_records().into_iter().cloned().collect();
        assert_eq!(records_again, records);
        assert_eq!(*state.aggregate(), aggregate);
    }

    #[test]
    fn stale_pending_delivery_does_not_undo_a_result() {
        let tracker = tracker();
        let mut state = project();
        let old = snapshot(json!({
            "phase_hint": "running",
            "total_urls": 1,
            "new_or_updated_records": [{"url": "/a", "status": "pending"}]
        }));
        let new = snapshot(json!({
            "phase_hint": "running",
            "total_urls": 1,
            "new_or_updated_records": [{"url": "/a", "seo_score": 77}]
        }));

        tracker.apply_snapshot(&mut state, &new, t0());
        tracker.apply_snapshot(&mut state, &old, t0());
        assert_eq!(state.store().get("/a").unwrap().status, RecordStatus::Measured);
        assert_counts_add_up(&state);
    }

    #[test]
    fn malformed_records_are_skipped_individually() {
        let tracker = tracker();
        let mut state = project();
        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "running",
                "total_urls": 2,
                "new_or_updated_records": [
                    {"performance_score": 10},
                    "junk",
                    {"url": "/ok", "seo_score": 50}
                ]
            })),
            t0(),
        );
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.applied, 1);
        assert_eq!(state.store().len(), 1);
    }

    #[test]
    fn rejected_snapshot_leaves_state_alone() {
        let tracker = tracker();
        let mut state = project();
        let result = tracker.apply_raw_snapshot(
            &mut state,
            json!({"phase_hint": "bogus", "total_urls": 3}),
            t0() + Duration::seconds(5),
        );
        assert!(result.is_err());
        assert_eq!(state.phase(), Phase::Queued);
        assert_eq!(state.last_snapshot_at(), t0());
        assert!(state.store().is_empty());
    }

    #[test]
    fn queued_hint_without_records_stays_queued() {
        let tracker = tracker();
        let mut state = project();
        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({"phase_hint": "pending", "total_urls": 5})),
            t0(),
        );
        assert_eq!(outcome.phase, Phase::Queued);
        assert!(!tracker.check_staleness(&mut state, t0() + Duration::days(1)));
    }

    #[test]
    fn runner_fault_fails_project() {
        let tracker = tracker();
        let mut state = project();
        tracker.apply_snapshot(&mut state, &running(2), t0());
        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "failed",
                "total_urls": 2,
                "message": "sitemap unreachable"
            })),
            t0(),
        );
        assert_eq!(outcome.phase, Phase::Failed);
        assert_eq!(
            state.failure(),
            Some(&FailureReason::RunnerFault { message: Some("sitemap unreachable".to_string()) })
        );
    }

    #[test]
    fn terminal_phase_accepts_late_records() {
        let tracker = tracker();
        let mut state = project();
        tracker.apply_snapshot(&mut state, &running(1), t0());
        assert!(tracker.cancel(&mut state));
        assert_eq!(state.failure(), Some(&FailureReason::Cancelled));

        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "completed",
                "total_urls": 1,
                "new_or_updated_records": [{"url": "/late", "performance_score": 12}]
            })),
            t0(),
        );
        assert_eq!(outcome.phase, Phase::Failed);
        assert_eq!(outcome.applied, 1);
        assert_eq!(state.get_aggregate().measured_count, 1);
        assert!(!tracker.cancel(&mut state));
    }

    #[test]
    fn completion_waits_for_pending_urls() {
        let tracker = tracker();
        let mut state = project();
        tracker.apply_snapshot(&mut state, &running(2), t0());
        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "completed",
                "total_urls": 2,
                "new_or_updated_records": [{"url": "/a", "performance_score": 90}]
            })),
            t0(),
        );
        assert_eq!(outcome.phase, Phase::Partial);
    }

    #[test]
    fn stage_and_progress_are_tracked() {
        let tracker = tracker();
        let mut state = project();
        tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "processing",
                "total_urls": 9,
                "stage": "seo_validation",
                "progress": 140
            })),
            t0(),
        );
        assert_eq!(state.stage(), Some("seo_validation"));
        assert_eq!(state.progress(), Some(100.0));
    }

    #[test]
    fn runner_that_finished_before_first_delivery_completes() {
        let tracker = tracker();
        let mut state = project();
        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "completed",
                "total_urls": 2,
                "new_or_updated_records": [
                    {"url": "/a", "performance_score": 80},
                    {"url": "/b", "seo_score": 70}
                ]
            })),
            t0(),
        );
        assert_eq!(outcome.phase, Phase::Complete);
        assert_eq!(state.get_aggregate().pending_count, 0);
        assert!(!tracker.check_staleness(&mut state, t0() + Duration::seconds(601)));
        assert_eq!(state.phase(), Phase::Complete);
        assert_eq!(state.failure(), None);
    }

    #[test]
    fn completed_hint_while_queued_with_pending_urls_only_starts() {
        let tracker = tracker();
        let mut state = project();
        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "completed",
                "total_urls": 2,
                "new_or_updated_records": [{"url": "/a", "performance_score": 80}]
            })),
            t0(),
        );
        assert_eq!(outcome.phase, Phase::Running);
    }

    #[test]
    fn errors_alone_do_not_make_a_project_partial() {
        let tracker = tracker();
        let mut state = project();
        tracker.apply_snapshot(&mut state, &running(3), t0());
        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "running",
                "total_urls": 3,
                "new_or_updated_records": [{"url": "/b", "error": "dns"}]
            })),
            t0(),
        );
        assert_eq!(outcome.phase, Phase::Running);
        let agg = state.get_aggregate();
        assert_eq!((agg.measured_count, agg.error_count), (0, 1));

        let outcome = tracker.apply_snapshot(
            &mut state,
            &snapshot(json!({
                "phase_hint": "running",
                "total_urls": 3,
                "new_or_updated_records": [{"url": "/a", "seo_score": 60}]
            })),
            t0(),
        );
        assert_eq!(outcome.phase, Phase::Partial);
    }
}
