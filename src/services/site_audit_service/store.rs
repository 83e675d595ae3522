use crate::models::{AggregateSummary, HistogramSpec, MetricRecord, ProjectAggregate};
use crate::services::site_audit_service::compute::{recompute_aggregate, update_aggregate};
use std::collections::HashMap;

// What `ResultStore::apply` did with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Replaced,
    Unchanged,
    /// A pending result arrived for a url that already has a final result.
    Ignored,
}

impl ApplyOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, ApplyOutcome::Inserted | ApplyOutcome::Replaced)
    }
}

/// Canonical records of one project, keyed by url, plus the aggregate kept
/// in step with them. Every mutation goes through `apply`, which updates the
/// record and the aggregate together.
#[derive(Debug, Clone)]
pub struct ResultStore {
    records: HashMap<String, MetricRecord>,
    aggregate: ProjectAggregate,
}

impl ResultStore {
    pub fn new(spec: HistogramSpec) -> Self {
        Self {
            records: HashMap::new(),
            aggregate: ProjectAggregate::new(spec),
        }
    }

    /// Records sorted by url.
    pub fn get_records(&self) -> Vec<&MetricRecord> {
        let mut records: Vec<&MetricRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.url.cmp(&b.url));
        records
    }

    pub fn get(&self, url: &str) -> Option<&MetricRecord> {
        self.records.get(url)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get_aggregate(&self) -> AggregateSummary {
        self.aggregate.summary()
    }

    pub fn aggregate(&self) -> &ProjectAggregate {
        &self.aggregate
    }

    pub fn expected_total(&self) -> u64 {
        self.aggregate.expected_total
    }

    /// Full rescan of the records, for consistency checks.
    pub fn recomputed(&self) -> ProjectAggregate {
        recompute_aggregate(
            self.records.values(),
            self.aggregate.expected_total,
            self.aggregate.spec(),
        )
    }

    // Totals only grow so a late, stale snapshot cannot shrink the project.
    pub(crate) fn set_expected_total(&mut self, total: u64) {
        self.aggregate.expected_total = self.aggregate.expected_total.max(total);
    }

    pub(crate) fn apply(&mut self, record: MetricRecord) -> ApplyOutcome {
        if let Some(existing) = self.records.get(&record.url) {
            if *existing == record {
                return ApplyOutcome::Unchanged;
            }
            if record.is_pending() {
                return ApplyOutcome::Ignored;
            }
        }

        let previous = self.records.insert(record.url.clone(), record.clone());
        update_aggregate(&mut self.aggregate, &record, previous.as_ref());

        match previous {
            Some(_) => ApplyOutcome::Replaced,
            None => ApplyOutcome::Inserted,
        }
    }
}
