use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed-width bucketing of 0-100 scores.
///
/// Upper bounds are inclusive, so with the default width the buckets are
/// `0-20`, `21-40`, `41-60`, `61-80` and `81-100`, and a perfect score lands
/// in the top bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramSpec {
    bucket_width: u32,
}

impl HistogramSpec {
    pub const DEFAULT_WIDTH: u32 = 20;

    pub fn new(bucket_width: u32) -> Option<Self> {
        if (1..=100).contains(&bucket_width) {
            Some(Self { bucket_width })
        } else {
            None
        }
    }

    pub fn bucket_width(&self) -> u32 {
        self.bucket_width
    }

    pub fn bucket_count(&self) -> usize {
        ((100 + self.bucket_width - 1) / self.bucket_width) as usize
    }

    pub fn bucket_index(&self, score: f64) -> usize {
        let idx = (score / self.bucket_width as f64).ceil() as usize;
        idx.saturating_sub(1).min(self.bucket_count() - 1)
    }

    pub fn label(&self, index: usize) -> String {
        let width = self.bucket_width as usize;
        let lower = if index == 0 { 0 } else { index * width + 1 };
        let upper = ((index + 1) * width).min(100);
        format!("{}-{}", lower, upper)
    }
}

impl Default for HistogramSpec {
    fn default() -> Self {
        Self {
            bucket_width: Self::DEFAULT_WIDTH,
        }
    }
}

/// Running statistics over a project's records.
///
/// This is a cache: everything in it can be rebuilt from the record set and
/// the expected URL total. Score sums are held in thousandths of a point so
/// that subtracting a replaced record is exact.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectAggregate {
    pub(crate) spec: HistogramSpec,
    pub(crate) expected_total: u64,
    pub(crate) measured_count: u64,
    pub(crate) error_count: u64,
    pub(crate) pending_records: u64,
    pub(crate) performance_milli_sum: i64,
    pub(crate) performance_scored: u64,
    pub(crate) seo_milli_sum: i64,
    pub(crate) seo_scored: u64,
    pub(crate) mobile_friendly_count: u64,
    pub(crate) mobile_defined: u64,
    pub(crate) histogram: Vec<u64>,
}

impl ProjectAggregate {
    pub fn new(spec: HistogramSpec) -> Self {
        Self {
            spec,
            expected_total: 0,
            measured_count: 0,
            error_count: 0,
            pending_records: 0,
            performance_milli_sum: 0,
            performance_scored: 0,
            seo_milli_sum: 0,
            seo_scored: 0,
            mobile_friendly_count: 0,
            mobile_defined: 0,
            histogram: vec![0; spec.bucket_count()],
        }
    }

    pub fn spec(&self) -> HistogramSpec {
        self.spec
    }

    pub fn total_urls(&self) -> u64 {
        let known = self.measured_count + self.error_count + self.pending_records;
        self.expected_total.max(known)
    }

    pub fn measured_count(&self) -> u64 {
        self.measured_count
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn pending_count(&self) -> u64 {
        self.total_urls() - self.measured_count - self.error_count
    }

    pub fn avg_performance(&self) -> Option<f64> {
        mean_of_milli(self.performance_milli_sum, self.performance_scored)
    }

    pub fn avg_seo(&self) -> Option<f64> {
        mean_of_milli(self.seo_milli_sum, self.seo_scored)
    }

    pub fn mobile_friendly_ratio(&self) -> Option<f64> {
        if self.mobile_defined == 0 {
            return None;
        }
        Some(self.mobile_friendly_count as f64 / self.mobile_defined as f64)
    }

    pub fn score_histogram(&self) -> BTreeMap<String, u64> {
        self.histogram
            .iter()
            .enumerate()
            .map(|(idx, count)| (self.spec.label(idx), *count))
            .collect()
    }

    /// Read view handed to reports and the HTTP layer.
    pub fn summary(&self) -> AggregateSummary {
        AggregateSummary {
            total_urls: self.total_urls(),
            measured_count: self.measured_count,
            error_count: self.error_count,
            pending_count: self.pending_count(),
            avg_performance: self.avg_performance(),
            avg_seo: self.avg_seo(),
            mobile_friendly_ratio: self.mobile_friendly_ratio(),
            score_histogram: self.score_histogram(),
        }
    }
}

fn mean_of_milli(sum: i64, count: u64) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(sum as f64 / 1000.0 / count as f64)
    }
}

// pub struct for the exported project summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub total_urls: u64,
    pub measured_count: u64,
    pub error_count: u64,
    pub pending_count: u64,
    pub avg_performance: Option<f64>,
    pub avg_seo: Option<f64>,
    pub mobile_friendly_ratio: Option<f64>,
    pub score_histogram: BTreeMap<String, u64>,
}
