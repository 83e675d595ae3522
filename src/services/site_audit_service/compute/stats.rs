use crate::models::{
    AuditInsights, HistogramSpec, MetricRecord, ProjectAggregate, ScoreStats, SeoBands,
};

const SEO_PERFECT: f64 = 95.0;
const SEO_GOOD: f64 = 80.0;

/// Fold one record into the running aggregate.
///
/// When `previous` is given it must be the record currently counted for the
/// same url; its contribution is taken out before the new one goes in.
pub fn update_aggregate(
    aggregate: &mut ProjectAggregate,
    record: &MetricRecord,
    previous: Option<&MetricRecord>,
) {
    if let Some(previous) = previous {
        contribute(aggregate, previous, false);
    }
    contribute(aggregate, record, true);
}

/// Rebuild an aggregate from scratch. Incremental updates must always agree
/// with this.
pub fn recompute_aggregate<'a, I>(
    records: I,
    expected_total: u64,
    spec: HistogramSpec,
) -> ProjectAggregate
where
    I: IntoIterator<Item = &'a MetricRecord>,
{
    let mut aggregate = ProjectAggregate::new(spec);
    aggregate.expected_total = expected_total;
    for record in records {
        contribute(&mut aggregate, record, true);
    }
    aggregate
}

fn contribute(aggregate: &mut ProjectAggregate, record: &MetricRecord, add: bool) {
    if record.is_pending() {
        bump(&mut aggregate.pending_records, add);
        return;
    }
    if record.is_error() {
        bump(&mut aggregate.error_count, add);
        return;
    }

    bump(&mut aggregate.measured_count, add);

    if let Some(score) = record.performance_score {
        shift(&mut aggregate.performance_milli_sum, to_milli(score), add);
        bump(&mut aggregate.performance_scored, add);
        let bucket = aggregate.spec.bucket_index(score);
        bump(&mut aggregate.histogram[bucket], add);
    }
    if let Some(score) = record.seo_score {
        shift(&mut aggregate.seo_milli_sum, to_milli(score), add);
        bump(&mut aggregate.seo_scored, add);
    }
    if let Some(friendly) = record.mobile_friendly {
        bump(&mut aggregate.mobile_defined, add);
        if friendly {
            bump(&mut aggregate.mobile_friendly_count, add);
        }
    }
}

fn bump(counter: &mut u64, add: bool) {
    if add {
        *counter += 1;
    } else {
        *counter = counter.saturating_sub(1);
    }
}

fn shift(sum: &mut i64, amount: i64, add: bool) {
    if add {
        *sum += amount;
    } else {
        *sum -= amount;
    }
}

fn to_milli(score: f64) -> i64 {
    (score * 1000.0).round() as i64
}

pub fn compute_score_stats(scores: &mut [f64]) -> Option<ScoreStats> {
    if scores.is_empty() {
        return None;
    }
    scores.sort_by(|a, b| a.total_cmp(b));

    let count = scores.len();
    let sum: f64 = scores.iter().sum();
    let mean = sum / count as f64;

    let variance = scores.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / count as f64;
    let std_dev = variance.sqrt();

    let median = if count % 2 == 0 {
        (scores[count / 2 - 1] + scores[count / 2]) / 2.0
    } else {
        scores[count / 2]
    };

    Some(ScoreStats {
        min: scores[0],
        max: scores[count - 1],
        median,
        std_dev,
    })
}

/// Summaries the results page shows next to the aggregate. Computed on read;
/// `records` is expected in url order so ties resolve the same way every time.
pub fn compute_insights(records: &[&MetricRecord]) -> AuditInsights {
    let mut performance = Vec::new();
    let mut seo = Vec::new();
    let mut best_page: Option<(&str, f64)> = None;
    let mut worst_page: Option<(&str, f64)> = None;
    let mut seo_bands = SeoBands::default();

    for record in records.iter().filter(|r| r.is_measured()) {
        if let Some(score) = record.performance_score {
            performance.push(score);
            if best_page.map_or(true, |(_, best)| score > best) {
                best_page = Some((record.url.as_str(), score));
            }
            if worst_page.map_or(true, |(_, worst)| score < worst) {
                worst_page = Some((record.url.as_str(), score));
            }
        }

        if let Some(score) = record.seo_score {
            seo.push(score);
            if score >= SEO_PERFECT {
                seo_bands.perfect += 1;
            } else if score >= SEO_GOOD {
                seo_bands.good += 1;
            } else {
                seo_bands.needs_work += 1;
            }
        }
    }

    AuditInsights {
        performance: compute_score_stats(&mut performance),
        seo: compute_score_stats(&mut seo),
        best_performance_page: best_page.map(|(url, _)| url.to_string()),
        worst_performance_page: worst_page.map(|(url, _)| url.to_string()),
        seo_bands,
    }
}
