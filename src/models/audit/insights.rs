use serde::{Deserialize, Serialize};

// pub struct to store score statistics (min, max, median, std deviation)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScoreStats {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub std_dev: f64,
}

// SEO match quality bands shown on the results page
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SeoBands {
    pub perfect: u64,
    pub good: u64,
    pub needs_work: u64,
}

// Read-time insights derived from the measured records
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AuditInsights {
    pub performance: Option<ScoreStats>,
    pub seo: Option<ScoreStats>,
    pub best_performance_page: Option<String>,
    pub worst_performance_page: Option<String>,
    pub seo_bands: SeoBands,
}
