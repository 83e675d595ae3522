use serde::{Deserialize, Serialize};
use std::fmt;

// Per-URL audit status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Measured,
    Error,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Measured => "measured",
            RecordStatus::Error => "error",
        };
        write!(f, "{}", status_str)
    }
}

/// Canonical result for one audited URL.
///
/// Scores and `mobile_friendly` are only ever set on measured records and
/// `error_message` is set exactly when the status is `Error`. Build records
/// through the constructors (or the normalizer) to keep that true.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub url: String,
    pub status: RecordStatus,
    pub performance_score: Option<f64>,
    pub seo_score: Option<f64>,
    pub mobile_friendly: Option<bool>,
    pub error_message: Option<String>,
}

impl MetricRecord {
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: RecordStatus::Pending,
            performance_score: None,
            seo_score: None,
            mobile_friendly: None,
            error_message: None,
        }
    }

    pub fn measured(
        url: impl Into<String>,
        performance_score: Option<f64>,
        seo_score: Option<f64>,
        mobile_friendly: Option<bool>,
    ) -> Self {
        Self {
            url: url.into(),
            status: RecordStatus::Measured,
            performance_score,
            seo_score,
            mobile_friendly,
            error_message: None,
        }
    }

    pub fn error(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: RecordStatus::Error,
            performance_score: None,
            seo_score: None,
            mobile_friendly: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_measured(&self) -> bool {
        self.status == RecordStatus::Measured
    }

    pub fn is_error(&self) -> bool {
        self.status == RecordStatus::Error
    }

    pub fn is_pending(&self) -> bool {
        self.status == RecordStatus::Pending
    }
}
