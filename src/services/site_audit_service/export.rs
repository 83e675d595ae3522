use crate::models::{AggregateSummary, MetricRecord, Phase, ProjectState};
use serde::{Deserialize, Serialize};

// Which columns a report carries
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportSection {
    #[default]
    All,
    Performance,
    Seo,
    Mobile,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Url,
    Status,
    PerformanceScore,
    SeoScore,
    MobileFriendly,
    ErrorMessage,
}

impl Column {
    fn header(&self) -> &'static str {
        match self {
            Column::Url => "url",
            Column::Status => "status",
            Column::PerformanceScore => "performance_score",
            Column::SeoScore => "seo_score",
            Column::MobileFriendly => "mobile_friendly",
            Column::ErrorMessage => "error_message",
        }
    }

    fn value(&self, record: &MetricRecord) -> String {
        match self {
            Column::Url => record.url.clone(),
            Column::Status => record.status.to_string(),
            Column::PerformanceScore => record
                .performance_score
                .map(|s| s.to_string())
                .unwrap_or_default(),
            Column::SeoScore => record.seo_score.map(|s| s.to_string()).unwrap_or_default(),
            Column::MobileFriendly => record
                .mobile_friendly
                .map(|b| b.to_string())
                .unwrap_or_default(),
            Column::ErrorMessage => record.error_message.clone().unwrap_or_default(),
        }
    }
}

impl ReportSection {
    fn columns(&self) -> &'static [Column] {
        match self {
            ReportSection::All => &[
                Column::Url,
                Column::Status,
                Column::PerformanceScore,
                Column::SeoScore,
                Column::MobileFriendly,
                Column::ErrorMessage,
            ],
            ReportSection::Performance => &[
                Column::Url,
                Column::Status,
                Column::PerformanceScore,
                Column::ErrorMessage,
            ],
            ReportSection::Seo => &[
                Column::Url,
                Column::Status,
                Column::SeoScore,
                Column::ErrorMessage,
            ],
            ReportSection::Mobile => &[
                Column::Url,
                Column::Status,
                Column::MobileFriendly,
                Column::ErrorMessage,
            ],
        }
    }
}

// JSON report layout; carries enough to rebuild the project's results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub project_id: String,
    pub phase: Phase,
    pub records: Vec<MetricRecord>,
    pub aggregate: AggregateSummary,
}

/// Full CSV report. Columns are always
/// `url,status,performance_score,seo_score,mobile_friendly,error_message`
/// and rows are sorted by url, so equal projects give byte-equal output.
pub fn export_csv(state: &ProjectState) -> Vec<u8> {
    export_csv_section(state, ReportSection::All)
}

pub fn export_csv_section(state: &ProjectState, section: ReportSection) -> Vec<u8> {
    let columns = section.columns();
    let mut out = String::new();

    let header: Vec<&str> = columns.iter().map(Column::header).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for record in state.get_records() {
        let row: Vec<String> = columns
            .iter()
            .map(|column| escape_csv_field(&column.value(record)))
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out.into_bytes()
}

pub fn json_report(state: &ProjectState) -> JsonReport {
    JsonReport {
        project_id: state.project_id().to_string(),
        phase: state.phase(),
        records: state.get_records().into_iter().cloned().collect(),
        aggregate: state.get_aggregate(),
    }
}

pub fn export_json(state: &ProjectState) -> Vec<u8> {
    // Plain structs with string keys written to memory; this cannot fail.
    serde_json::to_vec_pretty(&json_report(state)).unwrap_or_default()
}

pub fn parse_json_report(bytes: &[u8]) -> Result<JsonReport, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn export(state: &ProjectState, format: ReportFormat, section: ReportSection) -> Vec<u8> {
    match format {
        ReportFormat::Csv => export_csv_section(state, section),
        ReportFormat::Json => export_json(state),
    }
}

fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
