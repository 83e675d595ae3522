use crate::api::error::ApiError;
use crate::api::handler::projects::find_project;
use crate::models::{AggregateSummary, AppState, AuditInsights, ExportParams, MetricRecord, Phase};
use crate::services::{compute_insights, export, ReportFormat, ReportSection};
use crate::utils::sanitize_filename;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub project_id: String,
    pub phase: Phase,
    pub aggregate: AggregateSummary,
    pub insights: AuditInsights,
    pub records: Vec<MetricRecord>,
}

pub async fn project_results(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let project = find_project(&state, &project_id).await?;
    let project = project.read().await;
    let records = project.get_records();

    Ok(Json(ResultsResponse {
        project_id: project.project_id().to_string(),
        phase: project.phase(),
        aggregate: project.get_aggregate(),
        insights: compute_insights(&records),
        records: records.into_iter().cloned().collect(),
    }))
}

pub async fn export_report(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let project = find_project(&state, &project_id).await?;
    let body = {
        let project = project.read().await;
        export(&project, params.format, params.section)
    };

    let (content_type, extension) = match params.format {
        ReportFormat::Csv => ("text/csv; charset=utf-8", "csv"),
        ReportFormat::Json => ("application/json", "json"),
    };
    let section = match params.section {
        ReportSection::All => "all",
        ReportSection::Performance => "performance",
        ReportSection::Seo => "seo",
        ReportSection::Mobile => "mobile",
    };
    let disposition = format!(
        "attachment; filename=\"{}-{}.{}\"",
        sanitize_filename(&project_id),
        section,
        extension
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
