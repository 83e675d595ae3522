use crate::api::error::ApiError;
use crate::error::{RegistryError, SnapshotRejectedError};
use crate::models::{
    AggregateSummary, AppState, CreateProjectRequest, FailureReason, Phase, ProjectState,
};
use crate::services::{spawn_poller, ProjectListing, SharedProject, SnapshotOutcome};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub project_id: String,
    pub phase: Phase,
    pub polling: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub project_id: String,
    pub project_name: String,
    pub description: Option<String>,
    pub old_base_url: Option<String>,
    pub new_base_url: Option<String>,
    pub phase: Phase,
    pub stage: Option<String>,
    pub progress: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub last_snapshot_at: DateTime<Utc>,
    pub failure: Option<FailureReason>,
    pub aggregate: AggregateSummary,
}

impl From<&ProjectState> for StatusResponse {
    fn from(state: &ProjectState) -> Self {
        let info = state.info();
        Self {
            project_id: state.project_id().to_string(),
            project_name: info.project_name.clone(),
            description: info.description.clone(),
            old_base_url: info.old_base_url.clone(),
            new_base_url: info.new_base_url.clone(),
            phase: state.phase(),
            stage: state.stage().map(str::to_string),
            progress: state.progress(),
            created_at: state.created_at(),
            last_snapshot_at: state.last_snapshot_at(),
            failure: state.failure().cloned(),
            aggregate: state.get_aggregate(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub project_id: String,
    pub phase: Phase,
}

pub(crate) async fn find_project(
    state: &AppState,
    project_id: &str,
) -> Result<SharedProject, ApiError> {
    state
        .registry
        .get(project_id)
        .await
        .ok_or_else(|| RegistryError::NotFound(project_id.to_string()).into())
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<CreateProjectResponse>), ApiError> {
    let info = request.info();
    if info.project_name.is_empty() {
        return Err(ApiError::BadRequest("project_name is required".to_string()));
    }

    let project_id = state.registry.create(info, Utc::now()).await;

    let polling = match (&state.runner, &request.runner_job_id) {
        (Some(runner), Some(job_id)) => {
            info!("project {}: polling runner job {}", project_id, job_id);
            spawn_poller(
                state.registry.clone(),
                runner.clone(),
                project_id.clone(),
                job_id.clone(),
                state.poll_interval,
            );
            true
        }
        _ => false,
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateProjectResponse {
            project_id,
            phase: Phase::Queued,
            polling,
        }),
    ))
}

pub async fn list_projects(State(state): State<AppState>) -> Json<Vec<ProjectListing>> {
    Json(state.registry.list().await)
}

pub async fn project_status(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let project = find_project(&state, &project_id).await?;
    let project = project.read().await;
    Ok(Json(StatusResponse::from(&*project)))
}

// Body is read raw so unparseable JSON is a rejected snapshot, not an extractor error
pub async fn push_snapshot(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> Result<Json<SnapshotOutcome>, ApiError> {
    let raw: Value = serde_json::from_slice(&body).map_err(|e| {
        RegistryError::SnapshotRejected(SnapshotRejectedError::Unparseable(e.to_string()))
    })?;
    let outcome = state.registry.ingest(&project_id, raw, Utc::now()).await?;
    Ok(Json(outcome))
}

pub async fn cancel_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let phase = state.registry.cancel(&project_id).await?;
    Ok(Json(CancelResponse { project_id, phase }))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.registry.remove(&project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
