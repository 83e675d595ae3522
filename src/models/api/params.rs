use crate::models::ProjectInfo;
use crate::services::{ReportFormat, ReportSection};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(alias = "projectName")]
    pub project_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "oldBaseUrl")]
    pub old_base_url: Option<String>,
    #[serde(default, alias = "newBaseUrl")]
    pub new_base_url: Option<String>,
    /// Job id on the external runner; enables polling when a runner is configured.
    #[serde(default, alias = "runnerJobId")]
    pub runner_job_id: Option<String>,
}

impl CreateProjectRequest {
    pub fn info(&self) -> ProjectInfo {
        ProjectInfo {
            project_name: self.project_name.trim().to_string(),
            description: self.description.clone(),
            old_base_url: self.old_base_url.clone(),
            new_base_url: self.new_base_url.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default)]
    pub section: ReportSection,
}
