use crate::error::RegistryError;
use crate::services::site_audit_service::registry::ProjectRegistry;
use anyhow::{Context, Result};
use chrono::Utc;
use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::IntervalStream;

/// HTTP client for the external job runner's status endpoint.
#[derive(Debug, Clone)]
pub struct RunnerClient {
    client: Client,
    base_url: String,
}

impl RunnerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn status_url(&self, job_id: &str) -> String {
        format!(
            "{}/migration-projects/{}/status",
            self.base_url.trim_end_matches('/'),
            job_id
        )
    }

    pub async fn fetch_snapshot(&self, job_id: &str) -> Result<Value> {
        let url = self.status_url(job_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach job runner at {}", url))?
            .error_for_status()
            .with_context(|| format!("Job runner returned an error for {}", url))?;

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Job runner sent an unreadable body from {}", url))
    }
}

/// Poll the runner for one project until the project is terminal or gone.
///
/// Failed fetches are only logged. If the runner stays unreachable the
/// staleness watchdog fails the project and this loop ends on the next tick.
pub async fn poll_project(
    registry: Arc<ProjectRegistry>,
    runner: RunnerClient,
    project_id: String,
    job_id: String,
    every: Duration,
) {
    let mut ticks = IntervalStream::new(tokio::time::interval(every));

    while ticks.next().await.is_some() {
        let active = match registry.get(&project_id).await {
            Some(project) => !project.read().await.phase().is_terminal(),
            None => false,
        };
        if !active {
            break;
        }

        let raw = match runner.fetch_snapshot(&job_id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("project {}: {:#}", project_id, e);
                continue;
            }
        };

        match registry.ingest(&project_id, raw, Utc::now()).await {
            Ok(outcome) if outcome.phase.is_terminal() => {
                info!("project {}: polling finished, phase {}", project_id, outcome.phase);
                break;
            }
            Ok(outcome) => debug!("project {}: phase {}", project_id, outcome.phase),
            Err(RegistryError::NotFound(_)) => break,
            Err(e) => warn!("project {}: {}", project_id, e),
        }
    }
}

pub fn spawn_poller(
    registry: Arc<ProjectRegistry>,
    runner: RunnerClient,
    project_id: String,
    job_id: String,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(poll_project(registry, runner, project_id, job_id, every))
}

/// Periodically fail projects that stopped receiving snapshots.
pub async fn run_staleness_watchdog(registry: Arc<ProjectRegistry>, every: Duration) {
    let mut ticks = IntervalStream::new(tokio::time::interval(every));
    while ticks.next().await.is_some() {
        let failed = registry.sweep_stale(Utc::now()).await;
        if !failed.is_empty() {
            info!("staleness timeout failed {} project(s): {:?}", failed.len(), failed);
        }
    }
}

pub fn spawn_staleness_watchdog(registry: Arc<ProjectRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(run_staleness_watchdog(registry, every))
}
