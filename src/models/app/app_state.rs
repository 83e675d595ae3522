use crate::services::{ProjectRegistry, RunnerClient};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProjectRegistry>,
    pub runner: Option<RunnerClient>,
    pub poll_interval: Duration,
}
