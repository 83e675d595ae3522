use crate::error::SnapshotRejectedError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// What the external job runner says about its own progress
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PhaseHint {
    #[serde(alias = "pending")]
    Queued,
    #[serde(alias = "processing", alias = "started")]
    Running,
    #[serde(alias = "complete", alias = "success", alias = "succeeded")]
    Completed,
    #[serde(alias = "error", alias = "fault")]
    Failed,
}

/// One status update delivered by the job runner.
///
/// Records stay as raw JSON here; they are normalized one by one when the
/// snapshot is applied so a single bad record cannot sink the batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    #[serde(alias = "phaseHint", alias = "status")]
    pub phase_hint: PhaseHint,
    #[serde(alias = "totalUrls")]
    pub total_urls: u64,
    #[serde(default, alias = "newOrUpdatedRecords", alias = "records")]
    pub new_or_updated_records: Vec<Value>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "processingStatus", alias = "processing_status", skip_serializing)]
    processing_status: Option<ProcessingStatus>,
}

// The backend status endpoint nests stage and progress
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
struct ProcessingStatus {
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
}

impl Snapshot {
    pub fn from_value(value: Value) -> Result<Self, SnapshotRejectedError> {
        if !value.is_object() {
            return Err(SnapshotRejectedError::NotAnObject);
        }
        let mut snapshot: Snapshot = serde_json::from_value(value)
            .map_err(|e| SnapshotRejectedError::Shape(e.to_string()))?;
        if let Some(nested) = snapshot.processing_status.take() {
            snapshot.stage = snapshot.stage.or(nested.stage);
            snapshot.progress = snapshot.progress.or(nested.progress);
        }
        Ok(snapshot)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SnapshotRejectedError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| SnapshotRejectedError::Unparseable(e.to_string()))?;
        Self::from_value(value)
    }
}
