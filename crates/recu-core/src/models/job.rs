//! Job lifecycle types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::receipt::Receipt;

/// Processing state of a submitted document.
///
/// Jobs move `pending -> processing -> ready` or `pending -> processing ->
/// failed`. Both final states are terminal; there are no retries and no
/// backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted job row as stored in and fetched from the jobs table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One recorded step of a processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLog {
    pub timestamp: DateTime<Utc>,
    pub stage: String,
    pub data: serde_json::Value,
}

/// Ordered per-stage record of one run, persisted with the job so a
/// document's path through the pipeline can be reconstructed afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobTrace {
    pub entries: Vec<StageLog>,
}

impl JobTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: &str, data: serde_json::Value) {
        self.entries.push(StageLog {
            timestamp: Utc::now(),
            stage: stage.to_string(),
            data,
        });
    }

    pub fn stages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.stage.as_str()).collect()
    }
}

/// URLs of the rendered artifacts for a ready job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    pub csv_url: String,
    pub pdf_url: String,
}

/// Result of one completed processing run.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub receipt: Receipt,
    pub artifacts: Artifacts,
    pub processing_time_ms: u64,
}
