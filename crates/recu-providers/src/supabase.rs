//! Supabase-backed persistence: job rows over PostgREST, files over the
//! storage API. One client implements both pipeline storage traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use recu_core::error::StorageError;
use recu_core::models::config::StorageConfig;
use recu_core::models::job::{Artifacts, JobRecord, JobStatus, JobTrace};
use recu_core::models::receipt::Receipt;
use recu_core::pipeline::{JobStore, ObjectStore};
use serde_json::json;
use tracing::debug;

/// Columns the jobs table must expose for every lifecycle transition to
/// persist. Checked once at startup by `ensure_schema`.
const REQUIRED_COLUMNS: &[&str] = &[
    "job_id",
    "status",
    "file_url",
    "csv_url",
    "pdf_url",
    "error_code",
    "error",
    "receipt",
    "trace",
    "created_at",
];

pub struct SupabaseStore {
    base_url: String,
    service_key: String,
    jobs_table: String,
    http: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(
        base_url: &str,
        service_key: &str,
        config: &StorageConfig,
    ) -> Result<Self, StorageError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StorageError::Request("storage URL is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(Self {
            base_url,
            service_key: service_key.to_string(),
            jobs_table: config.jobs_table.clone(),
            http,
        })
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.jobs_table)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn patch_row(
        &self,
        job_id: &str,
        body: serde_json::Value,
    ) -> Result<(), StorageError> {
        let response = self
            .authed(self.http.patch(self.rest_url()))
            .query(&[("job_id", format!("eq.{job_id}"))])
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        expect_success(response).await?;
        Ok(())
    }
}

async fn expect_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl JobStore for SupabaseStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        let response = self
            .authed(self.http.get(self.rest_url()))
            .query(&[("select", REQUIRED_COLUMNS.join(",")), ("limit", "1".to_string())])
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Schema(format!(
                "jobs table '{}' rejected required columns ({status}): {body}",
                self.jobs_table
            )));
        }
        debug!(table = %self.jobs_table, "schema verified");
        Ok(())
    }

    async fn create(&self, job_id: &str, file_url: &str) -> Result<(), StorageError> {
        let response = self
            .authed(self.http.post(self.rest_url()))
            .header("Prefer", "return=minimal")
            .json(&json!({
                "job_id": job_id,
                "file_url": file_url,
                "status": JobStatus::Pending.as_str(),
                "created_at": Utc::now().to_rfc3339(),
            }))
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        expect_success(response).await?;
        Ok(())
    }

    async fn set_status(&self, job_id: &str, status: JobStatus) -> Result<(), StorageError> {
        self.patch_row(job_id, json!({ "status": status.as_str() }))
            .await
    }

    async fn mark_ready(
        &self,
        job_id: &str,
        receipt: &Receipt,
        artifacts: &Artifacts,
        trace: &JobTrace,
    ) -> Result<(), StorageError> {
        self.patch_row(
            job_id,
            json!({
                "status": JobStatus::Ready.as_str(),
                "csv_url": artifacts.csv_url,
                "pdf_url": artifacts.pdf_url,
                "receipt": receipt,
                "trace": trace,
            }),
        )
        .await
    }

    async fn mark_failed(
        &self,
        job_id: &str,
        code: &str,
        message: &str,
        trace: &JobTrace,
    ) -> Result<(), StorageError> {
        self.patch_row(
            job_id,
            json!({
                "status": JobStatus::Failed.as_str(),
                "error_code": code,
                "error": message,
                "trace": trace,
            }),
        )
        .await
    }

    async fn fetch(&self, job_id: &str) -> Result<JobRecord, StorageError> {
        let response = self
            .authed(self.http.get(self.rest_url()))
            .query(&[
                ("job_id", format!("eq.{job_id}")),
                ("select", "*".to_string()),
            ])
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        let response = expect_success(response).await?;

        let rows: Vec<JobRecord> = response
            .json()
            .await
            .map_err(|e| StorageError::Request(format!("invalid job row: {e}")))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound(job_id.to_string()))
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let response = self
            .authed(self.http.post(self.object_url(bucket, path)))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        expect_success(response).await?;

        Ok(self.public_url(bucket, path))
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .authed(self.http.get(self.object_url(bucket, path)))
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        let response = expect_success(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
