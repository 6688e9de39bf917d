//! Extraction pipeline: one document in, one terminal job state out.
//!
//! Collaborators (OCR, LLM, job store, object store) are injected as trait
//! objects; the pipeline owns the job state machine and the normalization
//! steps between the provider calls. Each submitted document runs as an
//! independent tokio task with no shared mutable state.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{LlmError, OcrError, RecuError, StorageError};
use crate::models::config::RecuConfig;
use crate::models::job::{Artifacts, JobOutcome, JobRecord, JobStatus, JobTrace};
use crate::models::receipt::{RawFields, Receipt, ReceiptItem};
use crate::normalize::{extract_amount_from_text, normalize_date, parse_amount};
use crate::render;

/// Recognizes text in an uploaded document.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn recognize(&self, data: &[u8], mime: &str) -> Result<String, OcrError>;
}

/// Extracts structured receipt fields from recognized text.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<RawFields, LlmError>;
}

/// Persists job rows through their lifecycle.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Verify the persisted schema matches this build. Called once at
    /// startup, before any job is accepted.
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// Insert a new job row in `pending` state.
    async fn create(&self, job_id: &str, file_url: &str) -> Result<(), StorageError>;

    async fn set_status(&self, job_id: &str, status: JobStatus) -> Result<(), StorageError>;

    /// Record the terminal `ready` state with the receipt, artifact URLs
    /// and the stage trace.
    async fn mark_ready(
        &self,
        job_id: &str,
        receipt: &Receipt,
        artifacts: &Artifacts,
        trace: &JobTrace,
    ) -> Result<(), StorageError>;

    /// Record the terminal `failed` state with a stable code and message.
    async fn mark_failed(
        &self,
        job_id: &str,
        code: &str,
        message: &str,
        trace: &JobTrace,
    ) -> Result<(), StorageError>;

    async fn fetch(&self, job_id: &str) -> Result<JobRecord, StorageError>;
}

/// Stores raw uploads and rendered artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload bytes and return their public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Handle returned by [`Pipeline::submit`].
pub struct Submission {
    pub job_id: String,
    pub handle: JoinHandle<Result<JobOutcome, RecuError>>,
}

/// Drives one document through OCR, field extraction, normalization,
/// artifact rendering, and persistence.
pub struct Pipeline {
    ocr: Arc<dyn OcrProvider>,
    llm: Arc<dyn FieldExtractor>,
    jobs: Arc<dyn JobStore>,
    store: Arc<dyn ObjectStore>,
    config: RecuConfig,
}

impl Pipeline {
    pub fn new(
        ocr: Arc<dyn OcrProvider>,
        llm: Arc<dyn FieldExtractor>,
        jobs: Arc<dyn JobStore>,
        store: Arc<dyn ObjectStore>,
        config: RecuConfig,
    ) -> Self {
        Self {
            ocr,
            llm,
            jobs,
            store,
            config,
        }
    }

    /// Accept a document: upload the raw bytes, create the pending job row,
    /// and spawn the processing unit. Returns as soon as the job exists;
    /// the caller may await the handle or poll the store.
    pub async fn submit(
        self: Arc<Self>,
        data: Vec<u8>,
        file_name: &str,
    ) -> Result<Submission, RecuError> {
        let job_id = Uuid::new_v4().to_string();
        let extension = extension_of(file_name);
        let mime = mime_for_extension(&extension);

        info!(job_id = %job_id, file = file_name, bytes = data.len(), "job submitted");

        let raw_path = format!("{job_id}/raw.{extension}");
        let file_url = self
            .store
            .upload(&self.config.storage.raw_bucket, &raw_path, data.clone(), mime)
            .await?;
        self.jobs.create(&job_id, &file_url).await?;

        let task_job_id = job_id.clone();
        let handle =
            tokio::spawn(async move { self.run(&task_job_id, &data, mime).await });

        Ok(Submission { job_id, handle })
    }

    /// Run one processing unit to its terminal state.
    ///
    /// A failure is recorded against the job before being returned; the
    /// recording itself is best-effort and never panics the task.
    pub async fn run(
        &self,
        job_id: &str,
        data: &[u8],
        mime: &str,
    ) -> Result<JobOutcome, RecuError> {
        let mut trace = JobTrace::new();
        match self.process(job_id, data, mime, &mut trace).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(job_id = %job_id, code = err.code(), error = %err, "job failed");
                if let Err(record_err) = self
                    .jobs
                    .mark_failed(job_id, err.code(), &err.to_string(), &trace)
                    .await
                {
                    warn!(job_id = %job_id, error = %record_err, "could not record job failure");
                }
                Err(err)
            }
        }
    }

    async fn process(
        &self,
        job_id: &str,
        data: &[u8],
        mime: &str,
        trace: &mut JobTrace,
    ) -> Result<JobOutcome, RecuError> {
        let start = Instant::now();
        trace.record("received", json!({ "bytes": data.len(), "mime": mime }));

        self.jobs.set_status(job_id, JobStatus::Processing).await?;

        let text = self.ocr.recognize(data, mime).await?;
        let chars = text.chars().count();
        debug!(job_id = %job_id, chars, preview = %preview(&text, 100), "ocr complete");
        trace.record("ocr", json!({ "chars": chars, "preview": preview(&text, 100) }));

        if chars < self.config.ocr.min_text_length {
            return Err(OcrError::EmptyText { len: chars }.into());
        }

        let raw = self.llm.extract(&text).await?;
        trace.record(
            "llm",
            json!({
                "merchant": raw.merchant,
                "date": raw.date,
                "amount": raw.amount,
                "confidence": raw.confidence,
            }),
        );

        let (amount, amount_source) = match parse_amount(raw.amount.as_ref()) {
            Some(value) => (Some(value), "llm"),
            None => (extract_amount_from_text(&text), "fallback"),
        };
        let date = normalize_date(raw.date.as_deref());
        trace.record(
            "normalize",
            json!({
                "amount": amount,
                "amount_source": amount_source,
                "date": date,
            }),
        );

        let Some(amount) = amount else {
            return Err(RecuError::NoAmount);
        };

        let receipt = self.build_receipt(&raw, amount, date);
        info!(
            job_id = %job_id,
            merchant = %receipt.merchant,
            amount = receipt.amount,
            currency = %receipt.currency,
            "fields extracted"
        );

        let artifacts = self.render_artifacts(job_id, &receipt, trace).await?;

        self.jobs
            .mark_ready(job_id, &receipt, &artifacts, trace)
            .await?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(job_id = %job_id, elapsed_ms = processing_time_ms, "job ready");

        Ok(JobOutcome {
            job_id: job_id.to_string(),
            receipt,
            artifacts,
            processing_time_ms,
        })
    }

    async fn render_artifacts(
        &self,
        job_id: &str,
        receipt: &Receipt,
        trace: &mut JobTrace,
    ) -> Result<Artifacts, RecuError> {
        let csv_bytes = render::receipt_to_csv(receipt)?;
        let pdf_bytes = render::receipt_to_pdf(receipt)?;

        let csv_url = self
            .store
            .upload(
                &self.config.storage.export_bucket,
                &format!("{job_id}/receipt.csv"),
                csv_bytes,
                "text/csv",
            )
            .await?;
        let pdf_url = self
            .store
            .upload(
                &self.config.storage.pdf_bucket,
                &format!("{job_id}/receipt.pdf"),
                pdf_bytes,
                "application/pdf",
            )
            .await?;

        trace.record("artifacts", json!({ "csv_url": csv_url, "pdf_url": pdf_url }));
        Ok(Artifacts { csv_url, pdf_url })
    }

    fn build_receipt(&self, raw: &RawFields, amount: f64, date: Option<String>) -> Receipt {
        let items = raw
            .items
            .iter()
            .map(|item| ReceiptItem {
                description: item.description.clone(),
                amount: parse_amount(item.amount.as_ref()).unwrap_or(0.0),
                vat: parse_amount(item.vat.as_ref()).unwrap_or(0.0),
            })
            .collect();

        Receipt {
            merchant: raw
                .merchant
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            date,
            amount,
            currency: raw
                .currency
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| self.config.extraction.default_currency.clone()),
            vat_amount: parse_amount(raw.vat_amount.as_ref()),
            category: raw.category,
            category_confidence: raw.category_confidence,
            items,
            document_type: raw.document_type,
            confidence: raw.confidence,
        }
    }
}

/// Guess the MIME type for a file extension.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
        .to_lowercase()
}

fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::RawAmount;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedOcr {
        text: String,
    }

    #[async_trait]
    impl OcrProvider for FixedOcr {
        async fn recognize(&self, _data: &[u8], _mime: &str) -> Result<String, OcrError> {
            Ok(self.text.clone())
        }
    }

    struct FixedLlm {
        fields: RawFields,
        calls: AtomicUsize,
    }

    impl FixedLlm {
        fn new(fields: RawFields) -> Self {
            Self {
                fields,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FieldExtractor for FixedLlm {
        async fn extract(&self, _text: &str) -> Result<RawFields, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.fields.clone())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl FieldExtractor for FailingLlm {
        async fn extract(&self, _text: &str) -> Result<RawFields, LlmError> {
            Err(LlmError::Schema("merchant: expected string".into()))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        statuses: Mutex<Vec<String>>,
        uploads: Mutex<Vec<String>>,
        ready: Mutex<Option<(Receipt, Artifacts, usize)>>,
        failed: Mutex<Option<(String, String)>>,
        fail_mark_ready: bool,
        fail_mark_failed: bool,
    }

    #[async_trait]
    impl JobStore for RecordingStore {
        async fn ensure_schema(&self) -> Result<(), StorageError> {
            Ok(())
        }

        async fn create(&self, _job_id: &str, _file_url: &str) -> Result<(), StorageError> {
            self.statuses.lock().unwrap().push("pending".into());
            Ok(())
        }

        async fn set_status(
            &self,
            _job_id: &str,
            status: JobStatus,
        ) -> Result<(), StorageError> {
            self.statuses.lock().unwrap().push(status.to_string());
            Ok(())
        }

        async fn mark_ready(
            &self,
            _job_id: &str,
            receipt: &Receipt,
            artifacts: &Artifacts,
            trace: &JobTrace,
        ) -> Result<(), StorageError> {
            if self.fail_mark_ready {
                return Err(StorageError::Request("connection reset".into()));
            }
            self.statuses.lock().unwrap().push("ready".into());
            *self.ready.lock().unwrap() =
                Some((receipt.clone(), artifacts.clone(), trace.entries.len()));
            Ok(())
        }

        async fn mark_failed(
            &self,
            _job_id: &str,
            code: &str,
            message: &str,
            _trace: &JobTrace,
        ) -> Result<(), StorageError> {
            if self.fail_mark_failed {
                return Err(StorageError::Request("connection reset".into()));
            }
            self.statuses.lock().unwrap().push("failed".into());
            *self.failed.lock().unwrap() = Some((code.to_string(), message.to_string()));
            Ok(())
        }

        async fn fetch(&self, job_id: &str) -> Result<JobRecord, StorageError> {
            Err(StorageError::NotFound(job_id.to_string()))
        }
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn upload(
            &self,
            bucket: &str,
            path: &str,
            _data: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, StorageError> {
            let url = format!("https://store.test/{bucket}/{path}");
            self.uploads.lock().unwrap().push(url.clone());
            Ok(url)
        }

        async fn download(&self, _bucket: &str, _path: &str) -> Result<Vec<u8>, StorageError> {
            Ok(vec![])
        }
    }

    fn pipeline_with(
        ocr_text: &str,
        llm: Arc<dyn FieldExtractor>,
        store: Arc<RecordingStore>,
    ) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(
            Arc::new(FixedOcr {
                text: ocr_text.to_string(),
            }),
            llm,
            store.clone(),
            store,
            RecuConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_happy_path_reaches_ready() {
        let store = Arc::new(RecordingStore::default());
        let llm = Arc::new(FixedLlm::new(RawFields {
            merchant: Some("Cafe de la Gare".into()),
            date: Some("05/03/2024".into()),
            amount: Some(RawAmount::Text("1 234,56 €".into())),
            confidence: 0.9,
            ..Default::default()
        }));
        let pipeline = pipeline_with("Cafe de la Gare\nTotal TTC 1234,56", llm, store.clone());

        let submission = pipeline
            .submit(b"fake image bytes".to_vec(), "receipt.jpg")
            .await
            .unwrap();
        let outcome = submission.handle.await.unwrap().unwrap();

        assert_eq!(outcome.receipt.amount, 1234.56);
        assert_eq!(outcome.receipt.date.as_deref(), Some("2024-03-05"));
        assert_eq!(outcome.receipt.currency, "EUR");
        assert_eq!(outcome.job_id, submission.job_id);

        let statuses = store.statuses.lock().unwrap().clone();
        assert_eq!(statuses, vec!["pending", "processing", "ready"]);

        let uploads = store.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 3);
        assert!(uploads[0].contains("/receipts_raw/"));
        assert!(uploads[0].ends_with("/raw.jpg"));
        assert!(uploads[1].ends_with("/receipt.csv"));
        assert!(uploads[2].ends_with("/receipt.pdf"));

        let (receipt, artifacts, trace_len) = store.ready.lock().unwrap().clone().unwrap();
        assert_eq!(receipt.merchant, "Cafe de la Gare");
        assert!(artifacts.csv_url.contains("receipts_export"));
        assert!(trace_len >= 4);
    }

    #[tokio::test]
    async fn test_short_text_fails_before_llm() {
        let store = Arc::new(RecordingStore::default());
        let llm = Arc::new(FixedLlm::new(RawFields::default()));
        let pipeline = pipeline_with("12345", llm.clone(), store.clone());

        let submission = pipeline.submit(b"x".to_vec(), "scan.png").await.unwrap();
        let err = submission.handle.await.unwrap().unwrap_err();

        assert_eq!(err.code(), "OCR_EMPTY");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);

        let (code, message) = store.failed.lock().unwrap().clone().unwrap();
        assert_eq!(code, "OCR_EMPTY");
        assert!(message.contains('5'));

        let statuses = store.statuses.lock().unwrap().clone();
        assert_eq!(statuses, vec!["pending", "processing", "failed"]);
    }

    #[tokio::test]
    async fn test_no_amount_anywhere_fails() {
        let store = Arc::new(RecordingStore::default());
        let llm = Arc::new(FixedLlm::new(RawFields {
            amount: Some(RawAmount::Number(0.0)),
            ..Default::default()
        }));
        let pipeline = pipeline_with("thank you for shopping with us", llm, store.clone());

        let submission = pipeline.submit(b"x".to_vec(), "scan.pdf").await.unwrap();
        let err = submission.handle.await.unwrap().unwrap_err();

        assert_eq!(err.code(), "AMOUNT_PARSE_FAIL");
        let (code, _) = store.failed.lock().unwrap().clone().unwrap();
        assert_eq!(code, "AMOUNT_PARSE_FAIL");
    }

    #[tokio::test]
    async fn test_fallback_recovers_amount_from_text() {
        let store = Arc::new(RecordingStore::default());
        let llm = Arc::new(FixedLlm::new(RawFields::default()));
        let pipeline = pipeline_with(
            "Carrefour City\nTotal TTC: 45,20\nMerci de votre visite",
            llm,
            store.clone(),
        );

        let submission = pipeline.submit(b"x".to_vec(), "receipt.jpg").await.unwrap();
        let outcome = submission.handle.await.unwrap().unwrap();

        assert_eq!(outcome.receipt.amount, 45.20);
        assert_eq!(outcome.receipt.merchant, "Unknown");
        assert_eq!(outcome.receipt.date, None);
    }

    #[tokio::test]
    async fn test_schema_deviation_fails_llm_step() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline_with(
            "a perfectly readable receipt text",
            Arc::new(FailingLlm),
            store.clone(),
        );

        let submission = pipeline.submit(b"x".to_vec(), "receipt.jpg").await.unwrap();
        let err = submission.handle.await.unwrap().unwrap_err();

        assert_eq!(err.code(), "LLM_SCHEMA_ERROR");
        let (code, _) = store.failed.lock().unwrap().clone().unwrap();
        assert_eq!(code, "LLM_SCHEMA_ERROR");
    }

    #[tokio::test]
    async fn test_storage_failure_is_terminal_and_recording_guarded() {
        let store = Arc::new(RecordingStore {
            fail_mark_ready: true,
            fail_mark_failed: true,
            ..Default::default()
        });
        let llm = Arc::new(FixedLlm::new(RawFields {
            amount: Some(RawAmount::Number(12.5)),
            ..Default::default()
        }));
        let pipeline = pipeline_with("Total 12.50 thanks for visiting", llm, store.clone());

        let submission = pipeline.submit(b"x".to_vec(), "receipt.jpg").await.unwrap();
        let err = submission.handle.await.unwrap().unwrap_err();

        assert_eq!(err.code(), "STORAGE_ERROR");
        // the secondary recording failure was swallowed, not propagated
        assert!(store.failed.lock().unwrap().is_none());
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("jpg"), "image/jpeg");
        assert_eq!(mime_for_extension("PDF"), "application/pdf");
        assert_eq!(mime_for_extension("xyz"), "application/octet-stream");
    }

    #[test]
    fn test_extension_of_uploaded_names() {
        assert_eq!(extension_of("photo.JPG"), "jpg");
        assert_eq!(extension_of("archive.tar.pdf"), "pdf");
        assert_eq!(extension_of("no_extension"), "bin");
    }
}
