//! Core library for receipt ingestion.
//!
//! This crate provides:
//! - Amount and date normalization for noisy OCR and LLM output
//! - Keyword-driven amount recovery when extraction misses the total
//! - PDF handling (embedded text and page image extraction)
//! - CSV and PDF artifact rendering
//! - The extraction pipeline and its collaborator traits

pub mod error;
pub mod models;
pub mod normalize;
pub mod pdf;
pub mod pipeline;
pub mod render;

pub use error::{
    ExportError, LlmError, OcrError, PdfError, RecuError, Result, StorageError,
};
pub use models::config::RecuConfig;
pub use models::job::{Artifacts, JobOutcome, JobRecord, JobStatus, JobTrace, StageLog};
pub use models::receipt::{
    Category, DocumentType, RawAmount, RawFields, RawItem, Receipt, ReceiptItem,
};
pub use normalize::{extract_amount_from_text, normalize_date, parse_amount};
pub use pdf::{PdfKind, PdfScan};
pub use pipeline::{
    FieldExtractor, JobStore, ObjectStore, OcrProvider, Pipeline, Submission,
    mime_for_extension,
};
pub use render::{receipt_to_csv, receipt_to_pdf};
