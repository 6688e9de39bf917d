//! Data models for receipts, jobs, and configuration.

pub mod config;
pub mod job;
pub mod receipt;

pub use config::RecuConfig;
pub use job::{Artifacts, JobOutcome, JobRecord, JobStatus, JobTrace, StageLog};
pub use receipt::{
    Category, DocumentType, RawAmount, RawFields, RawItem, Receipt, ReceiptItem,
};
