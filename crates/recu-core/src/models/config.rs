//! Configuration types for the ingestion pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for recu processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecuConfig {
    /// OCR provider configuration
    pub ocr: OcrConfig,
    /// PDF handling configuration
    pub pdf: PdfConfig,
    /// LLM field-extraction configuration
    pub llm: LlmConfig,
    /// Persistence and object-store configuration
    pub storage: StorageConfig,
    /// Normalization configuration
    pub extraction: ExtractionConfig,
}

impl Default for RecuConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            pdf: PdfConfig::default(),
            llm: LlmConfig::default(),
            storage: StorageConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

/// OCR provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Minimum recognized characters for a document to count as readable
    pub min_text_length: usize,
    /// Delay between result polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Maximum number of result polls before giving up
    pub poll_attempts: u32,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            min_text_length: 10,
            poll_interval_ms: 1000,
            poll_attempts: 60,
            request_timeout_secs: 60,
        }
    }
}

/// PDF handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Use embedded text when a page carries enough of it
    pub prefer_embedded_text: bool,
    /// Minimum characters of embedded text before a page skips image OCR
    pub min_text_length: usize,
    /// Maximum pages to process per document (0 = no limit)
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            prefer_embedded_text: true,
            min_text_length: 50,
            max_pages: 10,
        }
    }
}

/// LLM field-extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat-completions endpoint
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
        }
    }
}

/// Persistence and object-store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Jobs table name
    pub jobs_table: String,
    /// Bucket for uploaded source files
    pub raw_bucket: String,
    /// Bucket for rendered PDF summaries
    pub pdf_bucket: String,
    /// Bucket for tabular exports
    pub export_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            jobs_table: "jobs_processing".to_string(),
            raw_bucket: "receipts_raw".to_string(),
            pdf_bucket: "receipts_pdf".to_string(),
            export_bucket: "receipts_export".to_string(),
        }
    }
}

/// Normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Currency assumed when the document names none
    pub default_currency: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_currency: "EUR".to_string(),
        }
    }
}

impl RecuConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
