//! Error types for the recu library

use thiserror::Error;

/// Main error type for recu operations
#[derive(Error, Debug)]
pub enum RecuError {
    /// OCR provider errors
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// LLM field-extraction errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Persistence and object-store errors
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Artifact rendering errors
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// No usable total amount after normalization and fallback extraction
    #[error("no usable total amount found in document")]
    NoAmount,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl RecuError {
    /// Stable machine-readable code recorded against failed jobs.
    pub fn code(&self) -> &'static str {
        match self {
            RecuError::Ocr(OcrError::EmptyText { .. }) => "OCR_EMPTY",
            RecuError::Ocr(_) => "OCR_ERROR",
            RecuError::Llm(LlmError::Schema(_)) => "LLM_SCHEMA_ERROR",
            RecuError::Llm(_) => "LLM_ERROR",
            RecuError::NoAmount => "AMOUNT_PARSE_FAIL",
            RecuError::Storage(_) => "STORAGE_ERROR",
            RecuError::Export(_) => "EXPORT_ERROR",
            RecuError::Io(_) => "IO_ERROR",
            RecuError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// OCR-specific errors
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("recognized text too short ({len} chars)")]
    EmptyText { len: usize },

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider rejected document: {0}")]
    Provider(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),
}

/// LLM-specific errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("response did not match the expected schema: {0}")]
    Schema(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Persistence and object-store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("persistence schema mismatch: {0}")]
    Schema(String),

    #[error("job not found: {0}")]
    NotFound(String),
}

/// Artifact rendering errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV rendering failed: {0}")]
    Csv(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

/// PDF-specific errors
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF is encrypted")]
    Encrypted,

    #[error("PDF has no pages")]
    NoPages,

    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    #[error("text extraction failed: {0}")]
    Text(String),

    #[error("image extraction failed: {0}")]
    Image(String),
}

/// Result type alias for recu operations
pub type Result<T> = std::result::Result<T, RecuError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(RecuError::Ocr(OcrError::EmptyText { len: 5 }).code(), "OCR_EMPTY");
        assert_eq!(
            RecuError::Llm(LlmError::Schema("bad field".into())).code(),
            "LLM_SCHEMA_ERROR"
        );
        assert_eq!(RecuError::NoAmount.code(), "AMOUNT_PARSE_FAIL");
        assert_eq!(
            RecuError::Storage(StorageError::Request("timeout".into())).code(),
            "STORAGE_ERROR"
        );
    }

    #[test]
    fn test_nested_errors_convert() {
        let err: RecuError = OcrError::Request("connection refused".into()).into();
        assert_eq!(err.code(), "OCR_ERROR");

        // PDF failures surface through the OCR step that triggered them.
        let err: RecuError = OcrError::from(PdfError::NoPages).into();
        match err {
            RecuError::Ocr(OcrError::Pdf(PdfError::NoPages)) => {}
            other => panic!("unexpected conversion: {other:?}"),
        }
    }
}
