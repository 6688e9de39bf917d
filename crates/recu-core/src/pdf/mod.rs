//! PDF handling: embedded text extraction and page-image recovery.

mod extractor;

pub use extractor::PdfScan;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Classification of a PDF's embedded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfKind {
    /// Searchable text, no page scans
    Text,
    /// Scanned pages only
    Image,
    /// Both embedded text and scans
    Hybrid,
    /// Neither text nor images
    Empty,
}
