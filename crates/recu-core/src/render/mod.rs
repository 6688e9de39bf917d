//! Artifact rendering for ready jobs.

pub mod csv;
pub mod pdf;

pub use csv::receipt_to_csv;
pub use pdf::receipt_to_pdf;
