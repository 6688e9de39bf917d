//! Hosted provider implementations for the recu pipeline.
//!
//! This crate provides:
//! - `RemoteOcr` / `DocumentOcr`: submit-and-poll text recognition with
//!   PDF-aware page routing
//! - `OpenAiExtractor`: receipt field extraction over chat completions
//! - `SupabaseStore`: job rows and object storage behind one client

pub mod llm;
pub mod ocr;
pub mod supabase;

pub use llm::OpenAiExtractor;
pub use ocr::{DocumentOcr, RemoteOcr};
pub use supabase::SupabaseStore;
