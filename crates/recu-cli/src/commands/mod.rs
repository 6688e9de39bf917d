//! Command implementations and shared wiring.

pub mod batch;
pub mod config;
pub mod process;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use recu_core::models::config::RecuConfig;
use recu_core::pipeline::{JobStore, Pipeline};
use recu_providers::{DocumentOcr, OpenAiExtractor, RemoteOcr, SupabaseStore};

/// Load configuration from an explicit path, or fall back to defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RecuConfig> {
    match config_path {
        Some(path) => RecuConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to load config from {path}")),
        None => Ok(RecuConfig::default()),
    }
}

fn env_var(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} not set"))
}

/// Store-only client for read paths that never submit work.
pub fn build_store(config: &RecuConfig) -> anyhow::Result<Arc<SupabaseStore>> {
    let supabase_url = env_var("SUPABASE_URL")?;
    let supabase_key = env_var("SUPABASE_SERVICE_KEY")?;
    Ok(Arc::new(SupabaseStore::new(
        &supabase_url,
        &supabase_key,
        &config.storage,
    )?))
}

/// Wire the full pipeline from configuration and environment credentials.
///
/// Verifies the jobs table schema before returning, so a misconfigured
/// deployment fails here rather than mid-job.
pub async fn build_pipeline(
    config: &RecuConfig,
) -> anyhow::Result<(Arc<Pipeline>, Arc<SupabaseStore>)> {
    let ocr_endpoint = env_var("OCR_ENDPOINT")?;
    let ocr_key = env_var("OCR_API_KEY")?;
    let openai_key = env_var("OPENAI_API_KEY")?;

    let store = build_store(config)?;
    store.ensure_schema().await?;

    let remote = RemoteOcr::new(&ocr_endpoint, &ocr_key, config.ocr.clone())?;
    let ocr = Arc::new(DocumentOcr::new(remote, config.pdf.clone()));
    let llm = Arc::new(OpenAiExtractor::new(config.llm.clone(), &openai_key));

    let pipeline = Arc::new(Pipeline::new(
        ocr,
        llm,
        store.clone(),
        store.clone(),
        config.clone(),
    ));

    Ok((pipeline, store))
}
