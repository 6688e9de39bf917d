//! Hosted OCR with a submit-then-poll flow, plus PDF-aware routing.

use std::time::Duration;

use async_trait::async_trait;
use recu_core::error::OcrError;
use recu_core::models::config::{OcrConfig, PdfConfig};
use recu_core::pdf::{PdfKind, PdfScan};
use recu_core::pipeline::OcrProvider;
use serde_json::Value;
use tracing::{debug, warn};

/// Client for a Document Intelligence style read API: submit the bytes,
/// follow the `Operation-Location` header, poll until the analysis settles.
pub struct RemoteOcr {
    endpoint: String,
    api_key: String,
    config: OcrConfig,
    http: reqwest::Client,
}

impl RemoteOcr {
    pub fn new(endpoint: &str, api_key: &str, config: OcrConfig) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OcrError::Request(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            config,
            http,
        })
    }

    async fn submit(&self, data: &[u8], mime: &str) -> Result<String, OcrError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", mime)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| OcrError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Provider(format!(
                "analyze rejected ({status}): {body}"
            )));
        }

        response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .ok_or_else(|| OcrError::Provider("no Operation-Location in response".to_string()))
    }

    async fn poll(&self, result_url: &str) -> Result<String, OcrError> {
        for _ in 0..self.config.poll_attempts {
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;

            let response = self
                .http
                .get(result_url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .send()
                .await
                .map_err(|e| OcrError::Request(e.to_string()))?;
            let result: Value = response
                .json()
                .await
                .map_err(|e| OcrError::Provider(format!("invalid poll response: {e}")))?;

            match result.get("status").and_then(|s| s.as_str()).unwrap_or("") {
                "succeeded" => return Ok(read_text(&result)),
                "failed" => {
                    let message = result
                        .get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                        .unwrap_or("unknown analysis error");
                    return Err(OcrError::Provider(message.to_string()));
                }
                _ => {}
            }
        }
        Err(OcrError::Request("recognition timed out".to_string()))
    }
}

#[async_trait]
impl OcrProvider for RemoteOcr {
    async fn recognize(&self, data: &[u8], mime: &str) -> Result<String, OcrError> {
        let result_url = self.submit(data, mime).await?;
        debug!(bytes = data.len(), mime, "analysis submitted");
        self.poll(&result_url).await
    }
}

/// Pull the recognized text out of a completed analysis.
///
/// Prefers the flat `content` field; reconstructs it from per-page lines
/// when the provider omits it.
fn read_text(result: &Value) -> String {
    let analyze = result.get("analyzeResult").unwrap_or(&Value::Null);

    if let Some(content) = analyze.get("content").and_then(|c| c.as_str()) {
        if !content.trim().is_empty() {
            return content.to_string();
        }
    }

    let mut lines = Vec::new();
    if let Some(pages) = analyze.get("pages").and_then(|p| p.as_array()) {
        for page in pages {
            if let Some(page_lines) = page.get("lines").and_then(|l| l.as_array()) {
                for line in page_lines {
                    if let Some(text) = line.get("content").and_then(|c| c.as_str()) {
                        lines.push(text.to_string());
                    }
                }
            }
        }
    }
    lines.join("\n")
}

/// OCR front door that understands PDFs.
///
/// Pages carrying enough embedded text are used as-is; everything else is
/// rendered to an image and sent to the remote reader page by page.
pub struct DocumentOcr {
    remote: RemoteOcr,
    pdf: PdfConfig,
}

impl DocumentOcr {
    pub fn new(remote: RemoteOcr, pdf: PdfConfig) -> Self {
        Self { remote, pdf }
    }

    async fn recognize_pdf(&self, data: &[u8]) -> Result<String, OcrError> {
        let scan = PdfScan::load(data)?;
        let kind = scan.kind();
        let page_count = scan.page_count();
        debug!(?kind, pages = page_count, "loaded pdf");

        if kind == PdfKind::Empty {
            return Ok(String::new());
        }

        let limit = if self.pdf.max_pages == 0 {
            page_count
        } else {
            page_count.min(self.pdf.max_pages as u32)
        };

        let mut parts = Vec::new();
        for page in 1..=limit {
            if self.pdf.prefer_embedded_text {
                let embedded = scan.page_text(page)?;
                let chars = embedded.chars().count();
                if chars >= self.pdf.min_text_length {
                    debug!(page, chars, "using embedded page text");
                    parts.push(embedded);
                    continue;
                }
            }
            match scan.page_image(page)? {
                Some(png) => parts.push(self.remote.recognize(&png, "image/png").await?),
                None => warn!(page, "page has no extractable image, skipping"),
            }
        }
        Ok(parts.join("\n\n"))
    }
}

#[async_trait]
impl OcrProvider for DocumentOcr {
    async fn recognize(&self, data: &[u8], mime: &str) -> Result<String, OcrError> {
        if mime == "application/pdf" {
            self.recognize_pdf(data).await
        } else {
            self.remote.recognize(data, mime).await
        }
    }
}
