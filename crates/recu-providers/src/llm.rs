//! Receipt field extraction over an OpenAI-compatible chat-completions API.

use async_trait::async_trait;
use recu_core::error::LlmError;
use recu_core::models::config::LlmConfig;
use recu_core::models::receipt::RawFields;
use recu_core::pipeline::FieldExtractor;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that extracts data from receipts and returns JSON.";

/// Field extractor backed by a chat-completions endpoint with JSON mode.
pub struct OpenAiExtractor {
    config: LlmConfig,
    api_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiExtractor {
    pub fn new(config: LlmConfig, api_key: &str) -> Self {
        Self {
            config,
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FieldExtractor for OpenAiExtractor {
    async fn extract(&self, text: &str) -> Result<RawFields, LlmError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(text) },
            ],
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Request(format!(
                "completion failed ({status}): {body}"
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| LlmError::Schema(format!("invalid completion envelope: {e}")))?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| LlmError::Schema("completion has no choices".to_string()))?;

        debug!(chars = content.len(), "completion received");
        fields_from_content(content)
    }
}

/// Parse the model's JSON reply into raw receipt fields.
fn fields_from_content(content: &str) -> Result<RawFields, LlmError> {
    serde_json::from_str(content).map_err(|e| LlmError::Schema(e.to_string()))
}

fn build_prompt(text: &str) -> String {
    format!(
        r#"Extract the following fields from this receipt text.

OCR TEXT:
"""
{text}
"""

INSTRUCTIONS:
1. merchant: the business name, ignoring generic headers such as FACTURE, TICKET or RECEIPT.
2. amount: the final amount paid, usually next to TOTAL, MONTANT or PAYE.
3. date: the purchase date in YYYY-MM-DD format.
4. vat_amount: the VAT amount if shown.
5. currency: the ISO currency code, e.g. EUR.
6. category: one of Restaurant, Transport, Accommodation, Groceries, Utilities, Other.
7. category_confidence: your confidence in the category, 0 to 1.
8. items: line items with description and amount where readable.
9. document_type: invoice, receipt or other.
10. confidence: your overall confidence in the extraction, 0 to 1.

OUTPUT FORMAT (JSON object, omit fields you cannot read):
{{
  "merchant": "...",
  "date": "YYYY-MM-DD",
  "amount": 0.0,
  "currency": "EUR",
  "vat_amount": 0.0,
  "category": "Restaurant",
  "category_confidence": 0.0,
  "items": [{{ "description": "...", "amount": 0.0, "vat": 0.0 }}],
  "document_type": "receipt",
  "confidence": 0.0
}}"#
    )
}
