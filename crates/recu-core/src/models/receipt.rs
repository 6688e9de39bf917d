//! Receipt data model and the raw LLM field contract

use serde::{Deserialize, Deserializer, Serialize};

/// Amount as returned by the LLM: either a bare number or a formatted string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

/// Expense category assigned by the LLM.
///
/// The label set is closed; anything outside it deserializes to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Category {
    Restaurant,
    Transport,
    Accommodation,
    Groceries,
    Utilities,
    #[default]
    Other,
}

impl Category {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "restaurant" => Category::Restaurant,
            "transport" => Category::Transport,
            "accommodation" => Category::Accommodation,
            "groceries" => Category::Groceries,
            "utilities" => Category::Utilities,
            _ => Category::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Restaurant => "Restaurant",
            Category::Transport => "Transport",
            Category::Accommodation => "Accommodation",
            Category::Groceries => "Groceries",
            Category::Utilities => "Utilities",
            Category::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Category::from_label(&label))
    }
}

/// Kind of source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Receipt,
    #[default]
    Other,
}

impl DocumentType {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "invoice" => DocumentType::Invoice,
            "receipt" => DocumentType::Receipt,
            _ => DocumentType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Receipt => "receipt",
            DocumentType::Other => "other",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(DocumentType::from_label(&label))
    }
}

/// Structured fields as returned by the LLM, prior to normalization.
///
/// Missing fields fall back to defaults; a field of the wrong type is a
/// schema deviation and fails deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFields {
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<RawAmount>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub vat_amount: Option<RawAmount>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub category_confidence: f32,
    #[serde(default)]
    pub items: Vec<RawItem>,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub confidence: f32,
}

/// Single line item as returned by the LLM.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Option<RawAmount>,
    #[serde(default)]
    pub vat: Option<RawAmount>,
}

/// Normalized extraction result persisted with a ready job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub merchant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_amount: Option<f64>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub category_confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ReceiptItem>,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub confidence: f32,
}

/// Normalized line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub vat: f64,
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_raw_fields_full_payload() {
        let payload = r#"{
            "merchant": "Cafe de la Gare",
            "date": "05/03/2024",
            "amount": "45,20",
            "currency": "EUR",
            "vat_amount": 7.53,
            "category": "Restaurant",
            "category_confidence": 0.92,
            "items": [
                {"description": "Menu du jour", "amount": 18.50, "vat": 3.08}
            ],
            "document_type": "receipt",
            "confidence": 0.88
        }"#;

        let fields: RawFields = serde_json::from_str(payload).unwrap();
        assert_eq!(fields.merchant.as_deref(), Some("Cafe de la Gare"));
        assert_eq!(fields.amount, Some(RawAmount::Text("45,20".to_string())));
        assert_eq!(fields.vat_amount, Some(RawAmount::Number(7.53)));
        assert_eq!(fields.category, Category::Restaurant);
        assert_eq!(fields.document_type, DocumentType::Receipt);
        assert_eq!(fields.items.len(), 1);
        assert_eq!(fields.items[0].description, "Menu du jour");
    }

    #[test]
    fn test_raw_fields_missing_fields_default() {
        let fields: RawFields = serde_json::from_str(r#"{"merchant": "Lidl"}"#).unwrap();
        assert_eq!(fields.merchant.as_deref(), Some("Lidl"));
        assert_eq!(fields.amount, None);
        assert_eq!(fields.category, Category::Other);
        assert_eq!(fields.document_type, DocumentType::Other);
        assert!(fields.items.is_empty());
        assert_eq!(fields.confidence, 0.0);
    }

    #[test]
    fn test_unknown_category_maps_to_other() {
        let fields: RawFields =
            serde_json::from_str(r#"{"category": "Entertainment"}"#).unwrap();
        assert_eq!(fields.category, Category::Other);

        assert_eq!(Category::from_label("groceries"), Category::Groceries);
        assert_eq!(Category::from_label(" Transport "), Category::Transport);
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        // amount as an array is a schema deviation, not a soft default
        assert!(serde_json::from_str::<RawFields>(r#"{"amount": [1, 2]}"#).is_err());
        assert!(serde_json::from_str::<RawFields>(r#"{"items": "none"}"#).is_err());
    }

    #[test]
    fn test_receipt_serialization_skips_absent_fields() {
        let receipt = Receipt {
            merchant: "Lidl".to_string(),
            date: None,
            amount: 12.34,
            currency: "EUR".to_string(),
            vat_amount: None,
            category: Category::Groceries,
            category_confidence: 0.9,
            items: vec![],
            document_type: DocumentType::Receipt,
            confidence: 0.8,
        };

        let json = serde_json::to_value(&receipt).unwrap();
        assert!(json.get("date").is_none());
        assert!(json.get("vat_amount").is_none());
        assert_eq!(json["category"], "Groceries");
        assert_eq!(json["document_type"], "receipt");
    }
}
