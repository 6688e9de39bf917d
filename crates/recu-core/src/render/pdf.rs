//! Printable PDF summary rendering.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::error::ExportError;
use crate::models::receipt::Receipt;

/// Render a receipt as a single-page A4 PDF summary.
pub fn receipt_to_pdf(receipt: &Receipt) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
        Operation::new("TL", vec![16.into()]),
        Operation::new("Td", vec![56.into(), 780.into()]),
    ];
    for line in summary_lines(receipt) {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Resources" => resources_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(out)
}

fn summary_lines(receipt: &Receipt) -> Vec<String> {
    let mut lines = vec![
        "Receipt Summary".to_string(),
        String::new(),
        format!("Merchant: {}", receipt.merchant),
        format!("Date: {}", receipt.date.as_deref().unwrap_or("-")),
        format!("Total: {:.2} {}", receipt.amount, receipt.currency),
    ];
    if let Some(vat) = receipt.vat_amount {
        lines.push(format!("VAT: {:.2} {}", vat, receipt.currency));
    }
    lines.push(format!(
        "Category: {} ({:.0}%)",
        receipt.category,
        receipt.category_confidence * 100.0
    ));
    lines.push(format!("Document type: {}", receipt.document_type));
    lines.push(format!(
        "Extraction confidence: {:.0}%",
        receipt.confidence * 100.0
    ));

    if !receipt.items.is_empty() {
        lines.push(String::new());
        lines.push("Items:".to_string());
        for item in &receipt.items {
            lines.push(format!(
                "  {} - {:.2} (VAT {:.2})",
                item.description, item.amount, item.vat
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::{Category, DocumentType, ReceiptItem};

    fn sample_receipt() -> Receipt {
        Receipt {
            merchant: "Hotel Central".to_string(),
            date: Some("2024-03-05".to_string()),
            amount: 210.00,
            currency: "EUR".to_string(),
            vat_amount: Some(35.00),
            category: Category::Accommodation,
            category_confidence: 0.95,
            items: vec![ReceiptItem {
                description: "Room, 2 nights".to_string(),
                amount: 210.00,
                vat: 35.00,
            }],
            document_type: DocumentType::Invoice,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_pdf_artifact_is_valid_header() {
        let bytes = receipt_to_pdf(&sample_receipt()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        // content stream is uncompressed, so the summary text is visible
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("Hotel Central"));
        assert!(body.contains("210.00 EUR"));
    }

    #[test]
    fn test_summary_lists_items() {
        let lines = summary_lines(&sample_receipt());
        assert!(lines.iter().any(|l| l.contains("Room, 2 nights")));
        assert!(lines.iter().any(|l| l == "Items:"));
    }

    #[test]
    fn test_summary_omits_absent_sections() {
        let mut receipt = sample_receipt();
        receipt.vat_amount = None;
        receipt.items.clear();

        let lines = summary_lines(&receipt);
        assert!(!lines.iter().any(|l| l.starts_with("VAT:")));
        assert!(!lines.iter().any(|l| l == "Items:"));
        assert!(lines.iter().any(|l| l == "Date: 2024-03-05"));
    }
}
