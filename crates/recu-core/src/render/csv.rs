//! Tabular artifact rendering.

use crate::error::ExportError;
use crate::models::receipt::Receipt;

/// Render a receipt as a one-record CSV summary.
///
/// Line items are flattened into a single column; the PDF artifact carries
/// the itemized list.
pub fn receipt_to_csv(receipt: &Receipt) -> Result<Vec<u8>, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "merchant",
        "date",
        "amount",
        "currency",
        "vat_amount",
        "category",
        "category_confidence",
        "document_type",
        "confidence",
        "items",
    ])
    .map_err(|e| ExportError::Csv(e.to_string()))?;

    let items = receipt
        .items
        .iter()
        .map(|item| format!("{} ({:.2})", item.description, item.amount))
        .collect::<Vec<_>>()
        .join("; ");

    wtr.write_record([
        receipt.merchant.clone(),
        receipt.date.clone().unwrap_or_default(),
        format!("{:.2}", receipt.amount),
        receipt.currency.clone(),
        receipt
            .vat_amount
            .map(|v| format!("{v:.2}"))
            .unwrap_or_default(),
        receipt.category.to_string(),
        format!("{:.2}", receipt.category_confidence),
        receipt.document_type.to_string(),
        format!("{:.2}", receipt.confidence),
        items,
    ])
    .map_err(|e| ExportError::Csv(e.to_string()))?;

    wtr.into_inner().map_err(|e| ExportError::Csv(e.to_string()))
}
