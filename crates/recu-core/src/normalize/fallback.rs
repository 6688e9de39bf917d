//! Text-based fallback extraction of the total amount.
//!
//! Used only when the structured amount from the LLM does not survive
//! normalization.

use std::cmp::Ordering;

use crate::normalize::patterns::{DECIMAL_AMOUNT, TOTAL_ANY_NUMBER, TOTAL_WITH_DECIMALS};

/// Upper bound on amounts accepted by the keyword-less scan.
const MAX_PLAUSIBLE_AMOUNT: f64 = 10_000.0;

/// Scan raw document text for a total-like amount.
///
/// Every comma becomes a dot up front, comma-grouped thousands included.
/// Keyword patterns run in order (decimals first, then bare integers); for
/// a pattern only its last match counts, and a non-positive value falls
/// through to the next stage. The last resort takes the largest
/// free-standing decimal below 10000.
pub fn extract_amount_from_text(text: &str) -> Option<f64> {
    let normalized = text.replace(',', ".");

    for pattern in [&*TOTAL_WITH_DECIMALS, &*TOTAL_ANY_NUMBER] {
        if let Some(caps) = pattern.captures_iter(&normalized).last() {
            if let Ok(value) = caps[2].parse::<f64>() {
                if value > 0.0 {
                    return Some(value);
                }
            }
        }
    }

    DECIMAL_AMOUNT
        .find_iter(&normalized)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| *v > 0.0 && *v < MAX_PLAUSIBLE_AMOUNT)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}
