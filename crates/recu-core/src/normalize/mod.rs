//! Normalization rules for amounts and dates.
//!
//! These run after the LLM step and never touch the network: amounts are
//! canonicalized to positive numbers, dates to `YYYY-MM-DD`, and a raw-text
//! fallback recovers a total when the structured amount is unusable.

pub mod amount;
pub mod date;
pub mod fallback;
pub mod patterns;

pub use amount::{parse_amount, parse_amount_text};
pub use date::normalize_date;
pub use fallback::extract_amount_from_text;
