//! Common regex patterns for amount and date normalization.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Total keywords followed within 20 chars by a number. Tried strict
    // (two decimal places) first, then integer. The window is lazy so it
    // stops at the first digit of the amount, and never crosses lines.
    pub static ref TOTAL_WITH_DECIMALS: Regex = Regex::new(
        r"(?i)(total|montant|somme|payé|net à payer|ttc).{0,20}?(\d+\.\d{2})"
    ).unwrap();

    pub static ref TOTAL_ANY_NUMBER: Regex = Regex::new(
        r"(?i)(total|montant|somme|payé|net à payer|ttc).{0,20}?(\d+)"
    ).unwrap();

    // Free-standing amount with two decimal places
    pub static ref DECIMAL_AMOUNT: Regex = Regex::new(
        r"\d+\.\d{2}"
    ).unwrap();

    // Date formats accepted by the normalizer
    pub static ref DATE_ISO: Regex = Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})$"
    ).unwrap();

    pub static ref DATE_DMY: Regex = Regex::new(
        r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$"
    ).unwrap();
}
