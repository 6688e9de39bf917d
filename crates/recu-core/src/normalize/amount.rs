//! Amount normalization.

use crate::models::receipt::RawAmount;

/// Normalize a raw amount into a canonical positive value.
///
/// Numbers pass through when strictly positive and finite. Strings go
/// through [`parse_amount_text`]. Everything else is absent.
pub fn parse_amount(value: Option<&RawAmount>) -> Option<f64> {
    match value {
        None => None,
        Some(RawAmount::Number(n)) => canonical(*n),
        Some(RawAmount::Text(s)) => parse_amount_text(s),
    }
}

/// Normalize a loosely formatted amount string.
///
/// Strips spaces and currency tokens, drops every character that is not a
/// digit, `.`, `,` or `-`, then decides the decimal separator: when both
/// `,` and `.` appear, whichever occurs last wins and the other is removed
/// as grouping. A value that does not parse, or is not strictly positive,
/// is absent.
pub fn parse_amount_text(input: &str) -> Option<f64> {
    let stripped = input
        .replace(' ', "")
        .replace('€', "")
        .replace("EUR", "")
        .replace('$', "");
    let cleaned: String = stripped
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');

    let normalized = match (last_comma, last_dot) {
        // Both present: the later one is the decimal separator
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    canonical(normalized.parse().ok()?)
}

fn canonical(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_amount_text_european_format() {
        assert_eq!(parse_amount_text("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount_text("12,34"), Some(12.34));
        assert_eq!(parse_amount_text("1 234,56 €"), Some(1234.56));
    }

    #[test]
    fn test_parse_amount_text_anglo_format() {
        assert_eq!(parse_amount_text("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount_text("45.20"), Some(45.20));
        assert_eq!(parse_amount_text("$12.50"), Some(12.50));
        assert_eq!(parse_amount_text("EUR 45.20"), Some(45.20));
    }

    #[test]
    fn test_parse_amount_text_lone_comma_is_decimal() {
        // A single comma is always read as the decimal separator, even when
        // it was meant as grouping.
        assert_eq!(parse_amount_text("1,234"), Some(1.234));
    }

    #[test]
    fn test_parse_amount_text_rejects_non_positive() {
        assert_eq!(parse_amount_text("0,00"), None);
        assert_eq!(parse_amount_text("-12,34"), None);
        assert_eq!(parse_amount_text("0.00"), None);
    }

    #[test]
    fn test_parse_amount_text_rejects_garbage() {
        assert_eq!(parse_amount_text(""), None);
        assert_eq!(parse_amount_text("€"), None);
        assert_eq!(parse_amount_text("total"), None);
        assert_eq!(parse_amount_text("12.34.56"), None);
    }

    #[test]
    fn test_parse_amount_numbers() {
        assert_eq!(parse_amount(Some(&RawAmount::Number(42.5))), Some(42.5));
        assert_eq!(parse_amount(Some(&RawAmount::Number(0.0))), None);
        assert_eq!(parse_amount(Some(&RawAmount::Number(-3.2))), None);
        assert_eq!(parse_amount(Some(&RawAmount::Number(f64::NAN))), None);
    }

    #[test]
    fn test_parse_amount_absent() {
        assert_eq!(parse_amount(None), None);
        assert_eq!(
            parse_amount(Some(&RawAmount::Text("  ".to_string()))),
            None
        );
    }

    #[test]
    fn test_parse_amount_strings_delegate() {
        assert_eq!(
            parse_amount(Some(&RawAmount::Text("1.234,56".to_string()))),
            Some(1234.56)
        );
    }
}
