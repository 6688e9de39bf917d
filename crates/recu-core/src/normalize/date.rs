//! Date normalization.

use chrono::NaiveDate;

use crate::normalize::patterns::{DATE_DMY, DATE_ISO};

/// Normalize a date string to canonical `YYYY-MM-DD`.
///
/// Canonical dates pass through unchanged; day-first numeric dates with `/`
/// or `-` separators are re-formatted. Both forms must name a real calendar
/// date. Anything else, including month names and two-digit years, is
/// absent.
pub fn normalize_date(value: Option<&str>) -> Option<String> {
    let raw = value?.trim();

    if let Some(caps) = DATE_ISO.captures(raw) {
        let year: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        NaiveDate::from_ymd_opt(year, month, day)?;
        return Some(raw.to_string());
    }

    if let Some(caps) = DATE_DMY.captures(raw) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let year: i32 = caps[3].parse().unwrap_or(0);
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        return Some(date.format("%Y-%m-%d").to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_date_passes_through() {
        assert_eq!(
            normalize_date(Some("2024-03-05")),
            Some("2024-03-05".to_string())
        );
        assert_eq!(
            normalize_date(Some("  2024-03-05  ")),
            Some("2024-03-05".to_string())
        );
    }

    #[test]
    fn test_day_first_dates_are_reformatted() {
        assert_eq!(
            normalize_date(Some("05/03/2024")),
            Some("2024-03-05".to_string())
        );
        assert_eq!(
            normalize_date(Some("5-3-2024")),
            Some("2024-03-05".to_string())
        );
        assert_eq!(
            normalize_date(Some("31/12/2023")),
            Some("2023-12-31".to_string())
        );
    }

    #[test]
    fn test_unrecognized_formats_are_absent() {
        assert_eq!(normalize_date(Some("March 5, 2024")), None);
        assert_eq!(normalize_date(Some("05/03/24")), None);
        assert_eq!(normalize_date(Some("2024/03/05")), None);
        assert_eq!(normalize_date(Some("")), None);
        assert_eq!(normalize_date(None), None);
    }

    #[test]
    fn test_impossible_dates_are_absent() {
        assert_eq!(normalize_date(Some("31/02/2024")), None);
        assert_eq!(normalize_date(Some("00/03/2024")), None);
        assert_eq!(normalize_date(Some("2024-13-05")), None);
        assert_eq!(normalize_date(Some("2024-02-30")), None);
    }

    #[test]
    fn test_leap_day_handling() {
        assert_eq!(
            normalize_date(Some("29/02/2024")),
            Some("2024-02-29".to_string())
        );
        assert_eq!(normalize_date(Some("29/02/2023")), None);
    }
}
