//! Publication date normalization.
//!
//! Sources emit anything from ISO dates to "First published January 1st, 1998" to a
//! bare year. `normalize_date` runs a fixed fallback chain, first match wins, so the
//! same text always lands on the same `PublicationDate`.

use crate::common::types::PublicationDate;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid iso date regex"));

static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid year regex"));

/// "January 1, 1998", "Jan. 1st 1998"
static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTH}\s+(\d{{1,2}})(?:st|nd|rd|th)?\s*,?\s+(\d{{4}})\b"
    ))
    .expect("valid month-day-year regex")
});

/// "1 January 1998", "26th June, 1997"
static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}\s*,?\s+(\d{{4}})\b"
    ))
    .expect("valid day-month-year regex")
});

/// "June 2003"
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH}\s*,?\s+(\d{{4}})\b")).expect("valid month-year regex")
});

static YEAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid year token regex"));

/// Whole-string formats tried by the generic step
const GENERIC_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y %B %d",
];

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

fn iso_date(text: &str) -> Option<PublicationDate> {
    let captures = ISO_DATE.captures(text)?;
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok();
    Some(match date {
        Some(date) => PublicationDate::FullDate(date),
        // Impossible day/month: keep what we can trust
        None => PublicationDate::YearOnly(captures[1].parse().ok()?),
    })
}

fn bare_year(text: &str) -> Option<PublicationDate> {
    BARE_YEAR
        .is_match(text)
        .then(|| text.parse().ok())
        .flatten()
        .map(PublicationDate::YearOnly)
}

fn long_form(text: &str) -> Option<NaiveDate> {
    MONTH_DAY_YEAR
        .captures_iter(text)
        .find_map(|c| ymd(&c[3], month_number(&c[1])?, &c[2]))
        .or_else(|| {
            DAY_MONTH_YEAR
                .captures_iter(text)
                .find_map(|c| ymd(&c[3], month_number(&c[2])?, &c[1]))
        })
}

fn month_and_year(text: &str) -> Option<NaiveDate> {
    MONTH_YEAR
        .captures_iter(text)
        .find_map(|c| ymd(&c[2], month_number(&c[1])?, "1"))
}

fn generic(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }
    GENERIC_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

fn year_token(text: &str) -> Option<i32> {
    YEAR_TOKEN.captures(text)?[1].parse().ok()
}

/// Normalize free-text date into a tagged date. Never fails: text nothing recognises
/// comes back as `Unparsed`, byte for byte.
pub fn normalize_date(input: &str) -> PublicationDate {
    let text = input.trim();

    let result = iso_date(text)
        .or_else(|| bare_year(text))
        .or_else(|| long_form(text).map(PublicationDate::FullDate))
        .or_else(|| month_and_year(text).map(PublicationDate::FullDate))
        .or_else(|| generic(text).map(PublicationDate::FullDate))
        .or_else(|| year_token(text).map(PublicationDate::YearOnly))
        .unwrap_or_else(|| PublicationDate::Unparsed(input.to_string()));

    debug!("Normalized date {:?} -> {:?}", input, result);
    result
}

fn non_blank_date(value: Option<&str>) -> Option<PublicationDate> {
    value.filter(|v| !v.trim().is_empty()).map(normalize_date)
}

/// Pick the publication date from a record's free-text date and its secondary raw
/// (often year-only) text. The free-text date wins unless it is missing or unparsed.
pub fn normalize_publication_date(date: Option<&str>, raw: Option<&str>) -> Option<PublicationDate> {
    let primary = non_blank_date(date);
    if matches!(
        primary,
        Some(PublicationDate::FullDate(_)) | Some(PublicationDate::YearOnly(_))
    ) {
        return primary;
    }
    match non_blank_date(raw) {
        Some(PublicationDate::Unparsed(_)) | None => primary.or_else(|| non_blank_date(raw)),
        parsed => parsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(y: i32, m: u32, d: u32) -> PublicationDate {
        PublicationDate::FullDate(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_valid_iso_dates_round_trip() {
        for text in ["1998-01-01", "2003-06-30", "2000-02-29", "1887-12-31"] {
            match normalize_date(text) {
                PublicationDate::FullDate(date) => {
                    assert_eq!(date.format("%Y-%m-%d").to_string(), text)
                }
                other => panic!("{text} normalized to {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_iso_date_keeps_year() {
        assert_eq!(normalize_date("2001-02-30"), PublicationDate::YearOnly(2001));
        assert_eq!(normalize_date("1999-13-01"), PublicationDate::YearOnly(1999));
    }

    #[test]
    fn test_bare_year() {
        assert_eq!(normalize_date("1998"), PublicationDate::YearOnly(1998));
        assert_eq!(normalize_date(" 1850 "), PublicationDate::YearOnly(1850));
    }

    #[test]
    fn test_month_day_year() {
        assert_eq!(normalize_date("January 1, 1998"), full(1998, 1, 1));
        assert_eq!(normalize_date("First published January 1, 1998"), full(1998, 1, 1));
        assert_eq!(normalize_date("Published  SEPTEMBER 21st   2010"), full(2010, 9, 21));
        assert_eq!(normalize_date("Aug. 31 2010"), full(2010, 8, 31));
    }

    #[test]
    fn test_day_month_year() {
        assert_eq!(normalize_date("26 June 1997"), full(1997, 6, 26));
        assert_eq!(normalize_date("2nd of March, 2004"), full(2004, 3, 2));
    }

    #[test]
    fn test_month_year_defaults_to_first() {
        assert_eq!(normalize_date("June 2003"), full(2003, 6, 1));
        assert_eq!(normalize_date("published in dec 1965"), full(1965, 12, 1));
    }

    #[test]
    fn test_generic_formats() {
        assert_eq!(normalize_date("2003/06/01"), full(2003, 6, 1));
        assert_eq!(normalize_date("06/01/2003"), full(2003, 6, 1));
        assert_eq!(normalize_date("2003-06-01T10:00:00Z"), full(2003, 6, 1));
    }

    #[test]
    fn test_year_token_fallback() {
        assert_eq!(
            normalize_date("Published sometime in 2010 by Acme"),
            PublicationDate::YearOnly(2010)
        );
        // Impossible month/day combination falls through to the year
        assert_eq!(normalize_date("February 31, 1999"), PublicationDate::YearOnly(1999));
    }

    #[test]
    fn test_unparsed_keeps_original_text() {
        assert_eq!(
            normalize_date("not a date at all"),
            PublicationDate::Unparsed("not a date at all".into())
        );
        assert_eq!(
            normalize_date("  circa 1700s "),
            PublicationDate::Unparsed("  circa 1700s ".into())
        );
    }

    #[test]
    fn test_normalization_is_deterministic() {
        for text in ["January 1, 1998", "June 2003", "garbage", "2010", "2001-02-30"] {
            assert_eq!(normalize_date(text), normalize_date(text));
        }
    }

    #[test]
    fn test_publication_date_prefers_parsed_primary() {
        assert_eq!(
            normalize_publication_date(Some("January 1, 1998"), Some("1997")),
            Some(full(1998, 1, 1))
        );
    }

    #[test]
    fn test_publication_date_falls_back_to_raw() {
        assert_eq!(
            normalize_publication_date(Some("unknown"), Some("1997")),
            Some(PublicationDate::YearOnly(1997))
        );
        assert_eq!(
            normalize_publication_date(None, Some("1997")),
            Some(PublicationDate::YearOnly(1997))
        );
        assert_eq!(
            normalize_publication_date(Some("  "), None),
            None
        );
        assert_eq!(
            normalize_publication_date(Some("unknown"), Some("also unknown")),
            Some(PublicationDate::Unparsed("unknown".into()))
        );
    }
}
