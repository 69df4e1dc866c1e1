//! Raw record → canonical record.
//!
//! Only the title is mandatory. Every other field that is missing or fails to coerce
//! is dropped to `None`/empty rather than failing the record.

use crate::common::error::{Result, ScraperError};
use crate::common::text::{html_fragment_to_text, non_blank};
use crate::common::types::{CanonicalBookFields, RawExtractedRecord, SourceVariant};
use crate::pipeline::processing::date::normalize_publication_date;
use crate::pipeline::processing::series::normalize_series_position;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// First number in the text with whatever sign or magnitude suffix is glued to it
static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<sign>[-+\u{2212}])?(?P<digits>\d[\d,]*(?:\.\d+)?)(?P<suffix>[kKmMbB]\b)?")
        .expect("valid number token regex")
});

/// Digits of the first number, thousands separators removed ("542,391 ratings").
/// Signed or abbreviated values ("-1", "1.2k") are refused rather than misread.
fn first_number(text: &str) -> Option<String> {
    let caps = NUMBER_TOKEN.captures(text)?;
    if caps.name("sign").is_some() || caps.name("suffix").is_some() {
        return None;
    }
    Some(caps["digits"].replace(',', ""))
}

/// Integers only: a fractional first number is refused
fn first_integer<T: std::str::FromStr>(text: &str) -> Option<T> {
    first_number(text)?.parse().ok()
}

pub fn parse_ratings_count(text: Option<&str>) -> Option<u64> {
    let text = text?;
    let count = first_integer(text);
    if count.is_none() {
        debug!("Discarding unparseable ratings count {:?}", text);
    }
    count
}

pub fn parse_average_rating(text: Option<&str>) -> Option<f64> {
    let text = text?;
    let rating = first_number(text)
        .and_then(|digits| digits.parse::<f64>().ok())
        .filter(|r| (0.0..=5.0).contains(r));
    if rating.is_none() {
        debug!("Discarding average rating {:?}", text);
    }
    rating
}

pub fn parse_page_count(text: Option<&str>) -> Option<u32> {
    let text = text?;
    let pages = first_integer::<u32>(text).filter(|p| *p > 0);
    if pages.is_none() {
        debug!("Discarding page count {:?}", text);
    }
    pages
}

/// Trimmed names with blanks dropped, source order kept
fn clean_list(items: Vec<String>) -> Vec<String> {
    items.into_iter().filter_map(|item| non_blank(Some(item))).collect()
}

/// Exact-match dedup, first occurrence wins. Case variants are left for the reconciler.
fn dedup_exact(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Map a raw record onto the canonical schema. Fails only when there is no title.
pub fn transform(
    raw: RawExtractedRecord,
    source: SourceVariant,
    source_url: &str,
) -> Result<CanonicalBookFields> {
    let title = non_blank(raw.title.as_deref())
        .ok_or_else(|| ScraperError::MissingRequiredField("title".to_string()))?;

    let series_name = non_blank(raw.series_name.as_deref());
    let series_position = match &series_name {
        Some(_) => normalize_series_position(raw.series_position.as_ref()),
        None => {
            if raw.series_position.is_some() {
                debug!("Dropping series position without a series name");
            }
            None
        }
    };

    let summary = raw
        .summary
        .as_deref()
        .map(html_fragment_to_text)
        .filter(|s| !s.is_empty());

    Ok(CanonicalBookFields {
        title,
        authors: clean_list(raw.authors),
        image_url: non_blank(raw.image_url.as_deref()),
        summary,
        publication_date: normalize_publication_date(
            raw.publication_date.as_deref(),
            raw.publication_date_raw.as_deref(),
        ),
        publisher: non_blank(raw.publisher.as_deref()),
        genres: dedup_exact(clean_list(raw.genres)),
        ratings_count: parse_ratings_count(raw.ratings_count.as_deref()),
        average_rating: parse_average_rating(raw.average_rating.as_deref()),
        number_of_pages: parse_page_count(raw.number_of_pages.as_deref()),
        characters: clean_list(raw.characters),
        language: non_blank(raw.language.as_deref()),
        series_name,
        series_position,
        isbn: non_blank(raw.isbn.as_deref()),
        source,
        source_url: source_url.to_string(),
    })
}
