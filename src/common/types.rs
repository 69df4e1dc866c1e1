use crate::common::constants::{FANDOM_SOURCE, GOODREADS_SOURCE, UNKNOWN_SOURCE};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Site family a book-page URL belongs to. Derived per request, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceVariant {
    Fandom,
    Goodreads,
    Unknown,
}

impl SourceVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceVariant::Fandom => FANDOM_SOURCE,
            SourceVariant::Goodreads => GOODREADS_SOURCE,
            SourceVariant::Unknown => UNKNOWN_SOURCE,
        }
    }
}

impl fmt::Display for SourceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Series position as a source hands it over: sometimes a JSON number, sometimes text like "1/1".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSeriesPosition {
    Number(serde_json::Number),
    Text(String),
}

/// Unvalidated, source-shaped output of one extraction call.
///
/// Every field is optional. A page that matched nothing yields `RawExtractedRecord::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtractedRecord {
    pub title: Option<String>,
    pub image_url: Option<String>,
    /// Plain text, or an HTML-ish fragment when the source hands over markup
    pub summary: Option<String>,
    /// Free-text publication date ("First published January 1, 1998", "2003-06-01", ...)
    pub publication_date: Option<String>,
    /// Secondary date text that often arrives already year-only
    pub publication_date_raw: Option<String>,
    pub publisher: Option<String>,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
    pub ratings_count: Option<String>,
    pub average_rating: Option<String>,
    pub number_of_pages: Option<String>,
    pub language: Option<String>,
    pub characters: Vec<String>,
    pub series_name: Option<String>,
    pub series_position: Option<RawSeriesPosition>,
    pub isbn: Option<String>,
}

impl RawExtractedRecord {
    /// True when extraction found nothing at all
    pub fn is_empty(&self) -> bool {
        *self == RawExtractedRecord::default()
    }
}

/// Normalized publication date. `Unparsed` is a legitimate terminal state, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PublicationDate {
    FullDate(NaiveDate),
    YearOnly(i32),
    Unparsed(String),
}

impl fmt::Display for PublicationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicationDate::FullDate(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            PublicationDate::YearOnly(year) => write!(f, "{year:04}"),
            PublicationDate::Unparsed(text) => f.write_str(text),
        }
    }
}

/// Source-independent book record consumed by the rest of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalBookFields {
    pub title: String,
    pub authors: Vec<String>,
    pub image_url: Option<String>,
    pub summary: Option<String>,
    pub publication_date: Option<PublicationDate>,
    pub publisher: Option<String>,
    pub genres: Vec<String>,
    pub ratings_count: Option<u64>,
    pub average_rating: Option<f64>,
    pub number_of_pages: Option<u32>,
    pub characters: Vec<String>,
    pub language: Option<String>,
    pub series_name: Option<String>,
    pub series_position: Option<String>,
    pub isbn: Option<String>,
    pub source: SourceVariant,
    pub source_url: String,
}

impl CanonicalBookFields {
    /// A record with only the required fields populated
    pub fn titled(title: impl Into<String>, source: SourceVariant, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            image_url: None,
            summary: None,
            publication_date: None,
            publisher: None,
            genres: Vec::new(),
            ratings_count: None,
            average_rating: None,
            number_of_pages: None,
            characters: Vec::new(),
            language: None,
            series_name: None,
            series_position: None,
            isbn: None,
            source,
            source_url: source_url.into(),
        }
    }
}

/// Catalog entity families that get reconciled to stable identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Author,
    Genre,
    Series,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Author => "author",
            EntityKind::Genre => "genre",
            EntityKind::Series => "series",
        }
    }
}

pub type CatalogId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledEntity {
    pub name: String,
    pub id: CatalogId,
    /// True when this run created the entity rather than reusing it
    pub created: bool,
}

/// Name → identifier mappings produced by a persist run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledEntityIds {
    pub authors: Vec<ReconciledEntity>,
    pub genres: Vec<ReconciledEntity>,
    pub series: Option<ReconciledEntity>,
}
