//! DOM-based extraction: fetch the page with a browser identity, then read each field
//! through an ordered list of selector strategies.
//!
//! Sources reshuffle their markup every so often, so every field carries at least one
//! fallback selector. A field whose selectors all miss is simply absent.

use crate::apis::Extractor;
use crate::app::ports::HttpClientPort;
use crate::common::constants::ACCEPT_HTML;
use crate::common::error::{Result, ScraperError};
use crate::common::text::{collapse_whitespace, element_text_with_breaks, non_blank};
use crate::common::types::{RawExtractedRecord, RawSeriesPosition, SourceVariant};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How to turn the elements matched by one selector into a value
#[derive(Debug, Clone, Copy)]
pub enum Read {
    /// Text of the first match, whitespace collapsed to one line
    Text,
    /// Text of the first match with `<br>` and paragraph breaks kept as newlines
    Multiline,
    /// Multiline text of up to `n` matches, joined as paragraphs
    Paragraphs(usize),
    /// Attribute of the first match
    Attr(&'static str),
    /// One list item per match
    Each,
    /// Multiline text of the first match split into items on these separators
    Split(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub css: &'static str,
    pub read: Read,
}

pub const fn text(css: &'static str) -> Strategy {
    Strategy { css, read: Read::Text }
}

pub const fn multiline(css: &'static str) -> Strategy {
    Strategy { css, read: Read::Multiline }
}

pub const fn paragraphs(css: &'static str, max: usize) -> Strategy {
    Strategy { css, read: Read::Paragraphs(max) }
}

pub const fn attr(css: &'static str, name: &'static str) -> Strategy {
    Strategy { css, read: Read::Attr(name) }
}

pub const fn each(css: &'static str) -> Strategy {
    Strategy { css, read: Read::Each }
}

pub const fn split(css: &'static str, separators: &'static [&'static str]) -> Strategy {
    Strategy { css, read: Read::Split(separators) }
}

/// Separators for free-text lists like "Fantasy, Young Adult" or one-per-line values
pub const LIST_SEPARATORS: &[&str] = &["\n", ",", ";", "•", "·"];
/// Author lists also join names with "and"/"&"
pub const NAME_SEPARATORS: &[&str] = &["\n", ",", ";", " and ", " & "];

/// Per-source selector strategies, tried in order for each field
#[derive(Debug)]
pub struct SelectorPlan {
    pub title: &'static [Strategy],
    pub image_url: &'static [Strategy],
    pub summary: &'static [Strategy],
    pub publication_date: &'static [Strategy],
    pub publication_date_raw: &'static [Strategy],
    pub publisher: &'static [Strategy],
    pub authors: &'static [Strategy],
    pub genres: &'static [Strategy],
    pub ratings_count: &'static [Strategy],
    pub average_rating: &'static [Strategy],
    pub number_of_pages: &'static [Strategy],
    pub language: &'static [Strategy],
    pub characters: &'static [Strategy],
    pub series_name: &'static [Strategy],
    pub series_position: &'static [Strategy],
    pub isbn: &'static [Strategy],
    /// Source-specific cleanup once every field has been read
    pub post_process: Option<fn(&mut RawExtractedRecord)>,
}

/// Read every field of `plan` out of an HTML document. Never fails: misses are absences.
pub fn parse_document(html: &str, plan: &SelectorPlan) -> RawExtractedRecord {
    let document = Html::parse_document(html);

    let mut record = RawExtractedRecord {
        title: first_value(&document, plan.title),
        image_url: first_value(&document, plan.image_url),
        summary: first_value(&document, plan.summary),
        publication_date: first_value(&document, plan.publication_date),
        publication_date_raw: first_value(&document, plan.publication_date_raw),
        publisher: first_value(&document, plan.publisher),
        authors: first_list(&document, plan.authors),
        genres: first_list(&document, plan.genres),
        ratings_count: first_value(&document, plan.ratings_count),
        average_rating: first_value(&document, plan.average_rating),
        number_of_pages: first_value(&document, plan.number_of_pages),
        language: first_value(&document, plan.language),
        characters: first_list(&document, plan.characters),
        series_name: first_value(&document, plan.series_name),
        series_position: first_value(&document, plan.series_position).map(RawSeriesPosition::Text),
        isbn: first_value(&document, plan.isbn),
    };

    if let Some(post_process) = plan.post_process {
        post_process(&mut record);
    }
    record
}

fn compile(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Skipping invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// First strategy that yields a non-blank scalar wins
fn first_value(document: &Html, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|strategy| {
        let selector = compile(strategy.css)?;
        let value = match strategy.read {
            Read::Text => document
                .select(&selector)
                .next()
                .map(|el| collapse_whitespace(&element_text_with_breaks(el))),
            Read::Multiline => document
                .select(&selector)
                .next()
                .map(element_text_with_breaks),
            Read::Paragraphs(max) => {
                let joined = document
                    .select(&selector)
                    .map(element_text_with_breaks)
                    .filter(|p| !p.is_empty())
                    .take(max)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                Some(joined)
            }
            Read::Attr(name) => document
                .select(&selector)
                .find_map(|el| el.value().attr(name))
                .map(str::to_string),
            Read::Each | Read::Split(_) => first_list_for(document, &selector, strategy.read)
                .into_iter()
                .next(),
        };
        let value = value.filter(|v| !v.trim().is_empty());
        if value.is_some() {
            debug!("Selector '{}' matched", strategy.css);
        }
        value
    })
}

/// First strategy that yields a non-empty list wins
fn first_list(document: &Html, strategies: &[Strategy]) -> Vec<String> {
    strategies
        .iter()
        .find_map(|strategy| {
            let selector = compile(strategy.css)?;
            let items = first_list_for(document, &selector, strategy.read);
            (!items.is_empty()).then_some(items)
        })
        .unwrap_or_default()
}

fn first_list_for(document: &Html, selector: &Selector, read: Read) -> Vec<String> {
    match read {
        Read::Each => document
            .select(selector)
            .filter_map(|el| non_blank(Some(&element_text_with_breaks(el))))
            .collect(),
        Read::Split(separators) => document
            .select(selector)
            .next()
            .map(|el| split_items(&element_text_with_breaks(el), separators))
            .unwrap_or_default(),
        Read::Attr(name) => document
            .select(selector)
            .filter_map(|el| non_blank(el.value().attr(name)))
            .collect(),
        Read::Text | Read::Multiline | Read::Paragraphs(_) => document
            .select(selector)
            .next()
            .and_then(|el| non_blank(Some(&element_text_with_breaks(el))))
            .into_iter()
            .collect(),
    }
}

/// Split free text into trimmed, non-empty items
pub fn split_items(text: &str, separators: &[&str]) -> Vec<String> {
    let mut normalized = text.to_string();
    for separator in separators {
        normalized = normalized.replace(separator, "\n");
    }
    normalized
        .lines()
        .filter_map(|item| non_blank(Some(item)))
        .collect()
}

pub struct DomExtractor {
    source: SourceVariant,
    http: Arc<dyn HttpClientPort>,
    plan: &'static SelectorPlan,
    user_agent: String,
}

impl DomExtractor {
    pub fn new(
        source: SourceVariant,
        http: Arc<dyn HttpClientPort>,
        plan: &'static SelectorPlan,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            source,
            http,
            plan,
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl Extractor for DomExtractor {
    fn source(&self) -> SourceVariant {
        self.source
    }

    #[instrument(skip(self), fields(source = %self.source))]
    async fn extract(&self, url: &str) -> Result<RawExtractedRecord> {
        let headers = [("User-Agent", self.user_agent.as_str()), ("Accept", ACCEPT_HTML)];
        let response = self
            .http
            .get(url, &headers)
            .await
            .map_err(|e| ScraperError::ExtractionFailed(format!("GET {url} failed: {e}")))?;

        if !response.is_success() {
            return Err(ScraperError::ExtractionFailed(format!(
                "GET {url} responded with HTTP {}",
                response.status
            )));
        }
        if !response.is_markup() {
            return Err(ScraperError::ExtractionFailed(format!(
                "GET {url} returned {} instead of a page",
                response.content_type
            )));
        }

        let record = parse_document(&response.body, self.plan);
        if record.is_empty() {
            warn!("No fields matched on {}", url);
        } else {
            info!(
                "Extracted {} page: title={:?}, {} author(s), {} genre(s)",
                self.source,
                record.title,
                record.authors.len(),
                record.genres.len()
            );
        }
        Ok(record)
    }
}
