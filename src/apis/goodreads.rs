//! Goodreads book pages.
//!
//! By default Goodreads is extracted out of process (see `apis::subprocess`); the
//! extractor prints one JSON object and `map_goodreads_payload` turns it into a raw
//! record. `GOODREADS_PLAN` covers the in-process DOM mode for deployments without
//! the external extractor.

use crate::apis::dom::{attr, each, multiline, text, SelectorPlan};
use crate::common::error::{Result, ScraperError};
use crate::common::text::{collapse_whitespace, non_blank};
use crate::common::types::{RawExtractedRecord, RawSeriesPosition};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// "Harry Potter #1", "(The Stormlight Archive #2.5)", "Discworld, #1-3"
static SERIES_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?\s*(?P<name>.+?)\s*,?\s*#\s*(?P<position>[^\s)]+)\s*\)?$")
        .expect("valid series label regex")
});

pub static GOODREADS_PLAN: SelectorPlan = SelectorPlan {
    title: &[
        text("h1[data-testid=\"bookTitle\"]"),
        text("h1#bookTitle"),
        attr("meta[property=\"og:title\"]", "content"),
    ],
    image_url: &[
        attr(".BookCover__image img.ResponsiveImage", "src"),
        attr("img#coverImage", "src"),
        attr("meta[property=\"og:image\"]", "content"),
    ],
    summary: &[
        multiline("[data-testid=\"description\"] .Formatted"),
        multiline("#description span[style=\"display:none\"]"),
        multiline("#description span"),
        attr("meta[property=\"og:description\"]", "content"),
    ],
    publication_date: &[
        text("p[data-testid=\"publicationInfo\"]"),
        text("#details nobr.greyText"),
        text("#details .row:nth-child(2)"),
    ],
    publication_date_raw: &[],
    publisher: &[],
    authors: &[
        each(".ContributorLinksList a.ContributorLink span.ContributorLink__name"),
        each("a.authorName span[itemprop=\"name\"]"),
        attr("meta[property=\"books:author\"]", "content"),
    ],
    genres: &[
        each("[data-testid=\"genresList\"] .Button__labelItem"),
        each("a.bookPageGenreLink"),
    ],
    ratings_count: &[
        text("[data-testid=\"ratingsCount\"]"),
        attr("meta[itemprop=\"ratingCount\"]", "content"),
    ],
    average_rating: &[
        text(".RatingStatistics__rating"),
        text("span[itemprop=\"ratingValue\"]"),
    ],
    number_of_pages: &[
        text("p[data-testid=\"pagesFormat\"]"),
        text("span[itemprop=\"numberOfPages\"]"),
    ],
    language: &[text("[itemprop=\"inLanguage\"]")],
    characters: &[each("a[href*=\"/characters/\"]")],
    series_name: &[
        text("h3.Text__italic a[href*=\"/series/\"]"),
        text("h2#bookSeries a"),
    ],
    series_position: &[],
    isbn: &[
        attr("meta[property=\"books:isbn\"]", "content"),
        text("[itemprop=\"isbn\"]"),
    ],
    post_process: Some(split_series_into_position),
};

/// Split a combined "Series #N" label into name and position when the position
/// was not supplied on its own.
pub fn split_series_into_position(record: &mut RawExtractedRecord) {
    if record.series_position.is_some() {
        return;
    }
    let Some(label) = record.series_name.take() else {
        return;
    };
    match SERIES_LABEL.captures(&label) {
        Some(captures) => {
            record.series_name = non_blank(captures.name("name").map(|m| m.as_str()));
            record.series_position = captures
                .name("position")
                .map(|m| RawSeriesPosition::Text(m.as_str().to_string()));
        }
        None => {
            let bare = label.trim().trim_start_matches('(').trim_end_matches(')');
            record.series_name = non_blank(Some(bare));
        }
    }
}

/// First key present as a string or number, as text
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => non_blank(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Long-form text keeps its own line structure; the transformer tidies it.
fn long_text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)?
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    })
}

/// First key present as an array of strings, or a comma-separated string
fn list_field(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| {
            let items: Vec<String> = match obj.get(*key)? {
                Value::Array(values) => values.iter().filter_map(list_item).collect(),
                Value::String(s) => s.split(',').filter_map(|item| non_blank(Some(item))).collect(),
                _ => return None,
            };
            (!items.is_empty()).then_some(items)
        })
        .unwrap_or_default()
}

fn list_item(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(Some(s)),
        // {"name": "..."} objects from richer extractor output
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(collapse_whitespace),
        // [genre, shelf count] pairs
        Value::Array(pair) => pair.first().and_then(list_item),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

fn series_position_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<RawSeriesPosition> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => Some(RawSeriesPosition::Number(n.clone())),
        Value::String(s) if !s.trim().is_empty() => Some(RawSeriesPosition::Text(s.clone())),
        _ => None,
    })
}

/// Map the external extractor's JSON document onto a raw record. Field names in
/// both camelCase and snake_case are accepted; unknown keys are ignored.
pub fn map_goodreads_payload(payload: Value) -> Result<RawExtractedRecord> {
    let Value::Object(obj) = payload else {
        return Err(ScraperError::ExtractionFailed(
            "Goodreads extractor output is not a JSON object".to_string(),
        ));
    };

    let mut record = RawExtractedRecord {
        title: text_field(&obj, &["title", "book_title"]),
        image_url: text_field(&obj, &["imageUrl", "image_url", "cover_image", "cover"]),
        summary: long_text_field(&obj, &["summary", "description"]),
        publication_date: text_field(
            &obj,
            &["publicationDate", "publication_date", "publish_date", "date_published"],
        ),
        publication_date_raw: text_field(
            &obj,
            &["yearFirstPublished", "year_first_published", "original_publication_year"],
        ),
        publisher: text_field(&obj, &["publisher"]),
        authors: list_field(&obj, &["authors", "author"]),
        genres: list_field(&obj, &["genres", "genre"]),
        ratings_count: text_field(&obj, &["ratingsCount", "ratings_count", "num_ratings"]),
        average_rating: text_field(&obj, &["averageRating", "average_rating", "rating"]),
        number_of_pages: text_field(&obj, &["numberOfPages", "number_of_pages", "num_pages", "pages"]),
        language: text_field(&obj, &["language"]),
        characters: list_field(&obj, &["characters"]),
        series_name: text_field(&obj, &["seriesName", "series_name", "series", "book_series"]),
        series_position: series_position_field(
            &obj,
            &["seriesPosition", "series_position", "book_series_position"],
        ),
        isbn: text_field(&obj, &["isbn", "isbn13", "isbn10"]),
    };

    split_series_into_position(&mut record);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::dom::parse_document;
    use serde_json::json;

    #[test]
    fn test_map_full_payload() {
        let payload = json!({
            "title": "Dune",
            "author": ["Frank Herbert"],
            "imageUrl": "https://images.gr-assets.com/dune.jpg",
            "summary": "Set on the desert planet Arrakis.<br>Melange...",
            "publicationDate": "First published August 1, 1965",
            "genres": [["Science Fiction", 12345], ["Classics", 800]],
            "num_ratings": 1234567,
            "average_rating": "4.27",
            "num_pages": 896,
            "language": "English",
            "characters": "Paul Atreides, Duncan Idaho",
            "series": "Dune",
            "series_position": 1,
            "isbn13": "9780441172719"
        });
        let record = map_goodreads_payload(payload).unwrap();
        assert_eq!(record.title.as_deref(), Some("Dune"));
        assert_eq!(record.authors, vec!["Frank Herbert"]);
        assert_eq!(record.genres, vec!["Science Fiction", "Classics"]);
        assert_eq!(record.ratings_count.as_deref(), Some("1234567"));
        assert_eq!(record.average_rating.as_deref(), Some("4.27"));
        assert_eq!(record.number_of_pages.as_deref(), Some("896"));
        assert_eq!(record.characters, vec!["Paul Atreides", "Duncan Idaho"]);
        assert_eq!(record.series_name.as_deref(), Some("Dune"));
        assert_eq!(record.series_position, Some(RawSeriesPosition::Number(1.into())));
        assert_eq!(record.isbn.as_deref(), Some("9780441172719"));
        assert!(record.summary.unwrap().contains("<br>"));
    }

    #[test]
    fn test_combined_series_label_is_split() {
        let record = map_goodreads_payload(json!({
            "title": "Words of Radiance",
            "book_series": "(The Stormlight Archive #2)"
        }))
        .unwrap();
        assert_eq!(record.series_name.as_deref(), Some("The Stormlight Archive"));
        assert_eq!(record.series_position, Some(RawSeriesPosition::Text("2".into())));
    }

    #[test]
    fn test_series_without_position_keeps_name() {
        let mut record = RawExtractedRecord {
            series_name: Some("(Discworld)".into()),
            ..Default::default()
        };
        split_series_into_position(&mut record);
        assert_eq!(record.series_name.as_deref(), Some("Discworld"));
        assert!(record.series_position.is_none());
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let err = map_goodreads_payload(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, ScraperError::ExtractionFailed(_)));
    }

    #[test]
    fn test_empty_object_maps_to_empty_record() {
        let record = map_goodreads_payload(json!({})).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_dom_plan_reads_current_markup() {
        let html = r#"<html><body>
            <div class="BookCover__image"><img class="ResponsiveImage" src="https://img/cover.jpg"></div>
            <h1 data-testid="bookTitle">The Way of Kings</h1>
            <h3 class="Text__title3 Text__italic"><a href="https://www.goodreads.com/series/49075">The Stormlight Archive #1</a></h3>
            <div class="ContributorLinksList"><span tabindex="-1"><a class="ContributorLink" href="/author/show/38550"><span class="ContributorLink__name">Brandon Sanderson</span></a></span></div>
            <div class="RatingStatistics__rating">4.65</div>
            <span data-testid="ratingsCount">542,391&nbsp;ratings</span>
            <div data-testid="description"><span class="Formatted">Roshar is a world of stone.<br><br>Speak again.</span></div>
            <ul data-testid="genresList"><span class="Button__labelItem">Fantasy</span><span class="Button__labelItem">Epic Fantasy</span></ul>
            <p data-testid="pagesFormat">1007 pages, Hardcover</p>
            <p data-testid="publicationInfo">First published August 31, 2010</p>
            </body></html>"#;
        let record = parse_document(html, &GOODREADS_PLAN);
        assert_eq!(record.title.as_deref(), Some("The Way of Kings"));
        assert_eq!(record.image_url.as_deref(), Some("https://img/cover.jpg"));
        assert_eq!(record.authors, vec!["Brandon Sanderson"]);
        assert_eq!(record.genres, vec!["Fantasy", "Epic Fantasy"]);
        assert_eq!(record.average_rating.as_deref(), Some("4.65"));
        assert_eq!(record.ratings_count.as_deref(), Some("542,391 ratings"));
        assert_eq!(record.number_of_pages.as_deref(), Some("1007 pages, Hardcover"));
        assert_eq!(
            record.publication_date.as_deref(),
            Some("First published August 31, 2010")
        );
        assert_eq!(record.summary.as_deref(), Some("Roshar is a world of stone.\n\nSpeak again."));
        assert_eq!(record.series_name.as_deref(), Some("The Stormlight Archive"));
        assert_eq!(record.series_position, Some(RawSeriesPosition::Text("1".into())));
    }
}
