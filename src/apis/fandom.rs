//! Fandom wiki book pages.
//!
//! Book articles carry a portable infobox (`aside.portable-infobox`) whose rows are
//! keyed by `data-source`. Wikis name the same row differently, hence the long
//! fallback lists.

use crate::apis::dom::{
    attr, each, multiline, paragraphs, split, text, SelectorPlan, LIST_SEPARATORS,
    NAME_SEPARATORS,
};

/// Lead paragraphs kept when a page has no infobox summary row
const LEAD_PARAGRAPHS: usize = 3;

pub static FANDOM_PLAN: SelectorPlan = SelectorPlan {
    title: &[
        text("aside.portable-infobox h2.pi-title"),
        text("h1.page-header__title"),
        text("h1#firstHeading"),
        attr("meta[property=\"og:title\"]", "content"),
    ],
    image_url: &[
        attr("aside.portable-infobox img.pi-image-thumbnail", "src"),
        attr("aside.portable-infobox figure.pi-image img", "src"),
        attr("meta[property=\"og:image\"]", "content"),
    ],
    summary: &[
        multiline("[data-source=\"summary\"] .pi-data-value"),
        multiline("[data-source=\"blurb\"] .pi-data-value"),
        paragraphs(".mw-parser-output > p", LEAD_PARAGRAPHS),
        attr("meta[name=\"description\"]", "content"),
        attr("meta[property=\"og:description\"]", "content"),
    ],
    publication_date: &[
        text("[data-source=\"release_date\"] .pi-data-value"),
        text("[data-source=\"released\"] .pi-data-value"),
        text("[data-source=\"publication_date\"] .pi-data-value"),
        text("[data-source=\"published\"] .pi-data-value"),
        text("[data-source=\"date\"] .pi-data-value"),
    ],
    publication_date_raw: &[text("[data-source=\"year\"] .pi-data-value")],
    publisher: &[
        text("[data-source=\"publisher\"] .pi-data-value"),
        text("[data-source=\"publishers\"] .pi-data-value"),
    ],
    authors: &[
        each("[data-source=\"author\"] .pi-data-value a"),
        split("[data-source=\"author\"] .pi-data-value", NAME_SEPARATORS),
        each("[data-source=\"authors\"] .pi-data-value a"),
        split("[data-source=\"authors\"] .pi-data-value", NAME_SEPARATORS),
        split("[data-source=\"writer\"] .pi-data-value", NAME_SEPARATORS),
    ],
    genres: &[
        each("[data-source=\"genre\"] .pi-data-value a"),
        split("[data-source=\"genre\"] .pi-data-value", LIST_SEPARATORS),
        split("[data-source=\"genres\"] .pi-data-value", LIST_SEPARATORS),
    ],
    ratings_count: &[],
    average_rating: &[],
    number_of_pages: &[
        text("[data-source=\"pages\"] .pi-data-value"),
        text("[data-source=\"page_count\"] .pi-data-value"),
        text("[data-source=\"length\"] .pi-data-value"),
    ],
    language: &[text("[data-source=\"language\"] .pi-data-value")],
    characters: &[
        each("[data-source=\"characters\"] .pi-data-value a"),
        split("[data-source=\"characters\"] .pi-data-value", LIST_SEPARATORS),
    ],
    series_name: &[
        text("[data-source=\"series\"] .pi-data-value"),
        text("[data-source=\"followed_series\"] .pi-data-value"),
    ],
    series_position: &[
        text("[data-source=\"number\"] .pi-data-value"),
        text("[data-source=\"book_number\"] .pi-data-value"),
        text("[data-source=\"volume\"] .pi-data-value"),
    ],
    isbn: &[text("[data-source=\"isbn\"] .pi-data-value")],
    post_process: None,
};
