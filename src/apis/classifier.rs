use crate::common::constants::{FANDOM_HOST, GOODREADS_HOST};
use crate::common::error::{Result, ScraperError};
use crate::common::types::SourceVariant;
use reqwest::Url;

/// Known host suffixes, one per supported source
const SOURCE_HOSTS: &[(&str, SourceVariant)] = &[
    (GOODREADS_HOST, SourceVariant::Goodreads),
    (FANDOM_HOST, SourceVariant::Fandom),
];

/// Classify a book-page URL by its host. Anything unrecognised, including
/// strings that are not URLs at all, is `Unknown`.
pub fn classify_source(url: &str) -> SourceVariant {
    match Url::parse(url.trim()) {
        Ok(parsed) => parsed
            .host_str()
            .map(classify_host)
            .unwrap_or(SourceVariant::Unknown),
        Err(_) => SourceVariant::Unknown,
    }
}

fn classify_host(host: &str) -> SourceVariant {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    SOURCE_HOSTS
        .iter()
        .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{suffix}")))
        .map(|(_, variant)| *variant)
        .unwrap_or(SourceVariant::Unknown)
}

/// Validate that the input is an absolute http(s) URL with a host.
pub fn parse_source_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ScraperError::InvalidInput("url is required".to_string()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| ScraperError::InvalidInput(format!("'{trimmed}' is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ScraperError::InvalidInput(format!(
            "'{trimmed}' is not an http(s) URL"
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goodreads_book_page() {
        assert_eq!(
            classify_source("https://www.goodreads.com/book/show/12345"),
            SourceVariant::Goodreads
        );
        assert_eq!(
            classify_source("https://goodreads.com/book/show/1.Dune"),
            SourceVariant::Goodreads
        );
    }

    #[test]
    fn test_fandom_wiki_page() {
        assert_eq!(
            classify_source("https://some.fandom.com/wiki/Book"),
            SourceVariant::Fandom
        );
        assert_eq!(
            classify_source("https://HARRYPOTTER.FANDOM.COM/wiki/Philosopher%27s_Stone"),
            SourceVariant::Fandom
        );
    }

    #[test]
    fn test_other_hosts_are_unknown() {
        assert_eq!(classify_source("https://example.com/book/1"), SourceVariant::Unknown);
        assert_eq!(classify_source("https://notgoodreads.com/book"), SourceVariant::Unknown);
        assert_eq!(
            classify_source("https://goodreads.com.evil.org/book"),
            SourceVariant::Unknown
        );
        assert_eq!(classify_source("not a url"), SourceVariant::Unknown);
        assert_eq!(classify_source(""), SourceVariant::Unknown);
    }

    #[test]
    fn test_parse_source_url() {
        assert!(parse_source_url("https://www.goodreads.com/book/show/1").is_ok());
        assert!(matches!(
            parse_source_url("   "),
            Err(ScraperError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_source_url("ftp://goodreads.com/x"),
            Err(ScraperError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_source_url("goodreads.com/book"),
            Err(ScraperError::InvalidInput(_))
        ));
    }
}
