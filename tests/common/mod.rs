#![allow(dead_code)]

use async_trait::async_trait;
use book_scraper::apis::Extractor;
use book_scraper::app::ports::{HttpClientPort, HttpGetResult};
use book_scraper::common::error::{Result, ScraperError};
use book_scraper::common::types::{RawExtractedRecord, SourceVariant};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Canned extraction result with a call counter
pub struct StubExtractor {
    pub source: SourceVariant,
    pub record: RawExtractedRecord,
    pub failure: Option<String>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubExtractor {
    pub fn returning(source: SourceVariant, record: RawExtractedRecord) -> Self {
        Self {
            source,
            record,
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(source: SourceVariant, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::returning(source, RawExtractedRecord::default())
        }
    }

    pub fn slow(source: SourceVariant, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(source, RawExtractedRecord::default())
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    fn source(&self) -> SourceVariant {
        self.source
    }

    async fn extract(&self, _url: &str) -> Result<RawExtractedRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(ScraperError::ExtractionFailed(message.clone())),
            None => Ok(self.record.clone()),
        }
    }
}

/// Serves one fixed HTML page for every GET
pub struct StaticPage {
    pub status: u16,
    pub body: String,
}

#[async_trait]
impl HttpClientPort for StaticPage {
    async fn get(&self, _url: &str, _headers: &[(&str, &str)]) -> std::result::Result<HttpGetResult, String> {
        Ok(HttpGetResult {
            status: self.status,
            body: self.body.clone(),
            content_type: "text/html; charset=utf-8".to_string(),
        })
    }
}
