use crate::common::error::Result;
use crate::common::types::CatalogId;
use async_trait::async_trait;

// Fetch-side port. TLS, redirects and retries are the implementation's business.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> std::result::Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub body: String,
    /// Empty when the response carried no `Content-Type`
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Markup the DOM extractor can read. A missing content type gets the benefit of the doubt.
    pub fn is_markup(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        content_type.trim().is_empty() || content_type.contains("html") || content_type.contains("xml")
    }
}

/// Persistence collaborator for the catalog entities a book references.
///
/// `create_*` must refuse a duplicate name with `ScraperError::Conflict` rather than
/// inserting a second row; the reconciler relies on that to stay idempotent under races.
#[async_trait]
pub trait CatalogPort: Send + Sync {
    async fn find_author_by_name(&self, name: &str) -> Result<Option<CatalogId>>;
    async fn create_author(&self, name: &str) -> Result<CatalogId>;

    async fn find_genre_by_name(&self, name: &str) -> Result<Option<CatalogId>>;
    async fn create_genre(&self, name: &str) -> Result<CatalogId>;

    async fn find_series_by_name(&self, name: &str) -> Result<Option<CatalogId>>;
    async fn create_series(&self, name: &str) -> Result<CatalogId>;
}
