pub mod classifier;
pub mod dom;
pub mod factory;
pub mod fandom;
pub mod goodreads;
pub mod subprocess;

use crate::common::error::Result;
use crate::common::types::{RawExtractedRecord, SourceVariant};
use async_trait::async_trait;

/// One strategy for pulling a raw record out of a book page.
///
/// Implementations may fail, time out or come back empty; an empty record is a
/// degraded success, not an error.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn source(&self) -> SourceVariant;

    /// Make the extractor ready for its first run (install dependencies and the like).
    /// Runs outside the extraction time bound; repeat calls after success are no-ops.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn extract(&self, url: &str) -> Result<RawExtractedRecord>;
}
