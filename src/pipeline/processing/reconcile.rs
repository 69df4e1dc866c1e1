//! Free-text author/genre/series names → stable catalog identifiers.
//!
//! Lookup-then-create alone races when two runs import the same new name. The catalog
//! refuses duplicate creates with `ScraperError::Conflict`, and the reconciler answers a
//! conflict by refetching, so the loser of a race reuses the winner's row.

use crate::app::ports::CatalogPort;
use crate::common::constants::RECONCILE_MAX_ATTEMPTS;
use crate::common::error::{Result, ScraperError};
use crate::common::types::{
    CanonicalBookFields, CatalogId, EntityKind, ReconciledEntity, ReconciledEntityIds,
};
use crate::observability::metrics;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct EntityReconciler {
    catalog: Arc<dyn CatalogPort>,
}

impl EntityReconciler {
    pub fn new(catalog: Arc<dyn CatalogPort>) -> Self {
        Self { catalog }
    }

    async fn find(&self, kind: EntityKind, name: &str) -> Result<Option<CatalogId>> {
        match kind {
            EntityKind::Author => self.catalog.find_author_by_name(name).await,
            EntityKind::Genre => self.catalog.find_genre_by_name(name).await,
            EntityKind::Series => self.catalog.find_series_by_name(name).await,
        }
    }

    async fn create(&self, kind: EntityKind, name: &str) -> Result<CatalogId> {
        match kind {
            EntityKind::Author => self.catalog.create_author(name).await,
            EntityKind::Genre => self.catalog.create_genre(name).await,
            EntityKind::Series => self.catalog.create_series(name).await,
        }
    }

    /// Resolve one name, creating the entity if the catalog has never seen it
    pub async fn reconcile_name(&self, kind: EntityKind, name: &str) -> Result<ReconciledEntity> {
        for attempt in 1..=RECONCILE_MAX_ATTEMPTS {
            if let Some(id) = self.find(kind, name).await? {
                debug!("Reusing {} '{}' ({})", kind.as_str(), name, id);
                metrics::record_reconciled(kind, false);
                return Ok(ReconciledEntity {
                    name: name.to_string(),
                    id,
                    created: false,
                });
            }

            match self.create(kind, name).await {
                Ok(id) => {
                    info!("Created {} '{}' ({})", kind.as_str(), name, id);
                    metrics::record_reconciled(kind, true);
                    return Ok(ReconciledEntity {
                        name: name.to_string(),
                        id,
                        created: true,
                    });
                }
                Err(ScraperError::Conflict { .. }) => {
                    debug!(
                        "Concurrent create of {} '{}' (attempt {}), refetching",
                        kind.as_str(),
                        name,
                        attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Giving up on {} '{}' after {} attempts", kind.as_str(), name, RECONCILE_MAX_ATTEMPTS);
        Err(ScraperError::ReconciliationConflict(format!(
            "{} '{}' still conflicting after {} attempts",
            kind.as_str(),
            name,
            RECONCILE_MAX_ATTEMPTS
        )))
    }

    async fn reconcile_all(&self, kind: EntityKind, names: &[String]) -> Result<Vec<ReconciledEntity>> {
        let mut resolved = Vec::with_capacity(names.len());
        for name in unique_names(kind, names) {
            resolved.push(self.reconcile_name(kind, &name).await?);
        }
        Ok(resolved)
    }

    /// Resolve every author, genre and series name a book references
    #[instrument(skip(self, book), fields(title = %book.title))]
    pub async fn reconcile(&self, book: &CanonicalBookFields) -> Result<ReconciledEntityIds> {
        let authors = self.reconcile_all(EntityKind::Author, &book.authors).await?;
        let genres = self.reconcile_all(EntityKind::Genre, &book.genres).await?;
        let series = match book.series_name.as_deref() {
            Some(name) => Some(self.reconcile_name(EntityKind::Series, name).await?),
            None => None,
        };
        Ok(ReconciledEntityIds {
            authors,
            genres,
            series,
        })
    }
}

/// Trimmed, non-blank names with duplicates removed, first spelling kept.
/// Genres compare case-insensitively, matching how the catalog stores them.
fn unique_names(kind: EntityKind, names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| {
            let key = match kind {
                EntityKind::Genre => name.to_lowercase(),
                EntityKind::Author | EntityKind::Series => name.to_string(),
            };
            seen.insert(key)
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::SourceVariant;
    use crate::infra::in_memory_catalog::InMemoryCatalog;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn book() -> CanonicalBookFields {
        let mut fields = CanonicalBookFields::titled("Good Omens", SourceVariant::Goodreads, "https://x");
        fields.authors = vec!["Neil Gaiman".into(), "Terry Pratchett".into(), "Neil Gaiman".into()];
        fields.genres = vec!["Fantasy".into(), "fantasy".into(), "Humor".into()];
        fields.series_name = Some("Standalone".into());
        fields
    }

    #[tokio::test]
    async fn test_creates_then_reuses() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let reconciler = EntityReconciler::new(catalog.clone());

        let first = reconciler.reconcile(&book()).await.unwrap();
        assert_eq!(first.authors.len(), 2);
        assert_eq!(first.genres.len(), 2);
        assert!(first.authors.iter().all(|a| a.created));
        assert!(first.series.as_ref().unwrap().created);

        let second = reconciler.reconcile(&book()).await.unwrap();
        assert!(second.authors.iter().all(|a| !a.created));
        assert_eq!(first.authors[0].id, second.authors[0].id);
        assert_eq!(first.genres[1].id, second.genres[1].id);
        assert_eq!(catalog.author_count(), 2);
    }

    #[tokio::test]
    async fn test_genre_matches_existing_spelling_case_insensitively() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let existing = catalog.create_genre("Science Fiction").await.unwrap();
        let reconciler = EntityReconciler::new(catalog);

        let resolved = reconciler
            .reconcile_name(EntityKind::Genre, "science fiction")
            .await
            .unwrap();
        assert_eq!(resolved.id, existing);
        assert!(!resolved.created);
    }

    /// Misses on the first lookup, as if another run inserted the name in between
    struct LateRowCatalog {
        inner: InMemoryCatalog,
        author_lookups: AtomicUsize,
    }

    #[async_trait]
    impl CatalogPort for LateRowCatalog {
        async fn find_author_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
            if self.author_lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(None);
            }
            self.inner.find_author_by_name(name).await
        }
        async fn create_author(&self, name: &str) -> Result<CatalogId> {
            self.inner.create_author(name).await
        }
        async fn find_genre_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
            self.inner.find_genre_by_name(name).await
        }
        async fn create_genre(&self, name: &str) -> Result<CatalogId> {
            self.inner.create_genre(name).await
        }
        async fn find_series_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
            self.inner.find_series_by_name(name).await
        }
        async fn create_series(&self, name: &str) -> Result<CatalogId> {
            self.inner.create_series(name).await
        }
    }

    #[tokio::test]
    async fn test_conflict_on_create_refetches_winner() {
        let inner = InMemoryCatalog::new();
        let winner = inner.create_author("Ursula K. Le Guin").await.unwrap();
        let reconciler = EntityReconciler::new(Arc::new(LateRowCatalog {
            inner,
            author_lookups: AtomicUsize::new(0),
        }));

        let resolved = reconciler
            .reconcile_name(EntityKind::Author, "Ursula K. Le Guin")
            .await
            .unwrap();
        assert_eq!(resolved.id, winner);
        assert!(!resolved.created);
    }

    /// Every create conflicts and no lookup ever sees the row
    struct AlwaysConflicting;

    #[async_trait]
    impl CatalogPort for AlwaysConflicting {
        async fn find_author_by_name(&self, _name: &str) -> Result<Option<CatalogId>> {
            Ok(None)
        }
        async fn create_author(&self, name: &str) -> Result<CatalogId> {
            Err(ScraperError::Conflict {
                entity: "author",
                name: name.to_string(),
            })
        }
        async fn find_genre_by_name(&self, _name: &str) -> Result<Option<CatalogId>> {
            Ok(None)
        }
        async fn create_genre(&self, _name: &str) -> Result<CatalogId> {
            unreachable!()
        }
        async fn find_series_by_name(&self, _name: &str) -> Result<Option<CatalogId>> {
            Ok(None)
        }
        async fn create_series(&self, _name: &str) -> Result<CatalogId> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_persistent_conflict_is_reconciliation_conflict() {
        let reconciler = EntityReconciler::new(Arc::new(AlwaysConflicting));
        let err = reconciler
            .reconcile_name(EntityKind::Author, "Ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::ReconciliationConflict(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unique_names() {
        let names = vec![" Fantasy ".to_string(), "FANTASY".into(), "".into(), "Horror".into()];
        assert_eq!(unique_names(EntityKind::Genre, &names), vec!["Fantasy", "Horror"]);
        assert_eq!(
            unique_names(EntityKind::Author, &names),
            vec!["Fantasy", "FANTASY", "Horror"]
        );
    }
}
