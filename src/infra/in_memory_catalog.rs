use crate::app::ports::CatalogPort;
use crate::common::error::{Result, ScraperError};
use crate::common::types::{CatalogId, EntityKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

type Table = Arc<Mutex<HashMap<Uuid, String>>>;

/// In-memory catalog for previews, tests and runs without a configured database.
///
/// Uniqueness is checked and the row inserted under one lock, so concurrent creates of
/// the same name see `Conflict` exactly like a UNIQUE constraint would report it.
pub struct InMemoryCatalog {
    authors: Table,
    genres: Table,
    series: Table,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            authors: Arc::new(Mutex::new(HashMap::new())),
            genres: Arc::new(Mutex::new(HashMap::new())),
            series: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn table(&self, kind: EntityKind) -> &Table {
        match kind {
            EntityKind::Author => &self.authors,
            EntityKind::Genre => &self.genres,
            EntityKind::Series => &self.series,
        }
    }

    fn lock(&self, kind: EntityKind) -> Result<MutexGuard<'_, HashMap<Uuid, String>>> {
        self.table(kind).lock().map_err(|_| ScraperError::Storage {
            message: format!("{} table lock poisoned", kind.as_str()),
        })
    }

    fn find(&self, kind: EntityKind, name: &str) -> Result<Option<CatalogId>> {
        let rows = self.lock(kind)?;
        Ok(rows
            .iter()
            .find(|(_, existing)| same_name(kind, existing, name))
            .map(|(id, _)| *id))
    }

    fn create(&self, kind: EntityKind, name: &str) -> Result<CatalogId> {
        let mut rows = self.lock(kind)?;
        if rows.values().any(|existing| same_name(kind, existing, name)) {
            return Err(ScraperError::Conflict {
                entity: kind.as_str(),
                name: name.to_string(),
            });
        }
        let id = Uuid::new_v4();
        rows.insert(id, name.to_string());
        debug!("Created {}: {} with id {}", kind.as_str(), name, id);
        Ok(id)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.lock(kind).map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn author_count(&self) -> usize {
        self.count(EntityKind::Author)
    }
}

/// Genres match case-insensitively; authors and series match exactly
fn same_name(kind: EntityKind, existing: &str, candidate: &str) -> bool {
    match kind {
        EntityKind::Genre => existing.to_lowercase() == candidate.to_lowercase(),
        EntityKind::Author | EntityKind::Series => existing == candidate,
    }
}

#[async_trait]
impl CatalogPort for InMemoryCatalog {
    async fn find_author_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
        self.find(EntityKind::Author, name)
    }

    async fn create_author(&self, name: &str) -> Result<CatalogId> {
        self.create(EntityKind::Author, name)
    }

    async fn find_genre_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
        self.find(EntityKind::Genre, name)
    }

    async fn create_genre(&self, name: &str) -> Result<CatalogId> {
        self.create(EntityKind::Genre, name)
    }

    async fn find_series_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
        self.find(EntityKind::Series, name)
    }

    async fn create_series(&self, name: &str) -> Result<CatalogId> {
        self.create(EntityKind::Series, name)
    }
}
