use crate::app::ports::CatalogPort;
use crate::common::error::{Result, ScraperError};
use crate::common::types::{CatalogId, EntityKind};
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = r#"
    PRAGMA journal_mode=WAL;
    CREATE TABLE IF NOT EXISTS authors (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        created_at  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS genres (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL COLLATE NOCASE UNIQUE,
        created_at  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS series (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        created_at  TEXT NOT NULL
    );
"#;

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Author => "authors",
        EntityKind::Genre => "genres",
        EntityKind::Series => "series",
    }
}

/// SQLite-backed catalog. Name uniqueness lives in the schema, so a create that
/// loses a race surfaces as `ScraperError::Conflict`.
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("Opened catalog database at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a statement on the blocking pool; the connection lock never spans an await.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| ScraperError::Storage {
                message: "catalog connection lock poisoned".to_string(),
            })?;
            f(&guard)
        })
        .await
        .map_err(|e| ScraperError::Storage {
            message: format!("catalog task failed: {e}"),
        })?
    }

    async fn find(&self, kind: EntityKind, name: &str) -> Result<Option<CatalogId>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let sql = format!("SELECT id FROM {} WHERE name = ?1", table_name(kind));
            let id: Option<String> = conn
                .query_row(&sql, params![name], |row| row.get(0))
                .optional()?;
            id.map(|id| parse_id(&id)).transpose()
        })
        .await
    }

    async fn create(&self, kind: EntityKind, name: &str) -> Result<CatalogId> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let id = Uuid::new_v4();
            let sql = format!(
                "INSERT INTO {} (id, name, created_at) VALUES (?1, ?2, ?3)",
                table_name(kind)
            );
            let inserted = conn.execute(
                &sql,
                params![id.to_string(), name, chrono::Utc::now().to_rfc3339()],
            );
            match inserted {
                Ok(_) => {
                    debug!("Created {}: {} with id {}", kind.as_str(), name, id);
                    Ok(id)
                }
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    Err(ScraperError::Conflict {
                        entity: kind.as_str(),
                        name,
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }
}

fn parse_id(id: &str) -> Result<CatalogId> {
    Uuid::parse_str(id).map_err(|e| ScraperError::Storage {
        message: format!("invalid catalog id '{id}': {e}"),
    })
}

#[async_trait]
impl CatalogPort for SqliteCatalog {
    async fn find_author_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
        self.find(EntityKind::Author, name).await
    }

    async fn create_author(&self, name: &str) -> Result<CatalogId> {
        self.create(EntityKind::Author, name).await
    }

    async fn find_genre_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
        self.find(EntityKind::Genre, name).await
    }

    async fn create_genre(&self, name: &str) -> Result<CatalogId> {
        self.create(EntityKind::Genre, name).await
    }

    async fn find_series_by_name(&self, name: &str) -> Result<Option<CatalogId>> {
        self.find(EntityKind::Series, name).await
    }

    async fn create_series(&self, name: &str) -> Result<CatalogId> {
        self.create(EntityKind::Series, name).await
    }
}
