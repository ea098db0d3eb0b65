//! Dedup gate and persistence sink.
//!
//! The harvester only needs two things from its store: "have I seen this
//! natural key?" and "keep this record". [`PersistenceSink`] captures that
//! contract; [`SqliteStore`] backs it with one SQLite table holding a JSON
//! document per key.
//!
//! `exists` is a performance optimization, not the correctness boundary:
//! it is consulted before the expensive detail fetch, but the uniqueness
//! guarantee rests on the table's primary key together with the idempotent
//! `ON CONFLICT DO NOTHING` insert. A false negative costs one harmless
//! duplicate-insert attempt.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::errors::{SetupError, StoreError};
use crate::models::Record;

/// The store contract the crawl driver consumes.
///
/// `insert` must be safe to call with a natural key that is already
/// present; the sink treats that as a no-op.
pub trait PersistenceSink {
    async fn exists(&self, natural_key: &str) -> Result<bool, StoreError>;
    async fn insert(&self, record: &Record) -> Result<(), StoreError>;
}

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS records (
    natural_key  TEXT PRIMARY KEY,
    source       TEXT NOT NULL,
    document     TEXT NOT NULL,
    harvested_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

/// SQLite-backed record store: one JSON document per natural key.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and ensure the schema exists. Failure here is fatal; the
    /// run does not proceed without a store.
    #[instrument(level = "info", skip_all, fields(%database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, SetupError> {
        // One connection: the pipelines are sequential, and a larger pool
        // would hand each connection its own database under `::memory:`.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        info!("Record store ready");
        Ok(Self { pool })
    }

    /// Number of records currently persisted.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM records")
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}

impl PersistenceSink for SqliteStore {
    async fn exists(&self, natural_key: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM records WHERE natural_key = ?")
            .bind(natural_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        let document = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO records (natural_key, source, document) VALUES (?, ?, ?)
             ON CONFLICT(natural_key) DO NOTHING",
        )
        .bind(&record.natural_key)
        .bind(record.source.as_str())
        .bind(document)
        .execute(&self.pool)
        .await?;
        debug!(key = %record.natural_key, "Record stored");
        Ok(())
    }
}

/// In-memory sink for dry runs and tests.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<HashMap<String, Record>>,
}

impl MemorySink {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl PersistenceSink for MemorySink {
    async fn exists(&self, natural_key: &str) -> Result<bool, StoreError> {
        Ok(self.records.read().await.contains_key(natural_key))
    }

    async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records
            .entry(record.natural_key.clone())
            .or_insert_with(|| record.clone());
        Ok(())
    }
}
