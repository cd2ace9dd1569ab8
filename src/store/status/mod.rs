#[cfg(test)]
mod tests;

pub mod models;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, warn};

use crate::store::blocking::BlockingBridge;

pub use models::{ChunkStatus, FileStatusSummary, StatusRecord};

pub type DbPool = Pool<Sqlite>;

/// Async operations against the metadata store holding one status record per
/// chunk. All pipeline access goes through [`StatusTracker`], which bridges
/// these into bounded synchronous calls.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    pool: DbPool,
}

impl MetadataStore {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to open metadata store")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        info!("Ensuring metadata store schema");

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunk_status (
                id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                status TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create chunk_status table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunk_status_file_name
             ON chunk_status (file_name)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create file name index")?;

        Ok(())
    }

    /// Grouped existence query: does any record carry this file name?
    pub async fn any_with_file_name(&self, file_name: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT file_name FROM chunk_status WHERE file_name = ? GROUP BY file_name",
        )
        .bind(file_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query records by file name")?;

        Ok(row.is_some())
    }

    pub async fn insert(&self, record: &StatusRecord) -> Result<StatusRecord> {
        debug!("Creating status record: {} ({})", record.id, record.status);

        sqlx::query(
            "INSERT INTO chunk_status (id, file_name, status, page_number, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.file_name)
        .bind(record.status)
        .bind(record.page_number)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create status record")?;

        self.fetch(&record.id)
            .await?
            .ok_or_else(|| anyhow!("Failed to read back created status record"))
    }

    pub async fn fetch(&self, id: &str) -> Result<Option<StatusRecord>> {
        let record = sqlx::query_as::<_, StatusRecord>(
            "SELECT id, file_name, status, page_number, created_at, updated_at
             FROM chunk_status WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read status record")?;

        Ok(record)
    }

    /// Point replace by id. Returns false when the id is unknown.
    pub async fn replace(&self, record: &StatusRecord) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE chunk_status
             SET file_name = ?, status = ?, page_number = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&record.file_name)
        .bind(record.status)
        .bind(record.page_number)
        .bind(record.updated_at)
        .bind(&record.id)
        .execute(&self.pool)
        .await
        .context("Failed to replace status record")?;

        Ok(result.rows_affected() > 0)
    }

    /// Distinct file names known to the store, for the maintenance surface.
    pub async fn distinct_file_names(&self) -> Result<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT file_name FROM chunk_status GROUP BY file_name ORDER BY file_name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list file names")?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    /// Per-file rollup of total vs terminal chunk counts, ordered by file
    /// name.
    pub async fn file_status_summaries(&self) -> Result<Vec<FileStatusSummary>> {
        let summaries = sqlx::query_as::<_, FileStatusSummary>(
            "SELECT file_name,
                    COUNT(*) AS total_chunks,
                    SUM(CASE WHEN status = ? THEN 1 ELSE 0 END) AS completed_chunks
             FROM chunk_status
             GROUP BY file_name
             ORDER BY file_name",
        )
        .bind(ChunkStatus::Completed)
        .fetch_all(&self.pool)
        .await
        .context("Failed to summarize status records")?;

        Ok(summaries)
    }

    /// Bulk-delete every record belonging to the given file names. Returns
    /// the number of deleted records.
    pub async fn delete_by_file_names(&self, file_names: &[String]) -> Result<u64> {
        let mut deleted = 0;
        for file_name in file_names {
            let result = sqlx::query("DELETE FROM chunk_status WHERE file_name = ?")
                .bind(file_name)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to delete records for {}", file_name))?;
            deleted += result.rows_affected();
        }

        info!(
            "Deleted {} status records for {} file names",
            deleted,
            file_names.len()
        );
        Ok(deleted)
    }
}

/// Synchronous facade over [`MetadataStore`] used by the pipeline. Every
/// operation is a bridged call with the bridge's bounded wait; an absent
/// result means the operation did not observably happen.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    store: MetadataStore,
    bridge: Arc<BlockingBridge>,
}

impl StatusTracker {
    #[inline]
    pub fn new(store: MetadataStore, bridge: Arc<BlockingBridge>) -> Self {
        Self { store, bridge }
    }

    /// The file-granularity dedup check: true once any chunk of the file has
    /// ever been recorded. False on timeout or store error.
    #[inline]
    pub fn is_registered(&self, file_name: &str) -> bool {
        let store = self.store.clone();
        let file_name = file_name.to_string();
        self.bridge
            .call("status lookup", async move {
                store.any_with_file_name(&file_name).await
            })
            .unwrap_or(false)
    }

    /// Insert a fresh record. `None` on timeout or store error; callers
    /// proceed regardless and later updates simply find no record.
    #[inline]
    pub fn create(
        &self,
        id: &str,
        file_name: &str,
        status: ChunkStatus,
        page_number: i64,
    ) -> Option<StatusRecord> {
        let record = StatusRecord::new(id, file_name, status, page_number);
        let store = self.store.clone();
        self.bridge
            .call("status create", async move { store.insert(&record).await })
    }

    /// Read-modify-write status replacement. Not atomic across the read and
    /// the write; each id is only ever touched by one sequential chunk
    /// pipeline.
    #[inline]
    pub fn update_status(&self, id: &str, status: ChunkStatus) -> bool {
        debug!("Updating status of {} to {}", id, status);

        let store = self.store.clone();
        let read_id = id.to_string();
        let existing = self
            .bridge
            .call("status read", async move { store.fetch(&read_id).await });

        let Some(Some(current)) = existing else {
            warn!("No status record found for {}, skipping update", id);
            return false;
        };

        let updated = current.with_status(status);
        let store = self.store.clone();
        self.bridge
            .call("status update", async move {
                store.replace(&updated).await
            })
            .unwrap_or(false)
    }

    /// Maintenance: distinct file names, empty on timeout or error.
    #[inline]
    pub fn file_names(&self) -> Vec<String> {
        let store = self.store.clone();
        self.bridge
            .call("file name listing", async move {
                store.distinct_file_names().await
            })
            .unwrap_or_default()
    }

    /// Maintenance: per-file status rollups, empty on timeout or error.
    #[inline]
    pub fn file_summaries(&self) -> Vec<FileStatusSummary> {
        let store = self.store.clone();
        self.bridge
            .call("status summary", async move {
                store.file_status_summaries().await
            })
            .unwrap_or_default()
    }

    /// Maintenance: bulk delete by file names. Returns the deleted count, 0
    /// on timeout or error.
    #[inline]
    pub fn delete_by_file_names(&self, file_names: &[String]) -> u64 {
        let store = self.store.clone();
        let file_names = file_names.to_vec();
        self.bridge
            .call("status delete", async move {
                store.delete_by_file_names(&file_names).await
            })
            .unwrap_or(0)
    }
}
