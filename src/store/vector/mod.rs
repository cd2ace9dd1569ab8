#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use crate::IngestError;
use crate::config::VectorStoreConfig;
use crate::store::blocking::BlockingBridge;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The seam between the orchestrator and the vector store: insert one chunk
/// row, report plain success or failure. The orchestrator turns the answer
/// into the insertion status.
pub trait VectorSink {
    fn insert_chunk(
        &self,
        id: Uuid,
        embedding: Vec<f32>,
        origin_text: &str,
        file_name: &str,
        page_number: i64,
    ) -> bool;
}

/// Writer over the relational vector store. Holds the document-scoped
/// connection: the pool is capped at a single connection, created by the
/// orchestrator when a document starts and dropped when it ends. Each chunk
/// row is committed in its own explicit transaction; there is no multi-chunk
/// atomicity.
#[derive(Debug, Clone)]
pub struct VectorWriter {
    pool: PgPool,
    table_name: String,
    bridge: Arc<BlockingBridge>,
}

impl VectorWriter {
    /// Open the document-scoped connection and make sure the target table
    /// exists.
    #[inline]
    pub fn connect(config: &VectorStoreConfig, bridge: Arc<BlockingBridge>) -> Result<Self> {
        let url = config.url.clone();
        let pool = bridge
            .call("vector connect", async move {
                PgPoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(CONNECT_TIMEOUT)
                    .connect(&url)
                    .await
                    .context("Failed to connect to vector store")
            })
            .ok_or_else(|| {
                IngestError::Store("Vector store connection produced no result".to_string())
            })?;

        let writer = Self {
            pool,
            table_name: config.table_name.clone(),
            bridge,
        };
        writer.ensure_schema()?;
        Ok(writer)
    }

    fn ensure_schema(&self) -> Result<()> {
        let pool = self.pool.clone();
        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                embedding VECTOR NOT NULL,
                origin_text TEXT NOT NULL,
                file_name TEXT NOT NULL,
                page_number BIGINT NOT NULL
            )",
            self.table_name
        );

        self.bridge
            .call("vector schema", async move {
                let extension: Option<(String,)> =
                    sqlx::query_as("SELECT extname FROM pg_extension WHERE extname = 'vector'")
                        .fetch_optional(&pool)
                        .await
                        .context("Failed to check pgvector extension")?;
                if extension.is_none() {
                    return Err(anyhow!(
                        "pgvector extension is not installed. Run: CREATE EXTENSION vector;"
                    ));
                }

                sqlx::query(&create_table)
                    .execute(&pool)
                    .await
                    .context("Failed to create vector table")?;
                Ok(())
            })
            .ok_or_else(|| anyhow!("Vector store schema check produced no result"))
    }

    /// Maintenance: delete every row belonging to the given file names.
    /// Returns the deleted count, `None` when the call yields no result.
    #[inline]
    pub fn delete_by_file_names(&self, file_names: &[String]) -> Option<u64> {
        let pool = self.pool.clone();
        let sql = format!("DELETE FROM {} WHERE file_name = ANY($1)", self.table_name);
        let file_names = file_names.to_vec();

        let deleted = self.bridge.call("vector delete", async move {
            let result = sqlx::query(&sql)
                .bind(&file_names)
                .execute(&pool)
                .await
                .context("Failed to delete vector rows")?;
            Ok(result.rows_affected())
        })?;

        info!("Deleted {} vector rows", deleted);
        Some(deleted)
    }
}

impl VectorSink for VectorWriter {
    /// One parameterized insert inside an explicit transaction, committed
    /// immediately.
    #[inline]
    fn insert_chunk(
        &self,
        id: Uuid,
        embedding: Vec<f32>,
        origin_text: &str,
        file_name: &str,
        page_number: i64,
    ) -> bool {
        debug!(
            "Inserting vector row {} ({}, page {})",
            id, file_name, page_number
        );

        let pool = self.pool.clone();
        let sql = format!(
            "INSERT INTO {} (id, embedding, origin_text, file_name, page_number)
             VALUES ($1, $2, $3, $4, $5)",
            self.table_name
        );
        let origin_text = origin_text.to_string();
        let file_name = file_name.to_string();

        self.bridge
            .call("vector insert", async move {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                sqlx::query(&sql)
                    .bind(id)
                    .bind(Vector::from(embedding))
                    .bind(&origin_text)
                    .bind(&file_name)
                    .bind(page_number)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to insert chunk row")?;
                tx.commit().await.context("Failed to commit chunk row")?;
                Ok(())
            })
            .is_some()
    }
}
