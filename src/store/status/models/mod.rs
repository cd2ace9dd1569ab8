
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Per-chunk processing state, persisted as TEXT. The progression is
/// `PAGE_SEPARATE_FINISHED → (RETRY_OAI_INVOCATION)* → FINISH_OAI_INVOCATION
/// → FINISH_DB_INSERTION | FAILED_DB_INSERTION → COMPLETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkStatus {
    PageSeparateFinished,
    RetryOaiInvocation,
    FinishOaiInvocation,
    FinishDbInsertion,
    FailedDbInsertion,
    Completed,
}

impl ChunkStatus {
    /// The persisted TEXT form.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkStatus::PageSeparateFinished => "PAGE_SEPARATE_FINISHED",
            ChunkStatus::RetryOaiInvocation => "RETRY_OAI_INVOCATION",
            ChunkStatus::FinishOaiInvocation => "FINISH_OAI_INVOCATION",
            ChunkStatus::FinishDbInsertion => "FINISH_DB_INSERTION",
            ChunkStatus::FailedDbInsertion => "FAILED_DB_INSERTION",
            ChunkStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for ChunkStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status record per chunk. Created once, then mutated in place by
/// replacing the status; never deleted by the pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StatusRecord {
    /// Chunk-scoped id, shared with the chunk's vector row.
    pub id: String,
    /// The dedup key: any record with this file name marks the whole file
    /// as processed.
    pub file_name: String,
    pub status: ChunkStatus,
    pub page_number: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StatusRecord {
    #[inline]
    pub fn new(id: &str, file_name: &str, status: ChunkStatus, page_number: i64) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: id.to_string(),
            file_name: file_name.to_string(),
            status,
            page_number,
            created_at: now,
            updated_at: now,
        }
    }

    /// The same record with a replaced status, as written back by the
    /// read-modify-write update.
    #[inline]
    pub fn with_status(self, status: ChunkStatus) -> Self {
        Self {
            status,
            updated_at: Utc::now().naive_utc(),
            ..self
        }
    }
}

/// Per-file rollup of chunk statuses, for the operator status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileStatusSummary {
    pub file_name: String,
    pub total_chunks: i64,
    pub completed_chunks: i64,
}

impl FileStatusSummary {
    /// Chunks that never reached the terminal status.
    #[inline]
    pub fn unfinished_chunks(&self) -> i64 {
        self.total_chunks - self.completed_chunks
    }
}
