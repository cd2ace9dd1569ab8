
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunking::{PageChunk, chunk_pages};
use crate::embeddings::Embedder;
use crate::extract::{PageText, extract_pdf_pages};
use crate::store::status::{ChunkStatus, StatusTracker};
use crate::store::vector::VectorSink;

/// Total embedding-service attempts per chunk, first try included.
pub const MAX_EMBEDDING_ATTEMPTS: u32 = 3;

/// Fixed pause between embedding attempts.
const EMBEDDING_RETRY_DELAY: Duration = Duration::from_secs(10);

/// What happened to one chunk. Failure stays visible here even though the
/// persisted terminal status is `COMPLETED` either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Inserted,
    EmbeddingFailed,
    InsertFailed,
}

/// Result of one document run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The dedup check found an existing record for the file name; nothing
    /// was touched.
    Skipped,
    Processed(IngestReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub file_name: String,
    pub pages: usize,
    pub chunks_total: usize,
    pub chunks_inserted: usize,
    pub chunks_embedding_failed: usize,
    pub chunks_insert_failed: usize,
    /// True when an unexpected error cut the chunk loop short; the counted
    /// chunks were still committed.
    pub aborted: bool,
}

impl IngestReport {
    fn new(file_name: &str, pages: usize, chunks_total: usize) -> Self {
        Self {
            file_name: file_name.to_string(),
            pages,
            chunks_total,
            chunks_inserted: 0,
            chunks_embedding_failed: 0,
            chunks_insert_failed: 0,
            aborted: false,
        }
    }

    fn record(&mut self, outcome: ChunkOutcome) {
        match outcome {
            ChunkOutcome::Inserted => self.chunks_inserted += 1,
            ChunkOutcome::EmbeddingFailed => self.chunks_embedding_failed += 1,
            ChunkOutcome::InsertFailed => self.chunks_insert_failed += 1,
        }
    }
}

/// Sequences one document through dedup, chunking, embedding and storage.
/// Strictly sequential: within a chunk the order create → embed → write →
/// terminal update is guaranteed, and chunks never run in parallel.
pub struct IngestPipeline<'a> {
    status: &'a StatusTracker,
    embedder: &'a dyn Embedder,
    retry_delay: Duration,
}

impl<'a> IngestPipeline<'a> {
    #[inline]
    pub fn new(status: &'a StatusTracker, embedder: &'a dyn Embedder) -> Self {
        Self {
            status,
            embedder,
            retry_delay: EMBEDDING_RETRY_DELAY,
        }
    }

    #[inline]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Ingest one uploaded PDF: extract pages, then run them through
    /// [`Self::ingest_pages`].
    #[inline]
    pub fn ingest_document<S, F>(
        &self,
        file_name: &str,
        content: &[u8],
        open_sink: F,
    ) -> Result<IngestOutcome>
    where
        S: VectorSink,
        F: FnOnce() -> Result<S>,
    {
        if self.status.is_registered(file_name) {
            info!("Already registered file: {}", file_name);
            return Ok(IngestOutcome::Skipped);
        }

        let pages = extract_pdf_pages(content)
            .with_context(|| format!("Failed to extract pages from {}", file_name))?;

        self.run_pages(file_name, &pages, open_sink)
    }

    /// Ingest already-extracted pages. Split out so the page source stays a
    /// replaceable collaborator.
    #[inline]
    pub fn ingest_pages<S, F>(
        &self,
        file_name: &str,
        pages: &[PageText],
        open_sink: F,
    ) -> Result<IngestOutcome>
    where
        S: VectorSink,
        F: FnOnce() -> Result<S>,
    {
        if self.status.is_registered(file_name) {
            info!("Already registered file: {}", file_name);
            return Ok(IngestOutcome::Skipped);
        }

        self.run_pages(file_name, pages, open_sink)
    }

    fn run_pages<S, F>(
        &self,
        file_name: &str,
        pages: &[PageText],
        open_sink: F,
    ) -> Result<IngestOutcome>
    where
        S: VectorSink,
        F: FnOnce() -> Result<S>,
    {
        let chunks = chunk_pages(pages);
        let mut report = IngestReport::new(file_name, pages.len(), chunks.len());

        if chunks.is_empty() {
            warn!("No text chunks produced for {}", file_name);
            return Ok(IngestOutcome::Processed(report));
        }

        // The document-scoped connection: opened only once dedup and
        // chunking have decided there is work to do, dropped with the sink
        // when the document ends.
        let sink = open_sink().context("Failed to open document vector connection")?;

        for chunk in &chunks {
            match self.process_chunk(&sink, file_name, chunk) {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    // Unexpected failure: abort the remaining chunks.
                    // Already-committed rows and status records stay as-is.
                    error!(
                        "Aborting remaining chunks of {}: {:#}",
                        file_name, e
                    );
                    report.aborted = true;
                    break;
                }
            }
        }

        info!(
            "Ingested {}: {}/{} chunks stored",
            file_name, report.chunks_inserted, report.chunks_total
        );
        Ok(IngestOutcome::Processed(report))
    }

    /// One chunk, strictly ordered: create the status record, embed, write
    /// the vector row, then unconditionally mark the record `COMPLETED`,
    /// overwriting `FAILED_DB_INSERTION` when the write failed.
    fn process_chunk(
        &self,
        sink: &dyn VectorSink,
        file_name: &str,
        chunk: &PageChunk,
    ) -> Result<ChunkOutcome> {
        let id = Uuid::new_v4();
        let id_text = id.to_string();

        if self
            .status
            .create(
                &id_text,
                file_name,
                ChunkStatus::PageSeparateFinished,
                chunk.page_number,
            )
            .is_none()
        {
            warn!("Status record for chunk {} was not created", id_text);
        }

        let embedding = self.invoke_embedding(&id_text, &chunk.text);

        let outcome = if embedding.is_empty() {
            // All attempts failed (or the service returned no data); skip
            // the write without recording an insertion status.
            ChunkOutcome::EmbeddingFailed
        } else if sink.insert_chunk(id, embedding, &chunk.text, file_name, chunk.page_number) {
            self.status
                .update_status(&id_text, ChunkStatus::FinishDbInsertion);
            ChunkOutcome::Inserted
        } else {
            self.status
                .update_status(&id_text, ChunkStatus::FailedDbInsertion);
            ChunkOutcome::InsertFailed
        };

        self.status.update_status(&id_text, ChunkStatus::Completed);
        Ok(outcome)
    }

    /// Bounded-retry embedding invocation. An empty vector means every
    /// attempt failed; it is never an error.
    fn invoke_embedding(&self, id: &str, text: &str) -> Vec<f32> {
        for attempt in 1..=MAX_EMBEDDING_ATTEMPTS {
            match self.embedder.embed(text) {
                Ok(embedding) => {
                    self.status
                        .update_status(id, ChunkStatus::FinishOaiInvocation);
                    return embedding;
                }
                Err(e) => {
                    error!(
                        "Embedding attempt {}/{} failed for chunk {}: {:#}",
                        attempt, MAX_EMBEDDING_ATTEMPTS, id, e
                    );
                    if attempt < MAX_EMBEDDING_ATTEMPTS {
                        self.status
                            .update_status(id, ChunkStatus::RetryOaiInvocation);
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        Vec::new()
    }
}
