use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use indicatif::ProgressBar;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::convert::{OfficeConverter, is_convertible_extension};
use crate::embeddings::EmbeddingsClient;
use crate::pipeline::{IngestOutcome, IngestPipeline};
use crate::store::blocking::BlockingBridge;
use crate::store::status::{MetadataStore, StatusTracker};
use crate::store::vector::VectorWriter;

/// Open the metadata store, creating its parent directory on first use.
fn open_status_tracker(config: &Config, bridge: &Arc<BlockingBridge>) -> Result<StatusTracker> {
    if let Some(parent) = config.metadata_db_path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create metadata directory {}", parent.display())
        })?;
    }

    let db_path = config.metadata_db_path.clone();
    let store = bridge
        .call("metadata connect", MetadataStore::new(db_path))
        .ok_or_else(|| anyhow!("Failed to open metadata store"))?;

    Ok(StatusTracker::new(store, Arc::clone(bridge)))
}

/// Ingest the given uploaded files. This is the trigger adapter: each path
/// stands in for one new-file event carrying the file's bytes and name.
#[inline]
pub fn ingest(config: &Config, paths: &[std::path::PathBuf]) -> Result<()> {
    let bridge = Arc::new(BlockingBridge::new()?);
    let tracker = open_status_tracker(config, &bridge)?;
    let client = EmbeddingsClient::new(&config.embeddings);
    let pipeline = IngestPipeline::new(&tracker, &client);
    let converter = OfficeConverter::new();

    let progress = ProgressBar::new(paths.len() as u64);
    for path in paths {
        progress.set_message(path.display().to_string());
        if let Err(e) = ingest_one(config, &bridge, &pipeline, &converter, path) {
            // One bad file never stops the rest of the invocation.
            error!("Error ingesting {}: {:#}", path.display(), e);
            println!("Failed to ingest {}: {:#}", path.display(), e);
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(())
}

fn ingest_one(
    config: &Config,
    bridge: &Arc<BlockingBridge>,
    pipeline: &IngestPipeline<'_>,
    converter: &OfficeConverter,
    path: &Path,
) -> Result<()> {
    let original_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("Path has no file name: {}", path.display()))?;
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let content =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    info!("Trigger file: {}", original_name);

    // The pipeline accepts only PDF content; office documents are converted
    // first and ingested under the name of the PDF they became.
    let (file_name, pdf_bytes) = if extension == "pdf" {
        (original_name, content)
    } else if is_convertible_extension(&extension) {
        let pdf_bytes = converter
            .convert_to_pdf(&original_name, &content)
            .with_context(|| format!("Failed to convert {} to PDF", original_name))?;
        (format!("{}.pdf", original_name), pdf_bytes)
    } else {
        warn!("Unsupported file type, skipping: {}", original_name);
        println!("Skipping unsupported file: {}", original_name);
        return Ok(());
    };

    let outcome = pipeline.ingest_document(&file_name, &pdf_bytes, || {
        VectorWriter::connect(&config.vector_store, Arc::clone(bridge))
    })?;

    match outcome {
        IngestOutcome::Skipped => {
            println!("Already ingested: {}", file_name);
        }
        IngestOutcome::Processed(report) => {
            println!(
                "Ingested {}: {} pages, {}/{} chunks stored",
                report.file_name, report.pages, report.chunks_inserted, report.chunks_total
            );
            if report.chunks_embedding_failed > 0 {
                println!(
                    "  {} chunks failed embedding",
                    report.chunks_embedding_failed
                );
            }
            if report.chunks_insert_failed > 0 {
                println!("  {} chunks failed insertion", report.chunks_insert_failed);
            }
            if report.aborted {
                println!("  Processing was aborted before the last chunk");
            }
        }
    }

    Ok(())
}

/// List the file names known to the metadata store.
#[inline]
pub fn list_files(config: &Config) -> Result<()> {
    let bridge = Arc::new(BlockingBridge::new()?);
    let tracker = open_status_tracker(config, &bridge)?;

    let file_names = tracker.file_names();
    if file_names.is_empty() {
        println!("No files have been ingested yet.");
        return Ok(());
    }

    for file_name in &file_names {
        println!("{}", file_name);
    }
    println!();
    println!("{} files total", file_names.len());

    Ok(())
}

/// Show per-file chunk status counts.
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    let bridge = Arc::new(BlockingBridge::new()?);
    let tracker = open_status_tracker(config, &bridge)?;

    let summaries = tracker.file_summaries();
    if summaries.is_empty() {
        println!("No files have been ingested yet.");
        return Ok(());
    }

    for summary in &summaries {
        println!(
            "{}: {} chunks, {} completed, {} unfinished",
            summary.file_name,
            summary.total_chunks,
            summary.completed_chunks,
            summary.unfinished_chunks()
        );
    }

    Ok(())
}

/// Delete every record of the given files from both stores.
#[inline]
pub fn delete_files(config: &Config, file_names: &[String], skip_confirm: bool) -> Result<()> {
    if file_names.is_empty() {
        return Ok(());
    }

    if !skip_confirm {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Delete all records for {} file(s)? This cannot be undone.",
                file_names.len()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let bridge = Arc::new(BlockingBridge::new()?);
    let tracker = open_status_tracker(config, &bridge)?;

    let status_deleted = tracker.delete_by_file_names(file_names);
    println!("Deleted {} status records", status_deleted);

    let writer = VectorWriter::connect(&config.vector_store, Arc::clone(&bridge))?;
    match writer.delete_by_file_names(file_names) {
        Some(vector_deleted) => println!("Deleted {} vector rows", vector_deleted),
        None => println!("Vector row deletion produced no result"),
    }

    Ok(())
}
