#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests for the ingestion stack through the public API: the
// blocking bridge, the status tracker over a real SQLite store, and the
// chunker feeding it.

use std::sync::Arc;

use tempfile::TempDir;
use uuid::Uuid;

use pdf_ingest::chunking::{MAX_CHUNK_CHARS, chunk_pages};
use pdf_ingest::extract::{PageText, normalize_page_text};
use pdf_ingest::store::blocking::BlockingBridge;
use pdf_ingest::store::status::{ChunkStatus, MetadataStore, StatusTracker};

struct Setup {
    tracker: StatusTracker,
    _temp_dir: TempDir,
}

fn create_test_setup() -> Setup {
    let bridge = Arc::new(BlockingBridge::new().expect("should start bridge"));
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = bridge
        .call(
            "connect",
            MetadataStore::new(temp_dir.path().join("metadata.db")),
        )
        .expect("should open metadata store");

    Setup {
        tracker: StatusTracker::new(store, bridge),
        _temp_dir: temp_dir,
    }
}

#[test]
fn chunked_pages_register_one_record_each() {
    let setup = create_test_setup();
    let tracker = &setup.tracker;

    let raw = format!("First line.\nSecond   line.\n{}", "x".repeat(8000));
    let pages = vec![PageText {
        page_number: 1,
        text: normalize_page_text(&raw),
    }];
    let chunks = chunk_pages(&pages);
    assert_eq!(chunks.len(), 2);

    assert!(!tracker.is_registered("upload.pdf"));

    for chunk in &chunks {
        let id = Uuid::new_v4().to_string();
        let created = tracker.create(
            &id,
            "upload.pdf",
            ChunkStatus::PageSeparateFinished,
            chunk.page_number,
        );
        assert!(created.is_some());
    }

    assert!(tracker.is_registered("upload.pdf"));

    let summaries = tracker.file_summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_chunks, 2);
    assert_eq!(summaries[0].completed_chunks, 0);
}

#[test]
fn status_progression_to_terminal_state() {
    let setup = create_test_setup();
    let tracker = &setup.tracker;

    let id = Uuid::new_v4().to_string();
    tracker.create(&id, "upload.pdf", ChunkStatus::PageSeparateFinished, 1);

    for status in [
        ChunkStatus::FinishOaiInvocation,
        ChunkStatus::FinishDbInsertion,
        ChunkStatus::Completed,
    ] {
        assert!(tracker.update_status(&id, status));
    }

    let summaries = tracker.file_summaries();
    assert_eq!(summaries[0].completed_chunks, 1);
    assert_eq!(summaries[0].unfinished_chunks(), 0);
}

#[test]
fn maintenance_clears_a_file_completely() {
    let setup = create_test_setup();
    let tracker = &setup.tracker;

    for page in 1..=3 {
        let id = Uuid::new_v4().to_string();
        tracker.create(&id, "upload.pdf", ChunkStatus::Completed, page);
    }
    tracker.create(
        &Uuid::new_v4().to_string(),
        "other.pdf",
        ChunkStatus::Completed,
        1,
    );

    assert_eq!(
        tracker.file_names(),
        vec!["other.pdf".to_string(), "upload.pdf".to_string()]
    );

    assert_eq!(tracker.delete_by_file_names(&["upload.pdf".to_string()]), 3);
    assert!(!tracker.is_registered("upload.pdf"));
    assert!(tracker.is_registered("other.pdf"));
}

#[test]
fn oversized_page_chunks_within_bound() {
    let text = "The quick brown fox. ".repeat(800);
    let pages = vec![PageText {
        page_number: 1,
        text: text.trim_end().to_string(),
    }];

    let chunks = chunk_pages(&pages);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.text.chars().count() <= MAX_CHUNK_CHARS);
    }
    assert_eq!(
        chunks.iter().map(|c| c.text.as_str()).collect::<String>(),
        pages[0].text
    );
}
