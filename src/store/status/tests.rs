use super::*;
use std::time::Duration;
use tempfile::TempDir;

async fn create_test_store() -> anyhow::Result<(TempDir, MetadataStore)> {
    let temp_dir = TempDir::new()?;
    let store = MetadataStore::new(temp_dir.path().join("metadata.db")).await?;
    Ok((temp_dir, store))
}

#[tokio::test]
async fn schema_creation() -> anyhow::Result<()> {
    let (_temp_dir, store) = create_test_store().await?;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(store.pool())
    .await?;

    assert!(tables.contains(&"chunk_status".to_string()));
    Ok(())
}

#[tokio::test]
async fn dedup_lookup_by_file_name() -> anyhow::Result<()> {
    let (_temp_dir, store) = create_test_store().await?;

    assert!(!store.any_with_file_name("a.pdf").await?);

    let record = StatusRecord::new("id-1", "a.pdf", ChunkStatus::PageSeparateFinished, 1);
    store.insert(&record).await?;

    assert!(store.any_with_file_name("a.pdf").await?);
    assert!(!store.any_with_file_name("b.pdf").await?);

    // More chunks of the same file do not change the answer.
    let record = StatusRecord::new("id-2", "a.pdf", ChunkStatus::Completed, 2);
    store.insert(&record).await?;
    assert!(store.any_with_file_name("a.pdf").await?);

    // Deleting every record flips the answer back.
    store.delete_by_file_names(&["a.pdf".to_string()]).await?;
    assert!(!store.any_with_file_name("a.pdf").await?);

    Ok(())
}

#[tokio::test]
async fn insert_and_fetch_round_trip() -> anyhow::Result<()> {
    let (_temp_dir, store) = create_test_store().await?;

    let record = StatusRecord::new("id-1", "a.pdf", ChunkStatus::PageSeparateFinished, 4);
    let created = store.insert(&record).await?;
    assert_eq!(created.id, record.id);
    assert_eq!(created.status, record.status);

    let fetched = store.fetch("id-1").await?.expect("record should exist");
    assert_eq!(fetched.file_name, "a.pdf");
    assert_eq!(fetched.page_number, 4);
    assert_eq!(fetched.status, ChunkStatus::PageSeparateFinished);

    assert!(store.fetch("missing").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn replace_updates_status_in_place() -> anyhow::Result<()> {
    let (_temp_dir, store) = create_test_store().await?;

    let record = StatusRecord::new("id-1", "a.pdf", ChunkStatus::PageSeparateFinished, 1);
    store.insert(&record).await?;

    let replaced = store
        .replace(&record.clone().with_status(ChunkStatus::Completed))
        .await?;
    assert!(replaced);

    let fetched = store.fetch("id-1").await?.expect("record should exist");
    assert_eq!(fetched.status, ChunkStatus::Completed);

    let unknown = StatusRecord::new("missing", "a.pdf", ChunkStatus::Completed, 1);
    assert!(!store.replace(&unknown).await?);
    Ok(())
}

#[tokio::test]
async fn file_name_listing_and_summaries() -> anyhow::Result<()> {
    let (_temp_dir, store) = create_test_store().await?;

    for (id, file, status) in [
        ("1", "b.pdf", ChunkStatus::Completed),
        ("2", "a.pdf", ChunkStatus::Completed),
        ("3", "a.pdf", ChunkStatus::RetryOaiInvocation),
    ] {
        store
            .insert(&StatusRecord::new(id, file, status, 1))
            .await?;
    }

    assert_eq!(
        store.distinct_file_names().await?,
        vec!["a.pdf".to_string(), "b.pdf".to_string()]
    );

    let summaries = store.file_status_summaries().await?;
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].file_name, "a.pdf");
    assert_eq!(summaries[0].total_chunks, 2);
    assert_eq!(summaries[0].completed_chunks, 1);
    assert_eq!(summaries[0].unfinished_chunks(), 1);
    assert_eq!(summaries[1].file_name, "b.pdf");
    assert_eq!(summaries[1].completed_chunks, 1);

    Ok(())
}

#[tokio::test]
async fn bulk_delete_spans_multiple_file_names() -> anyhow::Result<()> {
    let (_temp_dir, store) = create_test_store().await?;

    for (id, file) in [("1", "a.pdf"), ("2", "a.pdf"), ("3", "b.pdf"), ("4", "c.pdf")] {
        store
            .insert(&StatusRecord::new(id, file, ChunkStatus::Completed, 1))
            .await?;
    }

    let deleted = store
        .delete_by_file_names(&["a.pdf".to_string(), "b.pdf".to_string()])
        .await?;
    assert_eq!(deleted, 3);

    assert_eq!(store.distinct_file_names().await?, vec!["c.pdf".to_string()]);
    Ok(())
}

// Tracker tests run on a plain thread, driving the store through the bridge
// exactly as the pipeline does.

struct TrackerHarness {
    tracker: StatusTracker,
    _temp_dir: TempDir,
}

fn create_test_tracker() -> TrackerHarness {
    let bridge = std::sync::Arc::new(BlockingBridge::new().expect("should start bridge"));
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("metadata.db");
    let store = bridge
        .call("connect", MetadataStore::new(db_path))
        .expect("should open metadata store");

    TrackerHarness {
        tracker: StatusTracker::new(store, bridge),
        _temp_dir: temp_dir,
    }
}

#[test]
fn tracker_registration_lifecycle() {
    let harness = create_test_tracker();
    let tracker = &harness.tracker;

    assert!(!tracker.is_registered("a.pdf"));

    let created = tracker.create("id-1", "a.pdf", ChunkStatus::PageSeparateFinished, 1);
    assert!(created.is_some());

    assert!(tracker.is_registered("a.pdf"));
    assert!(!tracker.is_registered("other.pdf"));
}

#[test]
fn tracker_update_status() {
    let harness = create_test_tracker();
    let tracker = &harness.tracker;

    tracker.create("id-1", "a.pdf", ChunkStatus::PageSeparateFinished, 1);

    assert!(tracker.update_status("id-1", ChunkStatus::FinishOaiInvocation));
    assert!(!tracker.update_status("unknown", ChunkStatus::Completed));

    let summaries = tracker.file_summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].completed_chunks, 0);

    assert!(tracker.update_status("id-1", ChunkStatus::Completed));
    let summaries = tracker.file_summaries();
    assert_eq!(summaries[0].completed_chunks, 1);
}

#[test]
fn tracker_create_rejects_duplicate_id() {
    let harness = create_test_tracker();
    let tracker = &harness.tracker;

    assert!(
        tracker
            .create("id-1", "a.pdf", ChunkStatus::PageSeparateFinished, 1)
            .is_some()
    );
    // The second insert violates the primary key; the bridge logs the store
    // error and yields no result.
    assert!(
        tracker
            .create("id-1", "a.pdf", ChunkStatus::PageSeparateFinished, 2)
            .is_none()
    );
}

#[test]
fn tracker_maintenance_surface() {
    let harness = create_test_tracker();
    let tracker = &harness.tracker;

    tracker.create("1", "a.pdf", ChunkStatus::Completed, 1);
    tracker.create("2", "b.pdf", ChunkStatus::Completed, 1);

    assert_eq!(
        tracker.file_names(),
        vec!["a.pdf".to_string(), "b.pdf".to_string()]
    );

    assert_eq!(tracker.delete_by_file_names(&["a.pdf".to_string()]), 1);
    assert_eq!(tracker.file_names(), vec!["b.pdf".to_string()]);
}

#[test]
fn tracker_times_out_to_absent_results() {
    let bridge = std::sync::Arc::new(
        BlockingBridge::new()
            .expect("should start bridge")
            .with_wait_timeout(Duration::from_nanos(1)),
    );
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("metadata.db");

    // Opening the store will not finish within a nanosecond wait; build it
    // with a patient bridge first, then hand it to the impatient one.
    let patient = BlockingBridge::new().expect("should start bridge");
    let store = patient
        .call("connect", MetadataStore::new(db_path))
        .expect("should open metadata store");

    let tracker = StatusTracker::new(store, bridge);

    // A wait this short degrades to "no result": lookups read false, creates
    // yield nothing, updates report failure. Nothing panics or raises.
    assert!(!tracker.is_registered("a.pdf"));
    assert!(
        tracker
            .create("id-1", "a.pdf", ChunkStatus::PageSeparateFinished, 1)
            .is_none()
    );
    assert!(!tracker.update_status("id-1", ChunkStatus::Completed));
}
