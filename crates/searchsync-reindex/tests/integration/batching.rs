//! Integration tests for batch processing and stale document removal.

use searchsync_core::{LogLevel, RecordClass, RecordKey};
use searchsync_index::{IndexOp, IndexWriter};
use searchsync_reindex::JobStatus;

use crate::common::{TestHarness, config, draft, file};

#[tokio::test]
async fn test_thousand_records_in_batches_of_one_hundred() {
    let harness = TestHarness::new(config(100));
    harness.add_pages(1..=1_000);

    let id = harness.scheduler.request("main", None).await.unwrap();
    assert_eq!(harness.scheduler.run_until_idle().await.unwrap(), 1);

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.cursors[0].last_key, Some(RecordKey::new(1_000)));
    assert!(job.cursors.iter().all(|c| c.done));
    assert_eq!(job.counters.processed_records, 1_000);
    assert_eq!(job.counters.indexed_documents, 2_000);
    assert_eq!(job.counters.completed_batches, 10);
    assert_eq!(harness.index.len(), 2_000, "Stage and Live per page");

    let upserts = harness
        .index
        .ops()
        .into_iter()
        .filter(|op| matches!(op, IndexOp::Upsert(_)))
        .count();
    assert_eq!(upserts, 10, "one upsert request per batch");
}

#[tokio::test]
async fn test_each_batch_clears_its_key_range_first() {
    let harness = TestHarness::new(config(2));
    harness.add_pages([1, 2, 3]);

    harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let ops = harness.index.ops();
    let labels: Vec<&str> = ops.iter().map(|op| op.label()).collect();
    assert_eq!(
        labels,
        vec![
            "delete_range", // SiteTree (, 2]
            "upsert",
            "delete_range", // SiteTree (2, 3]
            "upsert",
            "delete_range", // SiteTree tail
            "delete_range", // File tail
        ]
    );
    assert!(matches!(
        &ops[2],
        IndexOp::DeleteRange(range)
            if range.after == Some(RecordKey::new(2)) && range.through == Some(RecordKey::new(3))
    ));
    assert!(matches!(
        &ops[5],
        IndexOp::DeleteRange(range)
            if range.class == RecordClass::new("File") && !range.include_subclasses
    ));
}

#[tokio::test]
async fn test_documents_of_deleted_records_are_removed() {
    let harness = TestHarness::new(config(10));
    harness.add_pages(1..=30);
    harness.source.insert(file(5));
    harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();
    assert_eq!(harness.index.len(), 61);

    // One record inside the walked range, one at the tail, and the file
    harness.source.remove(&RecordClass::new("Page"), RecordKey::new(12));
    harness.source.remove(&RecordClass::new("Page"), RecordKey::new(30));
    harness.source.remove(&RecordClass::new("File"), RecordKey::new(5));

    harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    assert_eq!(harness.index.len(), 56);
    assert!(harness.documents_of(12).is_empty());
    assert!(harness.documents_of(30).is_empty());
    assert!(harness.documents_of(5).iter().all(|d| d.id.class.as_str() == "Page"));
}

#[tokio::test]
async fn test_unpublished_pages_lose_their_live_document() {
    let harness = TestHarness::new(config(50));
    harness.add_pages(1..=3);
    harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();
    assert_eq!(harness.documents_of(2).len(), 2);

    harness.source.insert(draft(2));
    harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let keys: Vec<String> = harness
        .documents_of(2)
        .iter()
        .map(|d| d.id.engine_key())
        .collect();
    assert_eq!(keys, vec!["2-Page-stage=Stage"]);
}

#[tokio::test]
async fn test_schema_rejects_do_not_block_completion() {
    let harness = TestHarness::new(config(10));
    harness.add_pages(1..=5);
    harness
        .source
        .insert(crate::common::page(3).with_field("Sort", "third"));

    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.counters.failed_documents, 2);
    assert_eq!(job.counters.indexed_documents, 8);
    assert!(harness.documents_of(3).is_empty());
    assert!(
        harness
            .logs
            .lines_at_least(LogLevel::Warn)
            .iter()
            .any(|l| l.message.contains("document rejected"))
    );
}

#[tokio::test]
async fn test_batch_logs_carry_replayable_query() {
    let harness = TestHarness::new(config(100));
    harness.add_pages(1..=150);
    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let lines = harness.logs.lines();
    assert!(lines.iter().all(|l| l.logger == format!("job:{id}")));
    let done: Vec<&str> = lines
        .iter()
        .filter(|l| l.message.starts_with("batch done"))
        .map(|l| l.message.as_str())
        .collect();
    assert_eq!(done.len(), 2);
    assert!(done[1].contains(r#"ClassHierarchy:"SiteTree" AND ID:{100 TO 150]"#));
    assert!(done[1].contains("50 records"));
}

#[tokio::test]
async fn test_unknown_index_request_is_rejected() {
    let harness = TestHarness::new(config(10));
    let err = harness.scheduler.request("missing", None).await.unwrap_err();
    assert!(matches!(err, searchsync_core::Error::UnknownIndex { .. }));
    assert!(harness.scheduler.list().await.unwrap().is_empty());
    assert_eq!(harness.index.name(), "main");
}
