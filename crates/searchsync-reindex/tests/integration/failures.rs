//! Integration tests for batch retries, job failure and operator resume.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use searchsync_core::{Error, JobId, LogLevel, RecordKey, Result};
use searchsync_index::IndexOp;
use searchsync_reindex::{
    Backoff, JobQueue, JobStatus, MemoryJobQueue, ReindexConfig, ReindexJobState, ReindexScope,
    RetryPolicy,
};

use crate::common::{TestHarness, config};

/// Fails the upsert of the fifth batch of a hundred.
fn fail_fifth_batch(harness: &TestHarness, times: usize) {
    harness.index.failures().fail_when(times, |op| {
        matches!(op, IndexOp::Upsert(ids) if ids.first().is_some_and(|id| id.key.get() == 401))
    });
}

#[tokio::test]
async fn test_transient_failure_is_retried_and_job_completes() {
    let harness = TestHarness::new(config(100));
    harness.add_pages(1..=1_000);
    fail_fifth_batch(&harness, 2);

    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.cursors[0].last_key, Some(RecordKey::new(1_000)));
    assert_eq!(job.attempts, 0);
    assert_eq!(job.counters.processed_records, 1_000);
    assert_eq!(harness.index.len(), 2_000);
    assert_eq!(harness.index.failures().pending(), 0);

    let warnings = harness.logs.lines_at_least(LogLevel::Warn);
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].message.contains("attempt 1/3"));
}

#[tokio::test]
async fn test_exhausted_retries_fail_with_cursor_frozen() {
    let harness = TestHarness::new(config(100));
    harness.add_pages(1..=1_000);
    fail_fifth_batch(&harness, 3);

    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.cursors[0].last_key, Some(RecordKey::new(400)));
    assert!(!job.cursors[0].done);
    assert_eq!(job.attempts, 3);
    assert_eq!(job.counters.completed_batches, 4);
    assert!(job.last_error.as_deref().unwrap().contains("503"));
    assert_eq!(harness.index.len(), 800);

    // Failed jobs are not picked up again on their own
    assert!(harness.scheduler.dispatch_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_resume_continues_from_frozen_cursor() {
    let harness = TestHarness::new(config(100));
    harness.add_pages(1..=1_000);
    fail_fifth_batch(&harness, 3);

    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();
    harness.index.clear_ops();

    harness.scheduler.resume(&id).await.unwrap();
    assert_eq!(
        harness.scheduler.status(&id).await.unwrap().status,
        JobStatus::Pending
    );
    harness.scheduler.run_until_idle().await.unwrap();

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.counters.processed_records, 1_000);
    assert_eq!(job.slices, 2);
    assert_eq!(harness.index.len(), 2_000);

    let first_upsert = harness
        .index
        .ops()
        .into_iter()
        .find_map(|op| match op {
            IndexOp::Upsert(ids) => ids.first().map(|id| id.key.get()),
            _ => None,
        });
    assert_eq!(first_upsert, Some(401), "no batch before the cursor is redone");
}

#[tokio::test]
async fn test_resume_requires_failed_job() {
    let harness = TestHarness::new(config(10));
    harness.add_pages(1..=5);
    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let err = harness.scheduler.resume(&id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));

    let missing = harness
        .scheduler
        .resume(&searchsync_core::JobId::new())
        .await
        .unwrap_err();
    assert!(matches!(missing, Error::JobNotFound { .. }));
}

#[tokio::test]
async fn test_source_failures_are_retried() {
    let harness = TestHarness::new(config(100));
    harness.add_pages(1..=250);
    harness
        .source
        .failures()
        .fail_when(2, |q| q.after == Some(RecordKey::new(200)));

    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();
    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(harness.index.len(), 500);
}

#[tokio::test]
async fn test_variant_error_fails_job_without_retry() {
    let harness = TestHarness::with_subsites(config(10));
    harness.add_pages(1..=5);
    harness
        .source
        .insert(crate::common::page(3).with_field("subsite_id", "two"));

    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 0, "deterministic errors are not retried");
    assert_eq!(job.cursors[0].last_key, None);
    assert!(job.last_error.as_deref().unwrap().contains("subsite"));
}

#[tokio::test]
async fn test_corrupt_job_state_fails_the_job() {
    let harness = TestHarness::new(config(10));
    harness.add_pages(1..=5);

    let mut job = ReindexJobState::new(
        "main",
        ReindexScope::new(vec![searchsync_index::IndexedClass {
            class: "SiteTree".into(),
            include_subclasses: true,
        }]),
    );
    job.cursors[0].class = "Member".into();
    harness.queue.enqueue(&job).await.unwrap();

    let dispatched = harness.scheduler.dispatch_next().await.unwrap();
    assert_eq!(dispatched, Some((job.id, JobStatus::Failed)));

    let stored = harness.scheduler.status(&job.id).await.unwrap();
    assert!(stored.last_error.as_deref().unwrap().contains("corrupted"));
    assert!(harness.index.is_empty());
}

#[tokio::test]
async fn test_job_for_unregistered_index_fails() {
    let harness = TestHarness::new(config(10));
    let job = ReindexJobState::new(
        "retired",
        ReindexScope::new(vec![searchsync_index::IndexedClass {
            class: "SiteTree".into(),
            include_subclasses: true,
        }]),
    );
    harness.queue.enqueue(&job).await.unwrap();

    harness.scheduler.run_until_idle().await.unwrap();
    let stored = harness.scheduler.status(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.last_error.as_deref().unwrap().contains("Unknown index"));
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_waits_between_attempts() {
    let retry = RetryPolicy {
        max_attempts: 4,
        backoff: Backoff::Exponential {
            initial_ms: 100,
            factor: 2.0,
            max_ms: 10_000,
        },
    };
    let harness = TestHarness::new(
        ReindexConfig::default()
            .with_batch_size(100)
            .with_retry(retry)
            .with_slice(0, 0),
    );
    harness.add_pages(1..=10);
    harness.index.failures().fail_when(3, |op| matches!(op, IndexOp::Upsert(_)));

    let started = tokio::time::Instant::now();
    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(100 + 200 + 400));
    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

/// A queue whose checkpoint after the second batch fails once.
#[derive(Default)]
struct FailingCheckpoint {
    inner: MemoryJobQueue,
    failed: AtomicBool,
}

#[async_trait]
impl JobQueue for FailingCheckpoint {
    async fn enqueue(&self, job: &ReindexJobState) -> Result<()> {
        if job.status == JobStatus::Running
            && job.counters.completed_batches == 2
            && !self.failed.swap(true, Ordering::SeqCst)
        {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        self.inner.enqueue(job).await
    }

    async fn next_pending(&self) -> Result<Option<ReindexJobState>> {
        self.inner.next_pending().await
    }

    async fn release(&self, job: &ReindexJobState) -> Result<()> {
        self.inner.release(job).await
    }

    async fn load(&self, id: &JobId) -> Result<ReindexJobState> {
        self.inner.load(id).await
    }

    async fn list(&self) -> Result<Vec<ReindexJobState>> {
        self.inner.list().await
    }
}

#[tokio::test]
async fn test_failed_checkpoint_leaves_job_resumable() {
    let harness = TestHarness::with_queue(config(10), Arc::new(FailingCheckpoint::default()));
    harness.add_pages(1..=50);

    let id = harness.scheduler.request("main", None).await.unwrap();
    assert!(harness.scheduler.dispatch_next().await.is_err());

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.cursors[0].last_key, Some(RecordKey::new(20)));
    assert!(job.last_error.as_deref().unwrap().contains("disk full"));

    harness.scheduler.resume(&id).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();
    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.counters.processed_records, 50);
    assert_eq!(harness.index.len(), 100);
}
