//! Integration tests for jobs persisted in a state directory.

use std::sync::Arc;

use searchsync_core::RecordKey;
use searchsync_reindex::{FileJobQueue, JobQueue, JobStatus};
use tempfile::TempDir;

use crate::common::{TestHarness, config};

fn harness(dir: &TempDir, max_batches: u32) -> TestHarness {
    let queue = FileJobQueue::open(dir.path()).unwrap();
    let harness = TestHarness::with_queue(config(10).with_slice(max_batches, 0), Arc::new(queue));
    harness.add_pages(1..=50);
    harness
}

#[tokio::test]
async fn test_job_continues_after_restart() {
    let dir = TempDir::new().unwrap();
    let id = {
        let first = harness(&dir, 1);
        let id = first.scheduler.request("main", None).await.unwrap();
        first.scheduler.dispatch_next().await.unwrap();
        first.scheduler.dispatch_next().await.unwrap();
        id
    };

    let second = harness(&dir, 0);
    let stored = second.scheduler.status(&id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Paused);
    assert_eq!(stored.cursors[0].last_key, Some(RecordKey::new(20)));

    second.scheduler.run_until_idle().await.unwrap();
    let job = second.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.counters.processed_records, 50);
    assert_eq!(job.slices, 3);
    // The new process only wrote what was left
    assert_eq!(second.index.len(), 60);
    assert!(dir.path().join(format!("{id}.json")).exists());
}

#[tokio::test]
async fn test_stale_claim_blocks_until_broken() {
    let dir = TempDir::new().unwrap();
    let crashed = FileJobQueue::open(dir.path()).unwrap();
    let live = harness(&dir, 0);

    let id = live.scheduler.request("main", None).await.unwrap();
    // A runner that claims the job and dies without releasing it
    crashed.next_pending().await.unwrap().unwrap();
    assert!(live.scheduler.dispatch_next().await.unwrap().is_none());

    assert!(crashed.break_lock(&id).await.unwrap());
    assert_eq!(
        live.scheduler.dispatch_next().await.unwrap(),
        Some((id, JobStatus::Completed))
    );
    assert!(!crashed.is_claimed(&id).await.unwrap());
}

#[tokio::test]
async fn test_job_interrupted_mid_slice_continues_from_checkpoint() {
    let dir = TempDir::new().unwrap();
    let live = harness(&dir, 0);
    let id = live.scheduler.request("main", None).await.unwrap();
    {
        // A runner that checkpoints one batch and dies mid-slice
        let crashed = FileJobQueue::open(dir.path()).unwrap();
        let mut job = crashed.next_pending().await.unwrap().unwrap();
        job.transition(JobStatus::Running).unwrap();
        job.cursors[0].last_key = Some(RecordKey::new(10));
        crashed.enqueue(&job).await.unwrap();
    }
    assert!(live.scheduler.dispatch_next().await.unwrap().is_none());

    let operator = FileJobQueue::open(dir.path()).unwrap();
    assert!(operator.break_lock(&id).await.unwrap());
    assert_eq!(
        live.scheduler.dispatch_next().await.unwrap(),
        Some((id, JobStatus::Completed))
    );

    let job = live.scheduler.status(&id).await.unwrap();
    assert_eq!(job.cursors[0].last_key, Some(RecordKey::new(50)));
    assert_eq!(job.counters.processed_records, 40);
    assert_eq!(job.slices, 1);
    assert!(live.documents_of(10).is_empty());
    assert_eq!(live.documents_of(11).len(), 2);
    assert_eq!(live.index.len(), 80);
    assert!(!operator.is_claimed(&id).await.unwrap());
}

#[tokio::test]
async fn test_unreadable_state_file_is_quarantined() {
    let dir = TempDir::new().unwrap();
    let live = harness(&dir, 0);
    let id = live.scheduler.request("main", None).await.unwrap();
    std::fs::write(dir.path().join(format!("{id}.json")), b"{\"id\": 7").unwrap();

    assert!(live.scheduler.dispatch_next().await.unwrap().is_none());
    assert!(dir.path().join(format!("{id}.json.corrupt")).exists());

    let err = live.scheduler.status(&id).await.unwrap_err();
    assert!(matches!(err, searchsync_core::Error::JobStateCorruption { .. }));
    assert!(live.index.is_empty());
}
