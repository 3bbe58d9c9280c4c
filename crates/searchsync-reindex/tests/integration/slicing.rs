//! Integration tests for time slicing, progress and concurrent workers.

use std::time::Duration;

use searchsync_core::RecordKey;
use searchsync_reindex::{JobStatus, RetryPolicy};

use crate::common::{TestHarness, config, draft, file};

fn seed(harness: &TestHarness) {
    harness.add_pages(1..=240);
    for key in (5..=240).step_by(7) {
        harness.source.insert(draft(key));
    }
    for key in 1..=33 {
        harness.source.insert(file(key));
    }
}

#[tokio::test]
async fn test_paused_run_ends_like_uninterrupted_run() {
    let whole = TestHarness::new(config(25));
    seed(&whole);
    let whole_id = whole.scheduler.request("main", None).await.unwrap();
    assert_eq!(whole.scheduler.run_until_idle().await.unwrap(), 1);

    let sliced = TestHarness::new(config(25).with_slice(2, 0));
    seed(&sliced);
    let sliced_id = sliced.scheduler.request("main", None).await.unwrap();

    let first = sliced.scheduler.dispatch_next().await.unwrap();
    assert_eq!(first, Some((sliced_id, JobStatus::Paused)));
    let paused = sliced.scheduler.status(&sliced_id).await.unwrap();
    assert_eq!(paused.cursors[0].last_key, Some(RecordKey::new(50)));

    let slices = sliced.scheduler.run_until_idle().await.unwrap();
    assert!(slices > 1);

    let a = whole.scheduler.status(&whole_id).await.unwrap();
    let b = sliced.scheduler.status(&sliced_id).await.unwrap();
    assert_eq!(b.status, JobStatus::Completed);
    assert_eq!(a.counters, b.counters);
    assert_eq!(b.slices as usize, slices + 1);
    assert_eq!(whole.index.documents(), sliced.index.documents());
}

#[tokio::test(start_paused = true)]
async fn test_time_budget_pauses_job() {
    let harness = TestHarness::new(
        config(10)
            .with_slice(0, 1_000)
            .with_retry(RetryPolicy::fixed(3, Duration::from_secs(2))),
    );
    harness.add_pages(1..=30);
    harness
        .source
        .failures()
        .fail_when(1, |q| q.after == Some(RecordKey::new(10)));

    let id = harness.scheduler.request("main", None).await.unwrap();
    let first = harness.scheduler.dispatch_next().await.unwrap();
    assert_eq!(first, Some((id, JobStatus::Paused)));

    // The retry sleep spent the slice; the failed attempt stays counted
    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.cursors[0].last_key, Some(RecordKey::new(10)));
    assert_eq!(job.attempts, 1);

    harness.scheduler.run_until_idle().await.unwrap();
    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 0);
}

#[tokio::test]
async fn test_subscribers_follow_progress() {
    let harness = TestHarness::new(config(10).with_slice(1, 0));
    harness.add_pages(1..=30);
    let id = harness.scheduler.request("main", None).await.unwrap();

    let mut progress = harness.scheduler.subscribe(&id).await.unwrap();
    assert_eq!(progress.borrow_and_update().status, JobStatus::Pending);

    harness.scheduler.dispatch_next().await.unwrap();
    assert!(progress.has_changed().unwrap());
    let seen = progress.borrow_and_update().clone();
    assert_eq!(seen.status, JobStatus::Paused);
    assert_eq!(seen.counters.processed_records, 10);

    let handle = harness.scheduler.handle(&id).unwrap();
    let waiter = tokio::spawn(async move { handle.wait_terminal(Duration::from_secs(10)).await });
    harness.scheduler.run_until_idle().await.unwrap();

    let done = waiter.await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.counters.processed_records, 30);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_workers_run_distinct_jobs() {
    let harness = TestHarness::new(config(20).with_slice(1, 0));
    harness.add_pages(1..=200);

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(harness.scheduler.request("main", None).await.unwrap());
    }

    // Ten page batches and two closing fetches per job, one per slice
    let slices = harness.scheduler.run_workers(3).await.unwrap();
    assert_eq!(slices, 3 * 12);

    for id in &ids {
        let job = harness.scheduler.status(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.counters.processed_records, 200);
    }
    assert_eq!(harness.index.len(), 400);
    assert!(harness.scheduler.dispatch_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_reports_every_job() {
    let harness = TestHarness::new(config(50));
    harness.add_pages(1..=10);
    let first = harness.scheduler.request("main", None).await.unwrap();
    let second = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let jobs = harness.scheduler.list().await.unwrap();
    let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first) && ids.contains(&second));
    assert!(jobs.iter().all(|j| j.status == JobStatus::Completed));
}
