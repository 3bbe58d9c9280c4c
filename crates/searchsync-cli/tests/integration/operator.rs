//! Operator workflows: reindex, inspect, resume, apply.

use searchsync_cli::commands::{self, ReindexOptions, jobs};
use searchsync_cli::context::{self, Context, Target};
use searchsync_cli::fixtures::{EventFixture, RecordFixture};
use searchsync_core::RecordKey;
use searchsync_index::IndexOp;
use searchsync_reindex::{JobQueue, JobStatus};

use crate::common::{Workspace, pages_fixture};

fn options() -> ReindexOptions {
    ReindexOptions {
        workers: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_failed_job_is_resumed_by_the_next_run() {
    let ws = Workspace::new();
    let config = ws.config();
    let fixture = RecordFixture::load(&ws.write("records.json", &pages_fixture(35))).unwrap();

    let queue = context::open_queue(&config, false).unwrap();
    let context = Context::new(config.clone(), fixture.classes.clone(), Target::Memory).unwrap();
    context.memory()[0].failures().fail_when(2, |op| {
        matches!(op, IndexOp::Upsert(ids) if ids.first().is_some_and(|id| id.key.get() == 21))
    });

    let report = commands::reindex(&context, fixture.records.clone(), queue.clone(), options())
        .await
        .unwrap();
    let failed = report.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].cursors[0].last_key, Some(RecordKey::new(20)));
    let id = failed[0].id;

    let stored = context::persistent_queue(&config).unwrap();
    assert!(jobs::list(&stored).await.unwrap().contains("failed"));
    let progress = jobs::resume(&stored, &id).await.unwrap();
    assert_eq!(progress.status, JobStatus::Pending);

    let again = commands::reindex(&context, fixture.records, queue, options())
        .await
        .unwrap();
    assert!(again.failed().is_empty());
    assert_ne!(again.jobs[0].id, id);

    let resumed = stored.load(&id).await.unwrap();
    assert_eq!(resumed.status, JobStatus::Completed);
    assert_eq!(resumed.counters.processed_records, 35);
    assert_eq!(resumed.slices, 2);
    // Stage for every page, Live for the odd ones
    assert_eq!(context.memory()[0].len(), 35 + 18);
}

#[tokio::test]
async fn test_dry_run_keeps_no_job_state() {
    let ws = Workspace::new();
    let config = ws.config();
    let fixture = RecordFixture::load(&ws.write("records.json", &pages_fixture(5))).unwrap();

    let queue = context::open_queue(&config, true).unwrap();
    let context = Context::new(config.clone(), fixture.classes, Target::Memory).unwrap();
    let report = commands::reindex(&context, fixture.records, queue, options())
        .await
        .unwrap();

    assert_eq!(report.jobs[0].status, JobStatus::Completed);
    assert!(!ws.path().join("jobs").exists());
    let stored = context::persistent_queue(&config).unwrap();
    assert_eq!(jobs::list(&stored).await.unwrap(), "no reindex jobs");
}

#[tokio::test]
async fn test_apply_replays_event_fixture() {
    let ws = Workspace::new();
    let events = ws.write(
        "events.json",
        r#"{
            "classes": {
                "SiteTree": { "capabilities": ["versioned"] },
                "Page": { "parent": "SiteTree" }
            },
            "events": [
                { "event": "written", "record": { "class": "Page", "key": 1,
                  "fields": { "Title": "Home", "published": true } } },
                { "event": "written", "record": { "class": "Page", "key": 2,
                  "fields": { "Title": "About", "published": true } } },
                { "event": "deleted", "record": { "class": "Page", "key": 2 } },
                { "event": "written", "record": { "class": "Page", "key": 3,
                  "fields": { "Title": "Draft" } },
                  "changed_fields": ["Title"] }
            ]
        }"#,
    );
    let fixture = EventFixture::load(&events).unwrap();
    let context = Context::new(ws.config(), fixture.classes, Target::Memory).unwrap();

    let report = commands::apply(&context, &fixture.events).await.unwrap();
    assert_eq!(report.events, 4);
    assert_eq!(report.rejected, 0);

    let keys: Vec<String> = context.memory()[0]
        .documents()
        .iter()
        .map(|d| d.id.engine_key())
        .collect();
    assert_eq!(
        keys,
        vec![
            "1-Page-stage=Live",
            "1-Page-stage=Stage",
            "3-Page-stage=Stage"
        ]
    );
}
