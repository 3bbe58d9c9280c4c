//! Integration tests for subsite-scoped reindex jobs.

use searchsync_core::{RecordClass, RecordKey};
use searchsync_index::IndexOp;
use searchsync_reindex::JobStatus;

use crate::common::{TestHarness, config, draft, file, page};

fn subsite_of(key: u64) -> i64 {
    (key % 3) as i64
}

fn seed(harness: &TestHarness) {
    for key in 1..=30 {
        harness
            .source
            .insert(page(key).with_field("subsite_id", subsite_of(key)));
    }
    harness.source.insert(file(7));
}

#[tokio::test]
async fn test_subsite_job_only_touches_its_subsite() {
    let harness = TestHarness::with_subsites(config(8));
    seed(&harness);
    harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();
    assert_eq!(harness.index.len(), 61);

    // Subsite 2 loses page 2 and unpublishes page 5; subsite 0 loses page 3
    harness
        .source
        .remove(&RecordClass::new("Page"), RecordKey::new(2));
    harness
        .source
        .insert(draft(5).with_field("subsite_id", subsite_of(5)));
    harness
        .source
        .remove(&RecordClass::new("Page"), RecordKey::new(3));
    harness.index.clear_ops();

    let id = harness.scheduler.request("main", Some(2)).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();
    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.scope.subsite, Some(2));
    assert_eq!(job.counters.processed_records, 9);

    assert!(harness.documents_of(2).is_empty());
    let five: Vec<String> = harness
        .documents_of(5)
        .iter()
        .map(|d| d.id.engine_key())
        .collect();
    assert_eq!(five, vec!["5-Page-stage=Stage,subsite=2"]);
    assert_eq!(harness.documents_of(3).len(), 2, "other subsites are left alone");
    assert_eq!(harness.documents_of(7).len(), 3, "files carry no subsite");

    for op in harness.index.ops() {
        match op {
            IndexOp::Upsert(ids) => assert!(
                ids.iter()
                    .all(|id| id.variant.get("subsite") == Some("2"))
            ),
            IndexOp::DeleteRange(range) => {
                assert_eq!(range.class, RecordClass::new("SiteTree"));
                assert_eq!(range.variants.get("subsite").map(String::as_str), Some("2"));
            }
            IndexOp::Delete(_) => {}
        }
    }
}

#[tokio::test]
async fn test_unscoped_job_rewrites_every_subsite() {
    let harness = TestHarness::with_subsites(config(100));
    seed(&harness);
    let id = harness.scheduler.request("main", None).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.counters.processed_records, 31);
    assert!(
        harness
            .engine_keys()
            .contains(&"30-Page-stage=Live,subsite=0".to_string())
    );
}

#[tokio::test]
async fn test_subsite_job_selects_by_the_variant_field() {
    let harness = TestHarness::with_subsite_field(config(8), "site_id");
    for key in 1..=6 {
        harness
            .source
            .insert(page(key).with_field("site_id", subsite_of(key)));
    }

    let id = harness.scheduler.request("main", Some(1)).await.unwrap();
    harness.scheduler.run_until_idle().await.unwrap();

    let job = harness.scheduler.status(&id).await.unwrap();
    assert_eq!(job.counters.processed_records, 2);
    assert_eq!(
        harness.engine_keys(),
        vec![
            "1-Page-stage=Live,subsite=1",
            "1-Page-stage=Stage,subsite=1",
            "4-Page-stage=Live,subsite=1",
            "4-Page-stage=Stage,subsite=1",
        ]
    );
}
