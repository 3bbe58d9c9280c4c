//! Integration tests for multi-site variant expansion.

use searchsync_core::RecordEvent;

use crate::common::{TestHarness, page};

#[tokio::test]
async fn test_subsite_and_stage_combine() {
    let harness = TestHarness::with_subsites();
    let mut unit = harness.updater.begin();
    unit.written(page(4, "Contact").with_field("subsite_id", 2_i64))
        .unwrap();
    unit.commit().await.unwrap();

    let requests = harness.transport.requests();
    // The add, then the clean-up of any other subsite's copies
    assert_eq!(requests.len(), 2);
    let docs = requests[0].body_json();
    let keys: Vec<&str> = docs
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["_documentid"].as_str().unwrap())
        .collect();
    assert_eq!(
        keys,
        vec!["4-Page-stage=Live,subsite=2", "4-Page-stage=Stage,subsite=2"]
    );
    assert!(docs[0]["_variant_subsite"] == "2");
    assert_eq!(
        requests[1].body_json()["delete"]["query"],
        r#"ClassName:"Page" AND ID:{3 TO 4] AND -_variant_subsite:"2""#
    );
}

#[tokio::test]
async fn test_moving_subsite_removes_old_documents() {
    let harness = TestHarness::with_subsites();
    let mut unit = harness.updater.begin();
    unit.written(page(4, "Contact").with_field("subsite_id", 2_i64))
        .unwrap();
    unit.commit().await.unwrap();
    harness.transport.clear();

    let mut unit = harness.updater.begin();
    unit.record(&RecordEvent::written_fields(
        page(4, "Contact").with_field("subsite_id", 3_i64),
        ["subsite_id"],
    ))
    .unwrap();
    let report = unit.commit().await.unwrap();
    assert_eq!(report.upserted, 2);
    assert_eq!(report.cleared, 1);

    let requests = harness.transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].body_json()["delete"]["query"],
        r#"ClassName:"Page" AND ID:{3 TO 4] AND -_variant_subsite:"3""#
    );
}

#[tokio::test]
async fn test_edit_within_subsite_sends_no_clean_up() {
    let harness = TestHarness::with_subsites();
    let mut unit = harness.updater.begin();
    unit.record(&RecordEvent::written_fields(
        page(4, "Contact us").with_field("subsite_id", 2_i64),
        ["Title"],
    ))
    .unwrap();
    let report = unit.commit().await.unwrap();
    assert_eq!(report.cleared, 0);
    assert_eq!(harness.transport.request_count(), 1);
}

#[tokio::test]
async fn test_move_back_within_one_unit_keeps_latest_clean_up() {
    let harness = TestHarness::with_subsites();
    let mut unit = harness.updater.begin();
    unit.written(page(4, "Contact").with_field("subsite_id", 3_i64))
        .unwrap();
    unit.written(page(4, "Contact").with_field("subsite_id", 2_i64))
        .unwrap();
    let report = unit.commit().await.unwrap();
    assert_eq!(report.cleared, 1);

    let requests = harness.transport.requests();
    let cleanup = requests.last().unwrap().body_json();
    assert_eq!(
        cleanup["delete"]["query"],
        r#"ClassName:"Page" AND ID:{3 TO 4] AND -_variant_subsite:"2""#
    );
}

#[tokio::test]
async fn test_malformed_subsite_fails_recording() {
    let harness = TestHarness::with_subsites();
    let mut unit = harness.updater.begin();
    let err = unit
        .written(page(4, "Contact").with_field("subsite_id", "two"))
        .unwrap_err();
    assert!(!err.is_retryable());
    unit.rollback();
    assert_eq!(harness.transport.request_count(), 0);
}
