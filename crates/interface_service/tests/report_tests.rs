//! Tests for the JSON report archive

use chrono::Duration;
use core_kernel::DateRange;
use domain_queue::{EntryOutcome, SlotOutcome, SlotStatus, TaskId};
use interface_service::report::{ReportStore, ReportSummary};
use tempfile::TempDir;
use test_utils::{EntryFixtures, TimeFixtures};

fn submitted(n: u32) -> EntryOutcome {
    let mut outcome = EntryOutcome::for_entry(&EntryFixtures::numbered(n));
    outcome.auto_order_done = true;
    outcome.submission_done = true;
    outcome
}

fn failed(n: u32) -> EntryOutcome {
    EntryOutcome::failed(&EntryFixtures::numbered(n), "no task times")
}

#[tokio::test]
async fn test_open_creates_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("nested").join("reports");

    let store = ReportStore::open(&dir, TimeFixtures::service_date()).await.unwrap();

    assert!(dir.is_dir());
    assert_eq!(store.dir(), dir.as_path());
}

#[tokio::test]
async fn test_save_writes_daily_file() {
    let tmp = TempDir::new().unwrap();
    let date = TimeFixtures::service_date();
    let store = ReportStore::open(tmp.path(), date).await.unwrap();

    store.save(date, submitted(1)).await.unwrap();
    store.save(date, failed(2)).await.unwrap();

    let path = tmp.path().join("2024-03-04.json");
    assert!(path.is_file());
    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(json["date"], "2024-03-04");
    assert_eq!(json["results"].as_array().unwrap().len(), 2);

    let results = store.results(date).await.unwrap();
    assert_eq!(results[0].reference, EntryFixtures::numbered(1).reference);
    assert_eq!(results[1].error.as_deref(), Some("no task times"));
}

#[tokio::test]
async fn test_save_replaces_same_reference() {
    let tmp = TempDir::new().unwrap();
    let date = TimeFixtures::service_date();
    let store = ReportStore::open(tmp.path(), date).await.unwrap();

    store.save(date, failed(1)).await.unwrap();
    store.save(date, submitted(1)).await.unwrap();

    let results = store.results(date).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].submission_done);
    assert!(results[0].error.is_none());
}

#[tokio::test]
async fn test_summary_counts_accepted_slots_as_success() {
    let tmp = TempDir::new().unwrap();
    let date = TimeFixtures::service_date();
    let store = ReportStore::open(tmp.path(), date).await.unwrap();

    let mut partial = EntryOutcome::for_entry(&EntryFixtures::numbered(3));
    partial.slots[0] = SlotOutcome {
        response_code: Some(208),
        ..SlotOutcome::new(TaskId::AdmissionWait, Some(TimeFixtures::at(8, 0)), 0, SlotStatus::Confirmed)
    };

    store.save(date, submitted(1)).await.unwrap();
    store.save(date, failed(2)).await.unwrap();
    store.save(date, partial).await.unwrap();

    let summary = store.summary(date).await.unwrap();
    assert_eq!(
        summary,
        ReportSummary {
            processed: 3,
            success: 2,
            failed: 1
        }
    );
}

#[tokio::test]
async fn test_missing_day_is_empty() {
    let tmp = TempDir::new().unwrap();
    let store = ReportStore::open(tmp.path(), TimeFixtures::service_date()).await.unwrap();

    let date = TimeFixtures::service_date() - Duration::days(400);
    assert!(store.results(date).await.unwrap().is_empty());
    assert_eq!(store.summary(date).await.unwrap(), ReportSummary::default());
}

#[tokio::test]
async fn test_summary_range_adds_days() {
    let tmp = TempDir::new().unwrap();
    let day = TimeFixtures::service_date();
    let next = day + Duration::days(1);
    let store = ReportStore::open(tmp.path(), next).await.unwrap();

    store.save(day, submitted(1)).await.unwrap();
    store.save(day, failed(2)).await.unwrap();
    store.save(next, submitted(3)).await.unwrap();

    let range = DateRange::new(day - Duration::days(2), next).unwrap();
    let summary = store.summary_range(range).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_reopen_preloads_existing_files() {
    let tmp = TempDir::new().unwrap();
    let date = TimeFixtures::service_date();

    {
        let store = ReportStore::open(tmp.path(), date).await.unwrap();
        store.save(date, submitted(1)).await.unwrap();
    }

    let reopened = ReportStore::open(tmp.path(), date + Duration::days(3)).await.unwrap();
    assert_eq!(reopened.summary(date).await.unwrap().processed, 1);
}

#[tokio::test]
async fn test_unreadable_file_is_treated_as_empty() {
    let tmp = TempDir::new().unwrap();
    let date = TimeFixtures::service_date();
    std::fs::write(tmp.path().join("2024-03-04.json"), b"{ not json").unwrap();

    let store = ReportStore::open(tmp.path(), date).await.unwrap();
    assert!(store.results(date).await.unwrap().is_empty());

    store.save(date, submitted(1)).await.unwrap();
    assert_eq!(store.results(date).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_is_processed_requires_full_submission() {
    let tmp = TempDir::new().unwrap();
    let date = TimeFixtures::service_date();
    let store = ReportStore::open(tmp.path(), date).await.unwrap();

    store.save(date, submitted(1)).await.unwrap();
    store.save(date, failed(2)).await.unwrap();

    let done = EntryFixtures::numbered(1).reference;
    let not_done = EntryFixtures::numbered(2).reference;
    assert!(store.is_processed(done.as_str(), date).await.unwrap());
    assert!(!store.is_processed(not_done.as_str(), date).await.unwrap());
    assert!(!store.is_processed(done.as_str(), date + Duration::days(1)).await.unwrap());
}
