//! Tests for batch runs and the poll watcher against in-memory ports

use chrono::NaiveDate;
use core_kernel::{FixedOffsets, Timezone};
use domain_queue::ports::mock::{MockCheckpointStore, MockEntrySource, MockQueueService, MockSourceRecords};
use domain_queue::{CheckpointStatus, CheckpointStore, Entry, EntryOutcome, Reconciler, SlotStatus, SourceSnapshot, TaskId};
use interface_service::report::ReportStore;
use interface_service::{BatchKind, BatchOptions, BatchRunner, Watcher};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_utils::{EntryBuilder, EntryFixtures, SnapshotFixtures, StoredCheckpointBuilder, TimeFixtures};

struct Harness {
    entries: Arc<MockEntrySource>,
    sources: Arc<MockSourceRecords>,
    store: Arc<MockCheckpointStore>,
    service: Arc<MockQueueService>,
    reconciler: Arc<Reconciler>,
}

async fn harness(entries: Vec<Entry>, store: MockCheckpointStore) -> Harness {
    let entries = Arc::new(MockEntrySource::new(entries));
    let sources = Arc::new(MockSourceRecords::new());
    let store = Arc::new(store);
    let service = Arc::new(MockQueueService::new());
    let reconciler = Arc::new(Reconciler::new(
        sources.clone(),
        store.clone(),
        service.clone(),
        Timezone::default(),
        Arc::new(FixedOffsets(2)),
    ));
    Harness {
        entries,
        sources,
        store,
        service,
        reconciler,
    }
}

fn runner(h: &Harness, reports: Option<Arc<ReportStore>>) -> BatchRunner {
    BatchRunner::new(h.entries.clone(), h.reconciler.clone(), reports, Timezone::default())
}

mod batch_kind {
    use super::*;

    #[test]
    fn test_parse_batch_kinds() {
        assert_eq!("autoorder".parse::<BatchKind>().unwrap(), BatchKind::AutoOrder);
        assert_eq!("UPDATEWAKTU".parse::<BatchKind>().unwrap(), BatchKind::UpdateTime);
        assert_eq!(" all ".parse::<BatchKind>().unwrap(), BatchKind::All);
        assert_eq!("retry-task".parse::<BatchKind>().unwrap(), BatchKind::RetryTask);
        assert!("everything".parse::<BatchKind>().is_err());
    }

    #[test]
    fn test_display_matches_parse() {
        for kind in [BatchKind::AutoOrder, BatchKind::UpdateTime, BatchKind::All, BatchKind::RetryTask] {
            assert_eq!(kind.to_string().parse::<BatchKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_default_options_retry_file_dispatch() {
        let options = BatchOptions::default();
        assert_eq!(options.task, TaskId::FileDispatch);
        assert!(!options.rebuild);
    }
}

mod batch_runner {
    use super::*;

    #[tokio::test]
    async fn test_auto_order_persists_without_sending() {
        let entries = vec![EntryFixtures::numbered(1), EntryFixtures::numbered(2)];
        let h = harness(entries, MockCheckpointStore::new()).await;
        h.sources
            .insert(EntryFixtures::numbered(1).reference, SnapshotFixtures::complete())
            .await;

        let summary = runner(&h, None)
            .run(BatchKind::AutoOrder, TimeFixtures::service_date(), BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert!(h.service.calls().await.is_empty());

        let rows = h.store.rows_for(&EntryFixtures::numbered(1).reference).await;
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|r| r.status == CheckpointStatus::Pending));
    }

    #[tokio::test]
    async fn test_all_submits_every_entry() {
        let entries = vec![EntryFixtures::numbered(1), EntryFixtures::numbered(2)];
        let h = harness(entries, MockCheckpointStore::new()).await;
        for n in [1, 2] {
            h.sources
                .insert(EntryFixtures::numbered(n).reference, SnapshotFixtures::complete())
                .await;
        }

        let summary = runner(&h, None)
            .run(BatchKind::All, TimeFixtures::service_date(), BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(h.service.calls().await.len(), 14);
        let confirmed = h.store.confirmed_tasks(&EntryFixtures::numbered(2).reference).await;
        assert_eq!(confirmed.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_other_dates_are_not_selected() {
        let other_day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let entries = vec![EntryFixtures::numbered(1), EntryBuilder::new().on(other_day).build()];
        let h = harness(entries, MockCheckpointStore::new()).await;

        let summary = runner(&h, None)
            .run(BatchKind::All, TimeFixtures::service_date(), BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.date, TimeFixtures::service_date());
    }

    #[tokio::test]
    async fn test_entry_failures_are_counted() {
        let h = harness(vec![EntryFixtures::numbered(1)], MockCheckpointStore::new()).await;
        h.sources.fail(true);

        let summary = runner(&h, None)
            .run(BatchKind::All, TimeFixtures::service_date(), BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 1);
        assert!(h.service.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_retry_task_sends_only_that_task() {
        let entry = EntryFixtures::numbered(1);
        let h = harness(vec![entry.clone()], MockCheckpointStore::new()).await;
        h.sources.insert(entry.reference.clone(), SnapshotFixtures::complete()).await;

        let options = BatchOptions {
            task: TaskId::FileDispatch,
            rebuild: false,
        };
        let summary = runner(&h, None)
            .run(BatchKind::RetryTask, TimeFixtures::service_date(), options)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        let calls = h.service.calls().await;
        assert!(calls.iter().all(|c| c.task == TaskId::FileDispatch));
        assert_eq!(
            h.store.row(&entry.reference, TaskId::FileDispatch).await.unwrap().status,
            CheckpointStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_retry_task_prefers_archived_failures() {
        let tmp = TempDir::new().unwrap();
        let date = TimeFixtures::service_date();
        let reports = Arc::new(ReportStore::open(tmp.path(), date).await.unwrap());

        let (first, second) = (EntryFixtures::numbered(1), EntryFixtures::numbered(2));
        let h = harness(vec![first.clone(), second.clone()], MockCheckpointStore::new()).await;
        for entry in [&first, &second] {
            h.sources.insert(entry.reference.clone(), SnapshotFixtures::complete()).await;
        }

        let mut failed = EntryOutcome::for_entry(&second);
        failed.slots[TaskId::FileDispatch.index()].status = SlotStatus::Failed;
        reports.save(date, failed).await.unwrap();
        reports.save(date, EntryOutcome::for_entry(&first)).await.unwrap();

        let summary = runner(&h, Some(reports))
            .run(BatchKind::RetryTask, date, BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        let calls = h.service.calls().await;
        assert!(!calls.is_empty());
        assert!(calls.iter().all(|c| c.booking_code == second.booking_code));
    }

    #[tokio::test]
    async fn test_retry_task_falls_back_without_archived_failures() {
        let tmp = TempDir::new().unwrap();
        let date = TimeFixtures::service_date();
        let reports = Arc::new(ReportStore::open(tmp.path(), date).await.unwrap());

        let entry = EntryFixtures::numbered(1);
        let h = harness(vec![entry.clone()], MockCheckpointStore::new()).await;
        h.sources.insert(entry.reference.clone(), SnapshotFixtures::complete()).await;
        reports.save(date, EntryOutcome::for_entry(&entry)).await.unwrap();

        let summary = runner(&h, Some(reports))
            .run(BatchKind::RetryTask, date, BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(h.service.calls_for(TaskId::FileDispatch).await.len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_discards_stale_rows() {
        let entry = EntryFixtures::numbered(1);
        let stale = StoredCheckpointBuilder::for_entry(&entry, TaskId::FileDispatch)
            .at(TimeFixtures::at(11, 0))
            .build();
        let h = harness(vec![entry.clone()], MockCheckpointStore::with_rows(vec![stale]).await).await;
        h.sources.insert(entry.reference.clone(), SnapshotFixtures::complete()).await;

        let options = BatchOptions {
            task: TaskId::FileDispatch,
            rebuild: true,
        };
        runner(&h, None)
            .run(BatchKind::AutoOrder, TimeFixtures::service_date(), options)
            .await
            .unwrap();

        let row = h.store.row(&entry.reference, TaskId::FileDispatch).await.unwrap();
        assert_eq!(row.value_ms, Timezone::default().to_millis(Some(TimeFixtures::at(8, 20))));
    }

    #[tokio::test]
    async fn test_rebuild_deletes_confirmed_rows() {
        let entry = EntryFixtures::numbered(1);
        let confirmed = StoredCheckpointBuilder::for_entry(&entry, TaskId::AdmissionWait)
            .at(TimeFixtures::at(8, 1))
            .confirmed()
            .build();
        let h = harness(vec![entry.clone()], MockCheckpointStore::with_rows(vec![confirmed]).await).await;
        h.sources.insert(entry.reference.clone(), SnapshotFixtures::complete()).await;

        let options = BatchOptions {
            task: TaskId::FileDispatch,
            rebuild: true,
        };
        runner(&h, None)
            .run(BatchKind::AutoOrder, TimeFixtures::service_date(), options)
            .await
            .unwrap();

        let row = h.store.row(&entry.reference, TaskId::AdmissionWait).await.unwrap();
        assert_eq!(row.status, CheckpointStatus::Pending);
        assert_eq!(row.value_ms, Timezone::default().to_millis(Some(TimeFixtures::at(8, 5))));
        assert!(h.store.confirmed_tasks(&entry.reference).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_are_archived() {
        let tmp = TempDir::new().unwrap();
        let timezone = Timezone::default();
        let reports = Arc::new(ReportStore::open(tmp.path(), timezone.today()).await.unwrap());

        let entries = vec![EntryFixtures::numbered(1), EntryFixtures::numbered(2)];
        let h = harness(entries, MockCheckpointStore::new()).await;

        runner(&h, Some(reports.clone()))
            .run(BatchKind::All, TimeFixtures::service_date(), BatchOptions::default())
            .await
            .unwrap();

        let archived = reports.results(timezone.today()).await.unwrap();
        assert_eq!(archived.len(), 2);
    }
}

mod watcher {
    use super::*;

    fn today_entry(n: u32) -> Entry {
        EntryBuilder::new()
            .with_reference(format!("0301R0010324V{:06}", n))
            .with_booking_code(format!("BK{:04}", n))
            .on(Timezone::default().today())
            .build()
    }

    fn today_snapshot() -> SourceSnapshot {
        let day = Timezone::default().today();
        SourceSnapshot {
            admission_start: day.and_hms_opt(8, 10, 0),
            admission_end: day.and_hms_opt(8, 15, 0),
            ..SourceSnapshot::default()
        }
    }

    fn watcher(h: &Harness, reports: Option<Arc<ReportStore>>, interval: Duration) -> Watcher {
        Watcher::new(h.entries.clone(), h.reconciler.clone(), reports, Timezone::default(), interval)
    }

    #[tokio::test]
    async fn test_check_and_process_handles_today() {
        let h = harness(vec![today_entry(1), today_entry(2)], MockCheckpointStore::new()).await;
        for n in [1, 2] {
            h.sources.insert(today_entry(n).reference, today_snapshot()).await;
        }
        let w = watcher(&h, None, Duration::from_secs(60));

        let processed = w.check_and_process().await;

        assert_eq!(processed, 2);
        assert_eq!(w.processed(), 2);
        assert_eq!(h.service.calls().await.len(), 10);
    }

    #[tokio::test]
    async fn test_check_and_process_ignores_other_days() {
        let h = harness(vec![EntryFixtures::numbered(1)], MockCheckpointStore::new()).await;
        let w = watcher(&h, None, Duration::from_secs(60));

        assert_eq!(w.check_and_process().await, 0);
        assert!(h.service.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_check_and_process_archives_outcomes() {
        let tmp = TempDir::new().unwrap();
        let today = Timezone::default().today();
        let reports = Arc::new(ReportStore::open(tmp.path(), today).await.unwrap());

        let h = harness(vec![today_entry(1)], MockCheckpointStore::new()).await;
        h.sources.insert(today_entry(1).reference, today_snapshot()).await;
        let w = watcher(&h, Some(reports.clone()), Duration::from_secs(60));

        w.check_and_process().await;

        let reference = today_entry(1).reference;
        assert!(reports.is_processed(reference.as_str(), today).await.unwrap());
    }

    #[tokio::test]
    async fn test_start_polls_until_stopped() {
        let h = harness(vec![today_entry(1)], MockCheckpointStore::new()).await;
        h.sources.insert(today_entry(1).reference, today_snapshot()).await;
        let w = watcher(&h, None, Duration::from_millis(20));

        let handle = w.start();
        tokio::time::sleep(Duration::from_millis(150)).await;
        w.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();

        assert!(w.is_stopped());
        assert!(w.processed() >= 2);
        // Confirmed slots are skipped on later polls.
        assert_eq!(h.service.calls().await.len(), 5);
    }

    #[tokio::test]
    async fn test_stop_before_start_exits_immediately() {
        let h = harness(vec![], MockCheckpointStore::new()).await;
        let w = watcher(&h, None, Duration::from_secs(3600));

        w.stop();
        let handle = w.start();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}
