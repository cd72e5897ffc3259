//! Queue Domain Ports
//!
//! Port interfaces the engine needs from the outside world:
//!
//! - **CheckpointStore**: the persisted checkpoint table
//! - **SourceRecords**: read-only hospital records feeding the resolver
//! - **EntrySource**: the bookings to process
//! - **QueueServicePort**: the external antrean service
//!
//! MySQL adapters live in `infra_db`; the HTTP adapter lives in
//! [`crate::adapters`]. In-memory mocks are available behind the `mock`
//! feature.
//!
//! ```rust,ignore
//! let engine = SubmissionEngine::new(
//!     Arc::new(MySqlCheckpointAdapter::new(pool.clone())),
//!     Arc::new(AntreanClient::new(credentials, Duration::from_secs(10))?),
//!     Timezone::default(),
//!     Arc::new(RandomOffsets),
//! );
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{BookingCode, DomainPort, EntryReference, HealthCheckable, PortError};

use crate::checkpoint::{StoredCheckpoint, TaskId};
use crate::entry::{Entry, SourceSnapshot};
use crate::error::SubmissionError;
use crate::response::ServiceResponse;

/// The persisted checkpoint table
///
/// Implementations must never overwrite the value of a confirmed row.
#[async_trait]
pub trait CheckpointStore: DomainPort + HealthCheckable {
    /// Retrieves every row of an entry
    ///
    /// # Arguments
    ///
    /// * `reference` - The entry's reference number
    ///
    /// # Returns
    ///
    /// All persisted rows, confirmed or not, in no particular order
    async fn get_all(&self, reference: &EntryReference) -> Result<Vec<StoredCheckpoint>, PortError>;

    /// Inserts a pending row, or updates value and note of an existing
    /// unconfirmed row
    async fn upsert_pending(&self, row: &StoredCheckpoint) -> Result<(), PortError>;

    /// Updates the value of an unconfirmed row
    async fn update_value(&self, reference: &EntryReference, task: TaskId, value_ms: i64) -> Result<(), PortError>;

    /// Marks a row confirmed
    async fn mark_confirmed(&self, reference: &EntryReference, task: TaskId) -> Result<(), PortError>;

    /// Deletes every row of an entry
    ///
    /// # Returns
    ///
    /// The number of rows removed
    async fn delete_all(&self, reference: &EntryReference) -> Result<u64, PortError>;

    /// Largest confirmed value in epoch milliseconds, `0` when none
    async fn max_confirmed_value(&self, reference: &EntryReference) -> Result<i64, PortError>;

    /// Tasks already confirmed for the entry
    async fn confirmed_tasks(&self, reference: &EntryReference) -> Result<Vec<TaskId>, PortError>;
}

/// Read-only hospital records
#[async_trait]
pub trait SourceRecords: DomainPort {
    /// Reads every raw checkpoint value for an entry
    ///
    /// Missing records are not an error; the matching fields stay `None`.
    async fn fetch_sources(&self, entry: &Entry) -> Result<SourceSnapshot, PortError>;
}

/// Queries selecting which entries a driver processes
#[async_trait]
pub trait EntrySource: DomainPort {
    /// Sent bookings of the configured payer whose tasks 1..5 are not all confirmed
    async fn pending_entries(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError>;

    /// Every booking of the configured payer on a date
    async fn entries_for_date(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError>;

    /// Bookings that already have persisted checkpoints on a date
    async fn entries_with_checkpoints(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError>;

    /// Bookings whose given task is persisted but not confirmed
    async fn entries_with_unconfirmed_task(&self, date: NaiveDate, task: TaskId) -> Result<Vec<Entry>, PortError>;

    async fn entry_by_reference(&self, reference: &EntryReference) -> Result<Option<Entry>, PortError>;
}

/// The external queue-tracking service
#[async_trait]
pub trait QueueServicePort: DomainPort + HealthCheckable {
    /// Reports the time of one task of a booking
    ///
    /// # Arguments
    ///
    /// * `booking_code` - Booking key known to the service
    /// * `task` - The checkpoint being reported
    /// * `value_ms` - Epoch milliseconds of the checkpoint
    ///
    /// # Returns
    ///
    /// The parsed response envelope, whatever its code
    async fn update_time(
        &self,
        booking_code: &BookingCode,
        task: TaskId,
        value_ms: i64,
    ) -> Result<ServiceResponse, SubmissionError>;
}

/// In-memory implementations for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use crate::checkpoint::CheckpointStatus;
    use crate::response::{CODE_ALREADY_REPORTED, CODE_OK};
    use core_kernel::HealthCheckResult;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    type RowKey = (EntryReference, TaskId);

    /// In-memory checkpoint table
    #[derive(Debug, Default)]
    pub struct MockCheckpointStore {
        rows: Arc<RwLock<HashMap<RowKey, StoredCheckpoint>>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl MockCheckpointStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with rows for testing
        pub async fn with_rows(rows: Vec<StoredCheckpoint>) -> Self {
            let store = Self::new();
            for row in rows {
                store.rows.write().await.insert((row.reference.clone(), row.task), row);
            }
            store
        }

        /// Makes every read fail with a connection error
        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        /// Makes every write fail with a connection error
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        pub async fn row(&self, reference: &EntryReference, task: TaskId) -> Option<StoredCheckpoint> {
            self.rows.read().await.get(&(reference.clone(), task)).cloned()
        }

        pub async fn rows_for(&self, reference: &EntryReference) -> Vec<StoredCheckpoint> {
            let mut rows: Vec<_> = self
                .rows
                .read()
                .await
                .values()
                .filter(|r| &r.reference == reference)
                .cloned()
                .collect();
            rows.sort_by_key(|r| r.task);
            rows
        }

        fn check_read(&self) -> Result<(), PortError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock store unavailable"));
            }
            Ok(())
        }

        fn check_write(&self) -> Result<(), PortError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock store unavailable"));
            }
            Ok(())
        }
    }

    impl DomainPort for MockCheckpointStore {}

    #[async_trait]
    impl HealthCheckable for MockCheckpointStore {
        async fn health_check(&self) -> HealthCheckResult {
            match self.check_read() {
                Ok(()) => HealthCheckResult::healthy("mock-checkpoint-store", 0),
                Err(e) => HealthCheckResult::unhealthy("mock-checkpoint-store", 0, e.to_string()),
            }
        }
    }

    #[async_trait]
    impl CheckpointStore for MockCheckpointStore {
        async fn get_all(&self, reference: &EntryReference) -> Result<Vec<StoredCheckpoint>, PortError> {
            self.check_read()?;
            Ok(self.rows_for(reference).await)
        }

        async fn upsert_pending(&self, row: &StoredCheckpoint) -> Result<(), PortError> {
            self.check_write()?;
            let mut rows = self.rows.write().await;
            let key = (row.reference.clone(), row.task);
            match rows.get_mut(&key) {
                Some(existing) if existing.is_confirmed() => {}
                Some(existing) => {
                    existing.value_ms = row.value_ms;
                    existing.note = row.note.clone();
                }
                None => {
                    let mut fresh = row.clone();
                    fresh.status = CheckpointStatus::Pending;
                    rows.insert(key, fresh);
                }
            }
            Ok(())
        }

        async fn update_value(&self, reference: &EntryReference, task: TaskId, value_ms: i64) -> Result<(), PortError> {
            self.check_write()?;
            if let Some(row) = self.rows.write().await.get_mut(&(reference.clone(), task)) {
                if !row.is_confirmed() {
                    row.value_ms = value_ms;
                }
            }
            Ok(())
        }

        async fn mark_confirmed(&self, reference: &EntryReference, task: TaskId) -> Result<(), PortError> {
            self.check_write()?;
            if let Some(row) = self.rows.write().await.get_mut(&(reference.clone(), task)) {
                row.status = CheckpointStatus::Confirmed;
            }
            Ok(())
        }

        async fn delete_all(&self, reference: &EntryReference) -> Result<u64, PortError> {
            self.check_write()?;
            let mut rows = self.rows.write().await;
            let before = rows.len();
            rows.retain(|(r, _), _| r != reference);
            Ok((before - rows.len()) as u64)
        }

        async fn max_confirmed_value(&self, reference: &EntryReference) -> Result<i64, PortError> {
            self.check_read()?;
            Ok(self
                .rows_for(reference)
                .await
                .iter()
                .filter(|r| r.is_confirmed())
                .map(|r| r.value_ms)
                .max()
                .unwrap_or(0))
        }

        async fn confirmed_tasks(&self, reference: &EntryReference) -> Result<Vec<TaskId>, PortError> {
            self.check_read()?;
            Ok(self
                .rows_for(reference)
                .await
                .iter()
                .filter(|r| r.is_confirmed())
                .map(|r| r.task)
                .collect())
        }
    }

    /// Fixed source snapshots keyed by reference
    #[derive(Debug, Default)]
    pub struct MockSourceRecords {
        snapshots: RwLock<HashMap<EntryReference, SourceSnapshot>>,
        failing: AtomicBool,
    }

    impl MockSourceRecords {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert(&self, reference: EntryReference, snapshot: SourceSnapshot) {
            self.snapshots.write().await.insert(reference, snapshot);
        }

        pub fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl DomainPort for MockSourceRecords {}

    #[async_trait]
    impl SourceRecords for MockSourceRecords {
        async fn fetch_sources(&self, entry: &Entry) -> Result<SourceSnapshot, PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock sources unavailable"));
            }
            Ok(self
                .snapshots
                .read()
                .await
                .get(&entry.reference)
                .copied()
                .unwrap_or_default())
        }
    }

    /// Entry list answering every query with the entries of the date
    #[derive(Debug, Default)]
    pub struct MockEntrySource {
        entries: RwLock<Vec<Entry>>,
    }

    impl MockEntrySource {
        pub fn new(entries: Vec<Entry>) -> Self {
            Self {
                entries: RwLock::new(entries),
            }
        }

        async fn on_date(&self, date: NaiveDate) -> Vec<Entry> {
            self.entries
                .read()
                .await
                .iter()
                .filter(|e| e.service_date == date)
                .cloned()
                .collect()
        }
    }

    impl DomainPort for MockEntrySource {}

    #[async_trait]
    impl EntrySource for MockEntrySource {
        async fn pending_entries(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError> {
            Ok(self.on_date(date).await)
        }

        async fn entries_for_date(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError> {
            Ok(self.on_date(date).await)
        }

        async fn entries_with_checkpoints(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError> {
            Ok(self.on_date(date).await)
        }

        async fn entries_with_unconfirmed_task(&self, date: NaiveDate, _task: TaskId) -> Result<Vec<Entry>, PortError> {
            Ok(self.on_date(date).await)
        }

        async fn entry_by_reference(&self, reference: &EntryReference) -> Result<Option<Entry>, PortError> {
            Ok(self
                .entries
                .read()
                .await
                .iter()
                .find(|e| &e.reference == reference)
                .cloned())
        }
    }

    /// Scripted reply of the mock queue service
    #[derive(Debug, Clone)]
    pub enum MockReply {
        Respond(ServiceResponse),
        Timeout,
        Garbage,
    }

    /// One call received by the mock queue service
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SubmittedTime {
        pub booking_code: BookingCode,
        pub task: TaskId,
        pub value_ms: i64,
    }

    /// Queue service double
    ///
    /// Scripted replies for a task are consumed first. Without a script the
    /// mock behaves like the real service: strictly increasing times per
    /// booking, `208 ... sudah ada` for a task accepted before.
    #[derive(Debug, Default)]
    pub struct MockQueueService {
        scripts: RwLock<HashMap<TaskId, VecDeque<MockReply>>>,
        accepted: RwLock<HashMap<BookingCode, (i64, Vec<TaskId>)>>,
        calls: RwLock<Vec<SubmittedTime>>,
    }

    impl MockQueueService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a reply for the next submission of `task`
        pub async fn script(&self, task: TaskId, reply: MockReply) {
            self.scripts.write().await.entry(task).or_default().push_back(reply);
        }

        pub async fn calls(&self) -> Vec<SubmittedTime> {
            self.calls.read().await.clone()
        }

        pub async fn calls_for(&self, task: TaskId) -> Vec<SubmittedTime> {
            self.calls.read().await.iter().filter(|c| c.task == task).cloned().collect()
        }

        async fn natural_reply(&self, booking_code: &BookingCode, task: TaskId, value_ms: i64) -> ServiceResponse {
            let mut accepted = self.accepted.write().await;
            let (last, tasks) = accepted.entry(booking_code.clone()).or_insert((0, Vec::new()));
            if tasks.contains(&task) {
                return ServiceResponse::new(CODE_ALREADY_REPORTED, format!("TaskId={} sudah ada", task.number()));
            }
            if value_ms <= *last {
                return ServiceResponse::new(
                    201,
                    format!(
                        "waktu TaskId={} tidak boleh kurang atau sama dengan TaskId sebelumnya",
                        task.number()
                    ),
                );
            }
            *last = value_ms;
            tasks.push(task);
            ServiceResponse::new(CODE_OK, "Ok.")
        }
    }

    impl DomainPort for MockQueueService {}

    #[async_trait]
    impl HealthCheckable for MockQueueService {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-queue-service", 0)
        }
    }

    #[async_trait]
    impl QueueServicePort for MockQueueService {
        async fn update_time(
            &self,
            booking_code: &BookingCode,
            task: TaskId,
            value_ms: i64,
        ) -> Result<ServiceResponse, SubmissionError> {
            self.calls.write().await.push(SubmittedTime {
                booking_code: booking_code.clone(),
                task,
                value_ms,
            });

            let scripted = self
                .scripts
                .write()
                .await
                .get_mut(&task)
                .and_then(VecDeque::pop_front);

            match scripted {
                Some(MockReply::Respond(response)) => Ok(response),
                Some(MockReply::Timeout) => Err(SubmissionError::transport("operation timed out")),
                Some(MockReply::Garbage) => Err(SubmissionError::protocol("expected value", "<html>")),
                None => Ok(self.natural_reply(booking_code, task, value_ms).await),
            }
        }
    }
}
