//! Manual batch operations over one service date
//!
//! | kind          | entries selected                      | operation per entry      |
//! |---------------|---------------------------------------|--------------------------|
//! | `autoorder`   | every booking of the payer            | auto-order (no sending)  |
//! | `updatewaktu` | bookings with persisted checkpoints   | reconcile                |
//! | `all`         | every booking of the payer            | reconcile                |
//! | `retry-task`  | bookings whose task is still unsent   | auto-order, send the task|
//!
//! `retry-task` first takes the bookings whose archived outcome of that day
//! shows the task failed, and falls back to the unconfirmed rows in the
//! database when the archive has none.
//!
//! With `rebuild`, every persisted row of each entry, confirmed ones
//! included, is deleted before the timeline is rebuilt from the source
//! records.

use chrono::NaiveDate;
use core_kernel::{PassId, Timezone};
use domain_queue::{Entry, EntryOutcome, EntrySource, Reconciler, SlotStatus, TaskId};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::ServiceError;
use crate::report::ReportStore;

/// Which batch to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchKind {
    AutoOrder,
    UpdateTime,
    All,
    RetryTask,
}

impl BatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::AutoOrder => "autoorder",
            BatchKind::UpdateTime => "updatewaktu",
            BatchKind::All => "all",
            BatchKind::RetryTask => "retry-task",
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autoorder" => Ok(BatchKind::AutoOrder),
            "updatewaktu" => Ok(BatchKind::UpdateTime),
            "all" => Ok(BatchKind::All),
            "retry-task" => Ok(BatchKind::RetryTask),
            other => Err(ServiceError::Configuration(format!("unknown batch type: {other}"))),
        }
    }
}

/// Options of one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Task retried by `retry-task`
    pub task: TaskId,
    /// Delete every persisted row, confirmed ones included, before auto-ordering
    pub rebuild: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            task: TaskId::FileDispatch,
            rebuild: false,
        }
    }
}

/// Totals of one batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub kind: BatchKind,
    pub date: NaiveDate,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs batches sequentially, one entry at a time
pub struct BatchRunner {
    entries: Arc<dyn EntrySource>,
    reconciler: Arc<Reconciler>,
    reports: Option<Arc<ReportStore>>,
    timezone: Timezone,
}

impl BatchRunner {
    pub fn new(
        entries: Arc<dyn EntrySource>,
        reconciler: Arc<Reconciler>,
        reports: Option<Arc<ReportStore>>,
        timezone: Timezone,
    ) -> Self {
        Self {
            entries,
            reconciler,
            reports,
            timezone,
        }
    }

    /// Runs one batch over a service date
    ///
    /// Entry failures are counted and recorded; only a failure to select the
    /// entries aborts the run.
    #[instrument(skip(self, options), fields(pass = %PassId::new(), rebuild = options.rebuild))]
    pub async fn run(&self, kind: BatchKind, date: NaiveDate, options: BatchOptions) -> Result<BatchSummary, ServiceError> {
        let entries = self.select(kind, date, options.task).await?;
        info!(count = entries.len(), "Starting batch {} for {}", kind, date);

        let mut succeeded = 0;
        for (idx, entry) in entries.iter().enumerate() {
            info!(
                reference = %entry.reference,
                patient = entry.patient_name.as_deref().unwrap_or("-"),
                clinic = entry.clinic_name.as_deref().unwrap_or("-"),
                "[{}/{}] {}",
                idx + 1,
                entries.len(),
                entry.medical_record
            );

            let outcome = self.process(kind, entry, options).await;
            let ok = match kind {
                BatchKind::AutoOrder => outcome.auto_order_done,
                _ => outcome.submission_done,
            };
            if ok {
                succeeded += 1;
            } else if let Some(error) = &outcome.error {
                warn!(reference = %entry.reference, %error, "Entry failed");
            }

            self.record(outcome).await;
        }

        let summary = BatchSummary {
            kind,
            date,
            total: entries.len(),
            succeeded,
            failed: entries.len() - succeeded,
        };
        info!(total = summary.total, succeeded = summary.succeeded, "Batch {} finished", kind);
        Ok(summary)
    }

    async fn select(&self, kind: BatchKind, date: NaiveDate, task: TaskId) -> Result<Vec<Entry>, ServiceError> {
        let entries = match kind {
            BatchKind::AutoOrder | BatchKind::All => self.entries.entries_for_date(date).await?,
            BatchKind::UpdateTime => self.entries.entries_with_checkpoints(date).await?,
            BatchKind::RetryTask => {
                let archived = self.archived_failures(date, task).await?;
                if archived.is_empty() {
                    self.entries.entries_with_unconfirmed_task(date, task).await?
                } else {
                    archived
                }
            }
        };
        Ok(entries)
    }

    /// Bookings whose archived outcome on `date` has `task` failed
    async fn archived_failures(&self, date: NaiveDate, task: TaskId) -> Result<Vec<Entry>, ServiceError> {
        let Some(reports) = &self.reports else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for outcome in reports.results(date).await? {
            let failed = outcome
                .slot(task)
                .is_some_and(|slot| slot.status == SlotStatus::Failed);
            if !failed {
                continue;
            }
            match self.entries.entry_by_reference(&outcome.reference).await? {
                Some(entry) => entries.push(entry),
                None => debug!(reference = %outcome.reference, "Archived booking no longer exists"),
            }
        }
        Ok(entries)
    }

    async fn process(&self, kind: BatchKind, entry: &Entry, options: BatchOptions) -> EntryOutcome {
        if options.rebuild {
            let rebuilt = self.reconciler.rebuild(entry).await;
            if kind == BatchKind::AutoOrder || rebuilt.error.is_some() {
                return rebuilt;
            }
        }

        match kind {
            BatchKind::AutoOrder => self.reconciler.auto_order(entry).await,
            BatchKind::UpdateTime | BatchKind::All => self.reconciler.reconcile(entry).await,
            BatchKind::RetryTask => self.reconciler.retry_task(entry, options.task).await,
        }
    }

    async fn record(&self, outcome: EntryOutcome) {
        let Some(reports) = &self.reports else {
            return;
        };
        let reference = outcome.reference.clone();
        if let Err(e) = reports.save(self.timezone.today(), outcome).await {
            warn!(%reference, error = %e, "Failed to archive outcome");
        }
    }
}
