//! Poll scheduler
//!
//! Every poll interval the watcher selects today's pending entries and
//! reconciles them one by one. The loop runs on its own task and stops when
//! its cancellation token fires.

use core_kernel::{PassId, Timezone};
use domain_queue::{EntrySource, Reconciler};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::report::ReportStore;

/// Cancellable poll loop
#[derive(Clone)]
pub struct Watcher {
    entries: Arc<dyn EntrySource>,
    reconciler: Arc<Reconciler>,
    reports: Option<Arc<ReportStore>>,
    timezone: Timezone,
    poll_interval: Duration,
    cancel: CancellationToken,
    processed: Arc<AtomicU64>,
}

impl Watcher {
    pub fn new(
        entries: Arc<dyn EntrySource>,
        reconciler: Arc<Reconciler>,
        reports: Option<Arc<ReportStore>>,
        timezone: Timezone,
        poll_interval: Duration,
    ) -> Self {
        Self {
            entries,
            reconciler,
            reports,
            timezone,
            poll_interval,
            cancel: CancellationToken::new(),
            processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawns the poll loop
    ///
    /// The first poll happens immediately. The returned handle completes
    /// once [`Watcher::stop`] was called and the current poll finished.
    pub fn start(&self) -> JoinHandle<()> {
        let watcher = self.clone();
        tokio::spawn(async move {
            info!(interval_secs = watcher.poll_interval.as_secs(), "Watching for new entries");
            let mut ticker = tokio::time::interval(watcher.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = watcher.cancel.cancelled() => {
                        info!(processed = watcher.processed(), "Watcher stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        watcher.check_and_process().await;
                    }
                }
            }
        })
    }

    /// Requests the loop to stop
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Entries processed since the watcher was created
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Runs one poll
    ///
    /// # Returns
    ///
    /// The number of entries processed
    #[instrument(skip(self), fields(pass = %PassId::new()))]
    pub async fn check_and_process(&self) -> usize {
        let today = self.timezone.today();
        let entries = match self.entries.pending_entries(today).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Error fetching entries");
                return 0;
            }
        };

        if entries.is_empty() {
            debug!("No pending entries");
            return 0;
        }

        info!(count = entries.len(), "Found pending entries");
        for entry in &entries {
            if self.cancel.is_cancelled() {
                break;
            }

            let outcome = self.reconciler.reconcile(entry).await;
            self.processed.fetch_add(1, Ordering::Relaxed);

            if outcome.submission_done {
                info!(reference = %entry.reference, "Entry reconciled");
            } else {
                warn!(
                    reference = %entry.reference,
                    error = outcome.error.as_deref().unwrap_or("submission incomplete"),
                    "Entry not fully reconciled"
                );
            }

            if let Some(reports) = &self.reports {
                if let Err(e) = reports.save(today, outcome).await {
                    warn!(reference = %entry.reference, error = %e, "Failed to archive outcome");
                }
            }
        }

        entries.len()
    }
}
