//! One-entry orchestration
//!
//! Resolve, sequence, persist, then optionally submit. Every operation
//! returns an [`EntryOutcome`]; errors end up in the outcome instead of
//! aborting the caller's batch.

use core_kernel::{OffsetSource, Timezone};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::checkpoint::{StoredCheckpoint, TaskId};
use crate::entry::Entry;
use crate::error::ReconcileError;
use crate::outcome::{EntryOutcome, SlotOutcome, SlotStatus};
use crate::ports::{CheckpointStore, QueueServicePort, SourceRecords};
use crate::resolver::TimelineResolver;
use crate::sequencer::Sequencer;
use crate::submission::{SubmissionEngine, SubmissionScope};
use crate::timeline::Timeline;

pub struct Reconciler {
    sources: Arc<dyn SourceRecords>,
    store: Arc<dyn CheckpointStore>,
    resolver: TimelineResolver,
    sequencer: Sequencer,
    engine: SubmissionEngine,
    timezone: Timezone,
}

impl Reconciler {
    pub fn new(
        sources: Arc<dyn SourceRecords>,
        store: Arc<dyn CheckpointStore>,
        service: Arc<dyn QueueServicePort>,
        timezone: Timezone,
        offsets: Arc<dyn OffsetSource>,
    ) -> Self {
        Self {
            sources,
            resolver: TimelineResolver::new(timezone, offsets.clone()),
            sequencer: Sequencer::new(offsets.clone()),
            engine: SubmissionEngine::new(store.clone(), service, timezone, offsets),
            store,
            timezone,
        }
    }

    /// Resolves, normalizes and persists the timeline without submitting
    #[instrument(skip(self, entry), fields(reference = %entry.reference))]
    pub async fn auto_order(&self, entry: &Entry) -> EntryOutcome {
        match self.prepare(entry).await {
            Ok(timeline) => {
                let mut outcome = EntryOutcome::for_entry(entry);
                outcome.auto_order_done = true;
                outcome.slots = self.pending_slots(&timeline);
                outcome
            }
            Err(err) => {
                warn!(error = %err, "auto order failed");
                EntryOutcome::failed(entry, err)
            }
        }
    }

    /// Auto-orders then submits every open slot
    #[instrument(skip(self, entry), fields(reference = %entry.reference))]
    pub async fn reconcile(&self, entry: &Entry) -> EntryOutcome {
        self.run(entry, SubmissionScope::All).await
    }

    /// Auto-orders then submits only `task`
    #[instrument(skip(self, entry, task), fields(reference = %entry.reference, %task))]
    pub async fn retry_task(&self, entry: &Entry, task: TaskId) -> EntryOutcome {
        self.run(entry, SubmissionScope::Only(task)).await
    }

    /// Drops every persisted row of the entry, then auto-orders from the
    /// source records alone
    ///
    /// Confirmed rows are dropped too, so the rebuilt timeline may propose
    /// values the service already holds. The next submission converges
    /// through duplicate acceptance.
    #[instrument(skip(self, entry), fields(reference = %entry.reference))]
    pub async fn rebuild(&self, entry: &Entry) -> EntryOutcome {
        match self.store.delete_all(&entry.reference).await {
            Ok(removed) => debug!(removed, "persisted checkpoints deleted"),
            Err(err) => {
                let err = ReconcileError::Store(err);
                warn!(error = %err, "rebuild failed");
                return EntryOutcome::failed(entry, err);
            }
        }
        self.auto_order(entry).await
    }

    /// Resolves, normalizes and persists the timeline of `entry`
    ///
    /// # Returns
    ///
    /// The normalized timeline, or [`ReconcileError::NoTaskTimes`] when no
    /// slot holds a value
    pub async fn prepare(&self, entry: &Entry) -> Result<Timeline, ReconcileError> {
        let stored = self
            .store
            .get_all(&entry.reference)
            .await
            .map_err(ReconcileError::Store)?;
        let sources = self
            .sources
            .fetch_sources(entry)
            .await
            .map_err(ReconcileError::Sources)?;

        let resolved = self.resolver.resolve(entry, &stored, &sources);
        let timeline = self.sequencer.normalize(resolved);
        if !timeline.has_any_value() {
            return Err(ReconcileError::NoTaskTimes);
        }

        self.persist(entry, &timeline).await?;
        Ok(timeline)
    }

    async fn run(&self, entry: &Entry, scope: SubmissionScope) -> EntryOutcome {
        let mut timeline = match self.prepare(entry).await {
            Ok(timeline) => timeline,
            Err(err) => {
                warn!(error = %err, "entry skipped");
                return EntryOutcome::failed(entry, err);
            }
        };

        let mut outcome = EntryOutcome::for_entry(entry);
        outcome.auto_order_done = true;

        match self.engine.submit(entry, &mut timeline, scope).await {
            Ok(report) => {
                outcome.submission_done = report.success;
                outcome.slots = report.slots;
                info!(success = report.success, "entry submitted");
            }
            Err(err) => {
                warn!(error = %err, "submission aborted");
                outcome.slots = self.pending_slots(&timeline);
                outcome.error = Some(err.to_string());
            }
        }
        outcome
    }

    async fn persist(&self, entry: &Entry, timeline: &Timeline) -> Result<(), ReconcileError> {
        for (task, checkpoint) in timeline.iter() {
            if !checkpoint.is_open() {
                continue;
            }
            let row = StoredCheckpoint::pending(
                entry.reference.clone(),
                entry.service_date,
                task,
                timeline.millis(task, &self.timezone),
                checkpoint.slot.is_generated(),
            );
            self.store.upsert_pending(&row).await.map_err(ReconcileError::Store)?;
        }
        Ok(())
    }

    fn pending_slots(&self, timeline: &Timeline) -> Vec<SlotOutcome> {
        timeline
            .iter()
            .map(|(task, checkpoint)| {
                let status = if checkpoint.is_confirmed() {
                    SlotStatus::Skipped
                } else if checkpoint.value().is_some() {
                    SlotStatus::Pending
                } else {
                    SlotStatus::Empty
                };
                let mut slot = SlotOutcome::new(task, checkpoint.value(), timeline.millis(task, &self.timezone), status);
                slot.generated = checkpoint.slot.is_generated();
                slot
            })
            .collect()
    }
}
