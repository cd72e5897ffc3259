//! Submission of checkpoint times to the queue service
//!
//! Slots are sent one at a time in task order. The service only accepts
//! strictly increasing times per booking, so the engine keeps track of the
//! last accepted value, bumps stale values past it, and answers a
//! monotonicity rejection with a single retry one hour later, shifting the
//! downstream slots forward first when needed.

use core_kernel::{OffsetSource, Timezone};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cascade::cascade_forward;
use crate::checkpoint::TaskId;
use crate::entry::Entry;
use crate::error::ReconcileError;
use crate::outcome::{SlotOutcome, SlotStatus};
use crate::ports::{CheckpointStore, QueueServicePort};
use crate::response::{ServiceResponse, Verdict};
use crate::timeline::Timeline;

/// Step applied when a value is not after the last accepted one
pub const BUMP_MS: i64 = 60_000;

/// Delay added to the resubmission after a monotonicity rejection
pub const RETRY_DELTA_MS: i64 = 3_600_000;

/// Which slots a submission covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionScope {
    #[default]
    All,
    Only(TaskId),
}

impl SubmissionScope {
    pub fn includes(&self, task: TaskId) -> bool {
        match self {
            SubmissionScope::All => true,
            SubmissionScope::Only(only) => *only == task,
        }
    }
}

/// Result of submitting one timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub slots: Vec<SlotOutcome>,
    /// Every submitted slot ended confirmed
    pub success: bool,
}

pub struct SubmissionEngine {
    store: Arc<dyn CheckpointStore>,
    service: Arc<dyn QueueServicePort>,
    timezone: Timezone,
    offsets: Arc<dyn OffsetSource>,
}

impl SubmissionEngine {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        service: Arc<dyn QueueServicePort>,
        timezone: Timezone,
        offsets: Arc<dyn OffsetSource>,
    ) -> Self {
        Self {
            store,
            service,
            timezone,
            offsets,
        }
    }

    /// Submits the open slots of `timeline` that fall within `scope`
    ///
    /// # Arguments
    ///
    /// * `entry` - The booking being submitted
    /// * `timeline` - Normalized timeline; updated in place when values move
    /// * `scope` - All slots, or a single task
    ///
    /// # Returns
    ///
    /// Per-slot outcomes, or an error when the confirmed state could not be
    /// read. Failures of single slots never abort the others.
    pub async fn submit(
        &self,
        entry: &Entry,
        timeline: &mut Timeline,
        scope: SubmissionScope,
    ) -> Result<SubmissionReport, ReconcileError> {
        let reference = &entry.reference;
        let mut last_accepted = self
            .store
            .max_confirmed_value(reference)
            .await
            .map_err(ReconcileError::Store)?;
        for task in self
            .store
            .confirmed_tasks(reference)
            .await
            .map_err(ReconcileError::Store)?
        {
            timeline.confirm(task);
        }

        let mut slots = Vec::with_capacity(TaskId::ALL.len());
        let mut success = true;

        for task in TaskId::ALL {
            let checkpoint = *timeline.get(task);

            if checkpoint.is_confirmed() {
                let value_ms = timeline.millis(task, &self.timezone);
                let mut skipped = SlotOutcome::new(task, checkpoint.value(), value_ms, SlotStatus::Skipped);
                skipped.message = Some("already confirmed".to_string());
                debug!(%reference, %task, "skipped, already confirmed");
                slots.push(skipped);
                continue;
            }

            if checkpoint.value().is_none() {
                slots.push(SlotOutcome::empty(task));
                continue;
            }

            if !scope.includes(task) {
                let value_ms = timeline.millis(task, &self.timezone);
                let mut pending = SlotOutcome::new(task, checkpoint.value(), value_ms, SlotStatus::Pending);
                pending.generated = checkpoint.slot.is_generated();
                slots.push(pending);
                continue;
            }

            let outcome = self.submit_slot(entry, timeline, task, &mut last_accepted).await;
            if outcome.status != SlotStatus::Confirmed {
                success = false;
            }
            slots.push(outcome);
        }

        Ok(SubmissionReport { slots, success })
    }

    async fn submit_slot(
        &self,
        entry: &Entry,
        timeline: &mut Timeline,
        task: TaskId,
        last_accepted: &mut i64,
    ) -> SlotOutcome {
        let reference = &entry.reference;
        let generated = timeline.get(task).slot.is_generated();
        let mut value_ms = timeline.millis(task, &self.timezone);

        if *last_accepted > 0 && value_ms <= *last_accepted {
            value_ms = *last_accepted + BUMP_MS;
            debug!(%reference, %task, value_ms, "value not after last accepted, bumping");
            self.move_slot(entry, timeline, task, value_ms).await;
        }

        let mut outcome = SlotOutcome::new(task, self.timezone.from_millis(value_ms), value_ms, SlotStatus::Pending);
        outcome.generated = generated;

        let response = match self.service.update_time(&entry.booking_code, task, value_ms).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%reference, %task, error = %err, "submission failed");
                outcome.status = SlotStatus::Failed;
                outcome.message = Some(err.to_string());
                return outcome;
            }
        };

        outcome.response_code = Some(response.code());
        match response.verdict() {
            verdict @ (Verdict::Accepted | Verdict::Duplicate) => {
                info!(%reference, %task, code = response.code(), "accepted");
                self.confirm_slot(entry, timeline, task).await;
                *last_accepted = value_ms;
                outcome.status = SlotStatus::Confirmed;
                if verdict == Verdict::Duplicate {
                    outcome.message = Some(response.message().to_string());
                }
                outcome
            }
            Verdict::Conflict => {
                self.retry_after_conflict(entry, timeline, task, value_ms, last_accepted, &response, outcome)
                    .await
            }
            Verdict::Rejected => {
                warn!(%reference, %task, code = response.code(), message = response.message(), "rejected");
                outcome.status = SlotStatus::Failed;
                outcome.message = Some(response.message().to_string());
                outcome
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn retry_after_conflict(
        &self,
        entry: &Entry,
        timeline: &mut Timeline,
        task: TaskId,
        value_ms: i64,
        last_accepted: &mut i64,
        rejection: &ServiceResponse,
        mut outcome: SlotOutcome,
    ) -> SlotOutcome {
        let reference = &entry.reference;
        let retry_ms = value_ms.max(*last_accepted) + RETRY_DELTA_MS;
        outcome.retried = true;
        debug!(%reference, %task, retry_ms, "time conflict, retrying one hour later");

        let next_min_ms = timeline
            .min_open_after(task)
            .map(|next| self.timezone.to_millis(Some(next)));
        if let (Some(next_min_ms), Some(base)) = (next_min_ms, self.timezone.from_millis(retry_ms)) {
            if retry_ms >= next_min_ms {
                let cascade = cascade_forward(timeline, task, base, self.offsets.as_ref());
                *timeline = cascade.timeline;
                for (shifted, value) in cascade.shifted {
                    let shifted_ms = self.timezone.to_millis(Some(value));
                    debug!(%reference, task = %shifted, value_ms = shifted_ms, "shifted forward");
                    self.persist_value(entry, shifted, shifted_ms).await;
                }
            }
        }

        match self.service.update_time(&entry.booking_code, task, retry_ms).await {
            Ok(response) if response.verdict().is_acceptance() => {
                info!(%reference, %task, code = response.code(), "accepted after retry");
                self.move_slot(entry, timeline, task, retry_ms).await;
                self.confirm_slot(entry, timeline, task).await;
                *last_accepted = retry_ms;
                outcome.value = self.timezone.from_millis(retry_ms);
                outcome.value_ms = retry_ms;
                outcome.response_code = Some(response.code());
                outcome.status = SlotStatus::Confirmed;
                outcome.message = (response.verdict() == Verdict::Duplicate).then(|| response.message().to_string());
                outcome
            }
            Ok(response) => {
                warn!(%reference, %task, code = response.code(), message = response.message(), "retry rejected");
                outcome.status = SlotStatus::Failed;
                outcome.response_code = Some(response.code());
                outcome.message = Some(response.message().to_string());
                outcome
            }
            Err(err) => {
                warn!(%reference, %task, error = %err, "retry failed");
                outcome.status = SlotStatus::Failed;
                outcome.message = Some(format!("{} (retry: {})", rejection.message(), err));
                outcome
            }
        }
    }

    async fn move_slot(&self, entry: &Entry, timeline: &mut Timeline, task: TaskId, value_ms: i64) {
        if let Some(value) = self.timezone.from_millis(value_ms) {
            timeline.shift(task, value);
        }
        self.persist_value(entry, task, value_ms).await;
    }

    async fn persist_value(&self, entry: &Entry, task: TaskId, value_ms: i64) {
        if let Err(err) = self.store.update_value(&entry.reference, task, value_ms).await {
            warn!(reference = %entry.reference, %task, error = %err, "failed to persist shifted value");
        }
    }

    async fn confirm_slot(&self, entry: &Entry, timeline: &mut Timeline, task: TaskId) {
        timeline.confirm(task);
        if let Err(err) = self.store.mark_confirmed(&entry.reference, task).await {
            warn!(reference = %entry.reference, %task, error = %err, "failed to persist confirmation");
        }
    }
}
