//! Gathers the seven checkpoint values for one entry
//!
//! Persisted rows win over source records, source records win over
//! synthesis. Synthesized values are tagged [`Slot::Generated`] so the
//! persisted note can say so.

use chrono::NaiveDateTime;
use core_kernel::temporal::{add_minutes, opening_time};
use core_kernel::{OffsetSource, Timezone};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::checkpoint::{Checkpoint, Slot, StoredCheckpoint, TaskId};
use crate::entry::{Entry, SourceSnapshot};
use crate::sequencer::advance_within;
use crate::timeline::Timeline;

/// Offset after admission when synthesizing the file dispatch
pub const DISPATCH_OFFSET_MINUTES: RangeInclusive<i64> = 1..=5;
/// Offset after dispatch when synthesizing the file receipt
pub const RECEIPT_OFFSET_MINUTES: RangeInclusive<i64> = 1..=10;
/// Offset after the default time when no dispatch exists either
pub const RECEIPT_FROM_DEFAULT_MINUTES: RangeInclusive<i64> = 3..=7;
/// Offset after receipt when synthesizing the end of clinic service
pub const CLINIC_OFFSET_MINUTES: RangeInclusive<i64> = 10..=25;

/// Builds a raw timeline from persisted rows and source records
pub struct TimelineResolver {
    timezone: Timezone,
    offsets: Arc<dyn OffsetSource>,
}

impl TimelineResolver {
    pub fn new(timezone: Timezone, offsets: Arc<dyn OffsetSource>) -> Self {
        Self { timezone, offsets }
    }

    /// Resolves the timeline of `entry`
    ///
    /// # Arguments
    ///
    /// * `entry` - The booking being reconciled
    /// * `stored` - Rows already persisted for the booking
    /// * `sources` - Values read from the hospital records
    ///
    /// # Returns
    ///
    /// A timeline where confirmed rows are copied verbatim and every other
    /// slot holds the best available value, possibly synthesized
    pub fn resolve(&self, entry: &Entry, stored: &[StoredCheckpoint], sources: &SourceSnapshot) -> Timeline {
        let mut timeline = Timeline::new();
        self.merge_stored(&mut timeline, entry, stored);

        let default = default_slot(entry, sources);

        fill(&mut timeline, TaskId::AdmissionWait, sources.admission_start.map_or(default, Slot::Observed));
        fill(&mut timeline, TaskId::AdmissionService, sources.admission_end.map_or(default, Slot::Observed));
        fill(&mut timeline, TaskId::FileDispatch, Slot::from_option(sources.file_dispatch));
        fill(&mut timeline, TaskId::FileReceipt, Slot::from_option(sources.file_receipt));
        fill(&mut timeline, TaskId::ClinicService, Slot::from_option(sources.clinic_examination));
        fill(&mut timeline, TaskId::PharmacyStart, Slot::from_option(sources.prescription_start));
        fill(&mut timeline, TaskId::PharmacyEnd, Slot::from_option(sources.prescription_end));

        self.synthesize(&mut timeline, default.value().unwrap_or_else(|| opening_time(entry.service_date)));

        let generated: Vec<u8> = timeline
            .iter()
            .filter(|(_, c)| c.is_open() && c.slot.is_generated())
            .map(|(task, _)| task.number())
            .collect();
        if !generated.is_empty() {
            debug!(reference = %entry.reference, tasks = ?generated, "fallback values generated");
        }

        timeline
    }

    fn merge_stored(&self, timeline: &mut Timeline, entry: &Entry, stored: &[StoredCheckpoint]) {
        for row in stored {
            if row.reference != entry.reference {
                warn!(reference = %entry.reference, other = %row.reference, "ignoring checkpoint row of another entry");
                continue;
            }
            let Some(value) = self.timezone.from_millis(row.value_ms) else {
                continue;
            };
            let slot = if row.is_generated() {
                Slot::Generated(value)
            } else {
                Slot::Observed(value)
            };
            let checkpoint = if row.is_confirmed() {
                Checkpoint::confirmed(slot)
            } else {
                Checkpoint::pending(slot)
            };
            timeline.put(row.task, checkpoint);
        }
    }

    fn synthesize(&self, timeline: &mut Timeline, default: NaiveDateTime) {
        if !timeline.is_present(TaskId::FileDispatch) {
            let base = timeline
                .value(TaskId::AdmissionService)
                .or(timeline.value(TaskId::AdmissionWait))
                .unwrap_or(default);
            let minutes = self.offsets.offset_minutes(DISPATCH_OFFSET_MINUTES);
            timeline.set(TaskId::FileDispatch, Slot::Generated(add_minutes(base, minutes)));
        }

        if !timeline.is_present(TaskId::FileReceipt) {
            let value = match timeline.value(TaskId::FileDispatch) {
                Some(dispatch) => {
                    let minutes = self.offsets.offset_minutes(RECEIPT_OFFSET_MINUTES);
                    advance_within(dispatch, timeline.value(TaskId::ClinicService), minutes)
                }
                None => add_minutes(default, self.offsets.offset_minutes(RECEIPT_FROM_DEFAULT_MINUTES)),
            };
            timeline.set(TaskId::FileReceipt, Slot::Generated(value));
        }

        if !timeline.is_present(TaskId::ClinicService) {
            let base = timeline
                .value(TaskId::FileReceipt)
                .or(timeline.value(TaskId::FileDispatch))
                .unwrap_or(default);
            let minutes = self.offsets.offset_minutes(CLINIC_OFFSET_MINUTES);
            timeline.set(TaskId::ClinicService, Slot::Generated(add_minutes(base, minutes)));
        }
    }
}

/// Registration time when known, otherwise opening time on the service date
fn default_slot(entry: &Entry, sources: &SourceSnapshot) -> Slot {
    match sources.registration {
        Some(registered) => Slot::Observed(registered),
        None => Slot::Generated(opening_time(entry.service_date)),
    }
}

fn fill(timeline: &mut Timeline, task: TaskId, slot: Slot) {
    if !timeline.is_present(task) && slot.is_present() {
        timeline.set(task, slot);
    }
}
