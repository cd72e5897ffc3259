//! Ordering and business-validity rules for a timeline
//!
//! The sequencer turns whatever the resolver produced into a timeline the
//! queue service will accept: nothing before opening hours, every open slot
//! strictly later than all slots before it, and the pharmacy pair either
//! complete and distinct or absent. Confirmed slots are never moved; they
//! only act as lower bounds.

use chrono::NaiveDateTime;
use core_kernel::temporal::{add_minutes, floor_to_opening, whole_minutes_between};
use core_kernel::OffsetSource;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::debug;

use crate::checkpoint::TaskId;
use crate::timeline::Timeline;

/// Offset range used when a slot must be pushed after its predecessor
pub const REPAIR_OFFSET_MINUTES: RangeInclusive<i64> = 1..=5;

/// Moves `base` forward by `minutes`, staying below `successor`
///
/// When the candidate would reach the successor, the step shrinks to one
/// minute short of it, but never below one minute.
pub fn advance_within(base: NaiveDateTime, successor: Option<NaiveDateTime>, minutes: i64) -> NaiveDateTime {
    let candidate = add_minutes(base, minutes);
    match successor {
        Some(next) if candidate >= next => {
            let allowed = (whole_minutes_between(base, next) - 1).max(1);
            add_minutes(base, allowed)
        }
        _ => candidate,
    }
}

/// Applies the ordering rules to a timeline
pub struct Sequencer {
    offsets: Arc<dyn OffsetSource>,
}

impl Sequencer {
    pub fn new(offsets: Arc<dyn OffsetSource>) -> Self {
        Self { offsets }
    }

    /// Returns the normalized timeline
    ///
    /// Running it again on its own output changes nothing.
    pub fn normalize(&self, mut timeline: Timeline) -> Timeline {
        self.drop_equal_pharmacy_pair(&mut timeline);
        floor_open_slots(&mut timeline);
        self.repair_file_receipt(&mut timeline);
        self.enforce_monotonic(&mut timeline);
        drop_incomplete_pharmacy_pair(&mut timeline);
        drop_pharmacy_matching_admission(&mut timeline);
        timeline
    }

    fn drop_equal_pharmacy_pair(&self, timeline: &mut Timeline) {
        let start = timeline.value(TaskId::PharmacyStart);
        let end = timeline.value(TaskId::PharmacyEnd);
        if start.is_some() && start == end {
            debug!("pharmacy start equals end, clearing both");
            clear_pharmacy(timeline);
        }
    }

    fn repair_file_receipt(&self, timeline: &mut Timeline) {
        let (Some(dispatch), Some(receipt)) = (
            timeline.value(TaskId::FileDispatch),
            timeline.value(TaskId::FileReceipt),
        ) else {
            return;
        };
        if receipt > dispatch || !timeline.get(TaskId::FileReceipt).is_open() {
            return;
        }
        let minutes = self.offsets.offset_minutes(REPAIR_OFFSET_MINUTES);
        let repaired = advance_within(dispatch, timeline.value(TaskId::ClinicService), minutes);
        debug!(from = %receipt, to = %repaired, "file receipt not after dispatch, shifting");
        timeline.shift(TaskId::FileReceipt, repaired);
    }

    fn enforce_monotonic(&self, timeline: &mut Timeline) {
        let mut previous = timeline.value(TaskId::AdmissionWait);

        for task in TaskId::ALL.into_iter().skip(1) {
            let Some(current) = timeline.value(task) else {
                continue;
            };

            if let Some(prev) = previous {
                if current <= prev && timeline.get(task).is_open() {
                    let next = task.following().find_map(|t| timeline.value(t));
                    let minutes = self.offsets.offset_minutes(REPAIR_OFFSET_MINUTES);
                    let repaired = advance_within(prev, next, minutes);
                    debug!(%task, from = %current, to = %repaired, "slot not after predecessor, shifting");
                    timeline.shift(task, repaired);
                }
            }

            // Running maximum, so confirmed slots that sit out of order still bound later ones
            let effective = timeline.value(task).unwrap_or(current);
            previous = Some(previous.map_or(effective, |p| p.max(effective)));
        }
    }
}

fn floor_open_slots(timeline: &mut Timeline) {
    for task in TaskId::ALL {
        let checkpoint = *timeline.get(task);
        if !checkpoint.is_open() {
            continue;
        }
        if let Some(value) = checkpoint.value() {
            let floored = floor_to_opening(value);
            if floored != value {
                timeline.shift(task, floored);
            }
        }
    }
}

fn drop_incomplete_pharmacy_pair(timeline: &mut Timeline) {
    if !timeline.is_present(TaskId::PharmacyStart) || !timeline.is_present(TaskId::PharmacyEnd) {
        clear_pharmacy(timeline);
    }
}

fn drop_pharmacy_matching_admission(timeline: &mut Timeline) {
    let admission = [
        timeline.value(TaskId::AdmissionWait),
        timeline.value(TaskId::AdmissionService),
    ];
    let pharmacy = [
        timeline.value(TaskId::PharmacyStart),
        timeline.value(TaskId::PharmacyEnd),
    ];
    let collides = pharmacy
        .iter()
        .flatten()
        .any(|p| admission.iter().flatten().any(|a| a == p));
    if collides {
        debug!("pharmacy time equals an admission time, clearing both");
        clear_pharmacy(timeline);
    }
}

fn clear_pharmacy(timeline: &mut Timeline) {
    timeline.clear(TaskId::PharmacyStart);
    timeline.clear(TaskId::PharmacyEnd);
}
