//! Forward shift of downstream slots after a conflict retry
//!
//! When a slot has to be resubmitted one hour later, every open slot after
//! it that would no longer be strictly later is moved forward. The shift is
//! a pure computation; the caller persists the returned changes.

use chrono::NaiveDateTime;
use core_kernel::OffsetSource;

use crate::checkpoint::TaskId;
use crate::sequencer::{advance_within, REPAIR_OFFSET_MINUTES};
use crate::timeline::Timeline;

/// Result of a cascade: the new timeline plus the slots that moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    pub timeline: Timeline,
    pub shifted: Vec<(TaskId, NaiveDateTime)>,
}

/// Shifts open slots after `from` so each stays strictly after `base`
///
/// Walks the slots after `from` in order. A slot at or before the running
/// base moves to base + U(1..5) minutes, clamped below the next present
/// slot, and becomes the new base. A slot already later than the base just
/// raises it. Confirmed slots are never moved.
pub fn cascade_forward(
    timeline: &Timeline,
    from: TaskId,
    base: NaiveDateTime,
    offsets: &dyn OffsetSource,
) -> Cascade {
    let mut next_timeline = *timeline;
    let mut shifted = Vec::new();
    let mut base = base;

    for task in from.following() {
        let checkpoint = *next_timeline.get(task);
        let Some(current) = checkpoint.value() else {
            continue;
        };

        if current > base || checkpoint.is_confirmed() {
            base = base.max(current);
            continue;
        }

        let successor = task.next().and_then(|t| next_timeline.value(t));
        let minutes = offsets.offset_minutes(REPAIR_OFFSET_MINUTES);
        let moved = advance_within(base, successor, minutes);
        next_timeline.shift(task, moved);
        shifted.push((task, moved));
        base = moved;
    }

    Cascade {
        timeline: next_timeline,
        shifted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{Checkpoint, Slot};
    use chrono::NaiveDate;
    use core_kernel::FixedOffsets;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_shifts_only_slots_behind_base() {
        let timeline = Timeline::from_values([
            Some(at(8, 0)),
            Some(at(8, 5)),
            Some(at(8, 10)),
            Some(at(8, 40)),
            Some(at(9, 30)),
            None,
            None,
        ]);
        let result = cascade_forward(&timeline, TaskId::FileDispatch, at(9, 10), &FixedOffsets(2));

        assert_eq!(result.shifted, vec![(TaskId::FileReceipt, at(9, 12))]);
        assert_eq!(result.timeline.value(TaskId::FileReceipt), Some(at(9, 12)));
        assert_eq!(result.timeline.value(TaskId::ClinicService), Some(at(9, 30)));
        // Input is untouched
        assert_eq!(timeline.value(TaskId::FileReceipt), Some(at(8, 40)));
    }

    #[test]
    fn test_shift_chains_through_later_slots() {
        let timeline = Timeline::from_values([
            None,
            None,
            Some(at(8, 10)),
            Some(at(8, 40)),
            Some(at(9, 0)),
            Some(at(9, 5)),
            Some(at(9, 20)),
        ]);
        let result = cascade_forward(&timeline, TaskId::FileDispatch, at(9, 10), &FixedOffsets(3));

        assert_eq!(
            result.shifted,
            vec![
                // Successors are still at their old values, so the first two clamp to one minute
                (TaskId::FileReceipt, at(9, 11)),
                (TaskId::ClinicService, at(9, 12)),
                (TaskId::PharmacyStart, at(9, 15)),
            ]
        );
        assert_eq!(result.timeline.value(TaskId::PharmacyEnd), Some(at(9, 20)));
    }

    #[test]
    fn test_clamp_below_successor() {
        let timeline = Timeline::from_values([
            None,
            None,
            Some(at(8, 10)),
            Some(at(8, 40)),
            Some(at(9, 12)),
            None,
            None,
        ]);
        let result = cascade_forward(&timeline, TaskId::FileDispatch, at(9, 10), &FixedOffsets(5));
        assert_eq!(result.shifted, vec![(TaskId::FileReceipt, at(9, 11))]);
    }

    #[test]
    fn test_confirmed_slots_stay() {
        let mut timeline = Timeline::from_values([None, None, Some(at(8, 10)), None, Some(at(8, 30)), None, None]);
        timeline.put(TaskId::FileReceipt, Checkpoint::confirmed(Slot::Observed(at(8, 20))));

        let result = cascade_forward(&timeline, TaskId::FileDispatch, at(9, 10), &FixedOffsets(1));
        assert_eq!(result.timeline.value(TaskId::FileReceipt), Some(at(8, 20)));
        assert_eq!(result.shifted, vec![(TaskId::ClinicService, at(9, 11))]);
    }
}
