//! The seven-slot timeline of one booking

use chrono::NaiveDateTime;
use core_kernel::Timezone;
use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::checkpoint::{Checkpoint, CheckpointStatus, Slot, TaskId};

/// Fixed, ordered array of checkpoints indexed by [`TaskId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timeline {
    slots: [Checkpoint; 7],
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pending timeline from raw values, all marked observed
    pub fn from_values(values: [Option<NaiveDateTime>; 7]) -> Self {
        let mut timeline = Self::new();
        for task in TaskId::ALL {
            timeline.slots[task.index()] = Checkpoint::pending(Slot::from_option(values[task.index()]));
        }
        timeline
    }

    pub fn get(&self, task: TaskId) -> &Checkpoint {
        &self.slots[task.index()]
    }

    pub fn value(&self, task: TaskId) -> Option<NaiveDateTime> {
        self.slots[task.index()].value()
    }

    pub fn is_confirmed(&self, task: TaskId) -> bool {
        self.slots[task.index()].is_confirmed()
    }

    pub fn is_present(&self, task: TaskId) -> bool {
        self.slots[task.index()].slot.is_present()
    }

    /// Replaces a whole checkpoint, regardless of status
    pub fn put(&mut self, task: TaskId, checkpoint: Checkpoint) {
        self.slots[task.index()] = checkpoint;
    }

    /// Sets a pending slot; confirmed slots are left untouched
    pub fn set(&mut self, task: TaskId, slot: Slot) -> bool {
        let checkpoint = &mut self.slots[task.index()];
        if checkpoint.is_confirmed() {
            return false;
        }
        checkpoint.slot = slot;
        true
    }

    /// Moves a pending slot to a new value, keeping its origin
    pub fn shift(&mut self, task: TaskId, value: NaiveDateTime) -> bool {
        let current = self.slots[task.index()].slot;
        self.set(task, current.with_value(value))
    }

    /// Clears a pending slot
    pub fn clear(&mut self, task: TaskId) -> bool {
        self.set(task, Slot::Unset)
    }

    pub fn confirm(&mut self, task: TaskId) {
        self.slots[task.index()].status = CheckpointStatus::Confirmed;
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &Checkpoint)> {
        TaskId::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn has_any_value(&self) -> bool {
        self.slots.iter().any(|c| c.slot.is_present())
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|c| c.slot.is_present()).count()
    }

    /// Epoch milliseconds of a slot, `0` when unset
    pub fn millis(&self, task: TaskId, timezone: &Timezone) -> i64 {
        timezone.to_millis(self.value(task))
    }

    /// Smallest value among open slots after `task`
    pub fn min_open_after(&self, task: TaskId) -> Option<NaiveDateTime> {
        task.following()
            .map(|t| self.get(t))
            .filter(|c| c.is_open())
            .filter_map(|c| c.value())
            .min()
    }
}

impl Index<TaskId> for Timeline {
    type Output = Checkpoint;

    fn index(&self, task: TaskId) -> &Self::Output {
        self.get(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_confirmed_slot_is_immutable() {
        let mut timeline = Timeline::new();
        timeline.put(TaskId::AdmissionWait, Checkpoint::confirmed(Slot::Observed(at(8, 0))));

        assert!(!timeline.shift(TaskId::AdmissionWait, at(9, 0)));
        assert!(!timeline.clear(TaskId::AdmissionWait));
        assert_eq!(timeline.value(TaskId::AdmissionWait), Some(at(8, 0)));
    }

    #[test]
    fn test_min_open_after_skips_confirmed() {
        let mut timeline = Timeline::from_values([
            Some(at(8, 0)),
            Some(at(8, 5)),
            Some(at(8, 10)),
            Some(at(8, 20)),
            Some(at(8, 15)),
            None,
            None,
        ]);
        timeline.confirm(TaskId::ClinicService);

        assert_eq!(timeline.min_open_after(TaskId::FileDispatch), Some(at(8, 20)));
        assert_eq!(timeline.min_open_after(TaskId::ClinicService), None);
    }

    #[test]
    fn test_present_count() {
        let timeline = Timeline::from_values([Some(at(8, 0)), None, Some(at(9, 0)), None, None, None, None]);
        assert_eq!(timeline.present_count(), 2);
        assert!(timeline.has_any_value());
        assert!(!Timeline::new().has_any_value());
    }
}
