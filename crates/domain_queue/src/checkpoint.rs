//! Checkpoint slots and their persisted form
//!
//! A booking moves through seven ordered checkpoints ("task ids" in the
//! antrean protocol). Each slot remembers where its value came from so a
//! synthesized time is never mistaken for one read from a source record.

use chrono::{NaiveDate, NaiveDateTime};
use core_kernel::EntryReference;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InvalidTaskId;

/// Note suffix marking a persisted value as synthesized
pub const GENERATED_SUFFIX: &str = " [generated]";

/// One of the seven ordered checkpoints of a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TaskId {
    /// Patient starts waiting for admission
    AdmissionWait,
    /// Admission desk starts serving the patient
    AdmissionService,
    /// Admission done, medical file sent to the clinic
    FileDispatch,
    /// Clinic receives the file and starts serving
    FileReceipt,
    /// Clinic service finished
    ClinicService,
    /// Pharmacy starts preparing the prescription
    PharmacyStart,
    /// Pharmacy finished the prescription
    PharmacyEnd,
}

impl TaskId {
    pub const ALL: [TaskId; 7] = [
        TaskId::AdmissionWait,
        TaskId::AdmissionService,
        TaskId::FileDispatch,
        TaskId::FileReceipt,
        TaskId::ClinicService,
        TaskId::PharmacyStart,
        TaskId::PharmacyEnd,
    ];

    /// Protocol number, 1..=7
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Zero-based position in a timeline
    pub fn index(self) -> usize {
        match self {
            TaskId::AdmissionWait => 0,
            TaskId::AdmissionService => 1,
            TaskId::FileDispatch => 2,
            TaskId::FileReceipt => 3,
            TaskId::ClinicService => 4,
            TaskId::PharmacyStart => 5,
            TaskId::PharmacyEnd => 6,
        }
    }

    pub fn from_number(number: i64) -> Result<Self, InvalidTaskId> {
        if !(1..=7).contains(&number) {
            return Err(InvalidTaskId(number));
        }
        Ok(Self::ALL[(number - 1) as usize])
    }

    /// Fixed note stored alongside the persisted value
    pub fn note(self) -> &'static str {
        match self {
            TaskId::AdmissionWait => "Mulai tunggu admisi.",
            TaskId::AdmissionService => "Mulai pelayanan admisi.",
            TaskId::FileDispatch => "Selesai pelayanan admisi atau mulai tunggu poli.",
            TaskId::FileReceipt => "Mulai pelayanan poli.",
            TaskId::ClinicService => "Selesai pelayanan poli.",
            TaskId::PharmacyStart => "Mulai pelayanan apotek.",
            TaskId::PharmacyEnd => "Selesai pelayanan apotek.",
        }
    }

    pub fn next(self) -> Option<TaskId> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Tasks strictly after this one, in order
    pub fn following(self) -> impl Iterator<Item = TaskId> {
        Self::ALL.into_iter().skip(self.index() + 1)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {}", self.number())
    }
}

impl From<TaskId> for u8 {
    fn from(task: TaskId) -> Self {
        task.number()
    }
}

impl TryFrom<u8> for TaskId {
    type Error = InvalidTaskId;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TaskId::from_number(value as i64)
    }
}

/// Value of one checkpoint together with its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "origin", content = "value", rename_all = "snake_case")]
pub enum Slot {
    #[default]
    Unset,
    /// Read from a source record or a persisted row
    Observed(NaiveDateTime),
    /// Synthesized by fallback
    Generated(NaiveDateTime),
}

impl Slot {
    pub fn value(&self) -> Option<NaiveDateTime> {
        match self {
            Slot::Unset => None,
            Slot::Observed(t) | Slot::Generated(t) => Some(*t),
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Slot::Unset)
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Slot::Generated(_))
    }

    /// Replaces the value while keeping the origin
    ///
    /// An unset slot becomes observed.
    pub fn with_value(self, value: NaiveDateTime) -> Slot {
        match self {
            Slot::Generated(_) => Slot::Generated(value),
            Slot::Unset | Slot::Observed(_) => Slot::Observed(value),
        }
    }

    pub fn from_option(value: Option<NaiveDateTime>) -> Slot {
        value.map_or(Slot::Unset, Slot::Observed)
    }
}

/// Confirmation state of a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    /// Not yet accepted by the queue service
    #[default]
    Pending,
    /// Accepted by the queue service; never overwritten again
    Confirmed,
}

impl CheckpointStatus {
    /// Value stored in the `status` column
    pub fn as_db_str(&self) -> &'static str {
        match self {
            CheckpointStatus::Pending => "Belum",
            CheckpointStatus::Confirmed => "Sudah",
        }
    }

    /// Anything other than `Sudah` counts as pending
    pub fn from_db_str(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("Sudah") {
            CheckpointStatus::Confirmed
        } else {
            CheckpointStatus::Pending
        }
    }
}

/// One slot of a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub slot: Slot,
    pub status: CheckpointStatus,
}

impl Checkpoint {
    pub fn pending(slot: Slot) -> Self {
        Self {
            slot,
            status: CheckpointStatus::Pending,
        }
    }

    pub fn confirmed(slot: Slot) -> Self {
        Self {
            slot,
            status: CheckpointStatus::Confirmed,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == CheckpointStatus::Confirmed
    }

    pub fn value(&self) -> Option<NaiveDateTime> {
        self.slot.value()
    }

    /// Present and still open for normalization or submission
    pub fn is_open(&self) -> bool {
        !self.is_confirmed() && self.slot.is_present()
    }
}

/// A row of the persisted checkpoint table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCheckpoint {
    pub reference: EntryReference,
    pub service_date: NaiveDate,
    pub task: TaskId,
    /// Epoch milliseconds, `0` when unset
    pub value_ms: i64,
    pub status: CheckpointStatus,
    pub note: String,
}

impl StoredCheckpoint {
    /// Builds the pending row written for a normalized slot
    pub fn pending(
        reference: EntryReference,
        service_date: NaiveDate,
        task: TaskId,
        value_ms: i64,
        generated: bool,
    ) -> Self {
        Self {
            reference,
            service_date,
            task,
            value_ms,
            status: CheckpointStatus::Pending,
            note: note_for(task, generated),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == CheckpointStatus::Confirmed
    }

    /// Whether the note marks the value as synthesized
    pub fn is_generated(&self) -> bool {
        self.note.trim_end().ends_with(GENERATED_SUFFIX.trim_start())
    }
}

/// Note text for a task, with the generated marker when applicable
pub fn note_for(task: TaskId, generated: bool) -> String {
    if generated {
        format!("{}{}", task.note(), GENERATED_SUFFIX)
    } else {
        task.note().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_numbers_round_trip() {
        for (i, task) in TaskId::ALL.iter().enumerate() {
            assert_eq!(task.number() as usize, i + 1);
            assert_eq!(TaskId::from_number(i as i64 + 1).unwrap(), *task);
        }
        assert!(TaskId::from_number(0).is_err());
        assert!(TaskId::from_number(8).is_err());
    }

    #[test]
    fn test_task_serializes_as_number() {
        assert_eq!(serde_json::to_string(&TaskId::FileDispatch).unwrap(), "3");
        let task: TaskId = serde_json::from_str("7").unwrap();
        assert_eq!(task, TaskId::PharmacyEnd);
        assert!(serde_json::from_str::<TaskId>("9").is_err());
    }

    #[test]
    fn test_following_tasks() {
        let after: Vec<u8> = TaskId::ClinicService.following().map(TaskId::number).collect();
        assert_eq!(after, vec![6, 7]);
        assert_eq!(TaskId::PharmacyEnd.next(), None);
    }

    #[test]
    fn test_status_db_strings() {
        assert_eq!(CheckpointStatus::Confirmed.as_db_str(), "Sudah");
        assert_eq!(CheckpointStatus::from_db_str("Sudah"), CheckpointStatus::Confirmed);
        assert_eq!(CheckpointStatus::from_db_str("Belum"), CheckpointStatus::Pending);
        assert_eq!(CheckpointStatus::from_db_str(""), CheckpointStatus::Pending);
    }

    #[test]
    fn test_generated_note_detection() {
        let reference = EntryReference::new("REF-1").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let generated = StoredCheckpoint::pending(reference.clone(), date, TaskId::FileDispatch, 1, true);
        assert_eq!(
            generated.note,
            "Selesai pelayanan admisi atau mulai tunggu poli. [generated]"
        );
        assert!(generated.is_generated());

        let observed = StoredCheckpoint::pending(reference, date, TaskId::FileDispatch, 1, false);
        assert!(!observed.is_generated());
    }

    #[test]
    fn test_slot_with_value_keeps_origin() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(9, 0, 0).unwrap();
        assert!(Slot::Generated(t).with_value(t).is_generated());
        assert!(!Slot::Unset.with_value(t).is_generated());
        assert_eq!(Slot::from_option(None), Slot::Unset);
    }
}
