//! Per-entry and per-slot results of a reconciliation pass

use chrono::{DateTime, NaiveDateTime, Utc};
use core_kernel::{BookingCode, EntryReference, MedicalRecordNumber, VisitNumber};
use serde::{Deserialize, Serialize};

use crate::checkpoint::TaskId;
use crate::entry::Entry;
use crate::response::{CODE_ALREADY_REPORTED, CODE_OK};

/// Final state of one slot after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Normalized and persisted, not submitted in this pass
    Pending,
    /// Accepted by the queue service in this pass
    Confirmed,
    /// Submission failed
    Failed,
    /// Already confirmed before this pass
    Skipped,
    /// No value
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOutcome {
    pub task: TaskId,
    pub value: Option<NaiveDateTime>,
    pub value_ms: i64,
    pub status: SlotStatus,
    pub generated: bool,
    pub response_code: Option<i64>,
    pub message: Option<String>,
    /// Whether a conflict retry was issued
    pub retried: bool,
}

impl SlotOutcome {
    pub fn new(task: TaskId, value: Option<NaiveDateTime>, value_ms: i64, status: SlotStatus) -> Self {
        Self {
            task,
            value,
            value_ms,
            status,
            generated: false,
            response_code: None,
            message: None,
            retried: false,
        }
    }

    pub fn empty(task: TaskId) -> Self {
        Self::new(task, None, 0, SlotStatus::Empty)
    }

    /// Whether the service answered with an acceptance code
    pub fn was_accepted(&self) -> bool {
        matches!(self.response_code, Some(CODE_OK) | Some(CODE_ALREADY_REPORTED))
    }
}

/// Result of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub reference: EntryReference,
    pub booking_code: BookingCode,
    pub medical_record: MedicalRecordNumber,
    pub visit_number: Option<VisitNumber>,
    pub patient_name: Option<String>,
    pub clinic_name: Option<String>,
    pub processed_at: DateTime<Utc>,
    /// Timeline normalized and persisted
    pub auto_order_done: bool,
    /// Every submitted slot ended confirmed or skipped
    pub submission_done: bool,
    pub slots: Vec<SlotOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EntryOutcome {
    pub fn for_entry(entry: &Entry) -> Self {
        Self {
            reference: entry.reference.clone(),
            booking_code: entry.booking_code.clone(),
            medical_record: entry.medical_record.clone(),
            visit_number: entry.visit_number.clone(),
            patient_name: entry.patient_name.clone(),
            clinic_name: entry.clinic_name.clone(),
            processed_at: Utc::now(),
            auto_order_done: false,
            submission_done: false,
            slots: TaskId::ALL.into_iter().map(SlotOutcome::empty).collect(),
            error: None,
        }
    }

    pub fn failed(entry: &Entry, error: impl ToString) -> Self {
        let mut outcome = Self::for_entry(entry);
        outcome.error = Some(error.to_string());
        outcome
    }

    pub fn slot(&self, task: TaskId) -> Option<&SlotOutcome> {
        self.slots.iter().find(|s| s.task == task)
    }

    /// Counts as a success in reports: full submission, or any slot accepted
    pub fn is_success(&self) -> bool {
        self.submission_done || self.slots.iter().any(SlotOutcome::was_accepted)
    }
}
