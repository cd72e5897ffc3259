//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults, so a
//! test only spells out the fields it is about.

use chrono::{NaiveDate, NaiveDateTime};
use core_kernel::{BookingCode, EntryReference, MedicalRecordNumber, Timezone, VisitNumber};
use domain_queue::{note_for, CheckpointStatus, Entry, SourceSnapshot, StoredCheckpoint, TaskId};
use fake::faker::name::en::Name;
use fake::Fake;

use crate::fixtures::TimeFixtures;

/// Builder for booking entries
pub struct EntryBuilder {
    reference: String,
    booking_code: String,
    medical_record: String,
    visit_number: Option<String>,
    service_date: NaiveDate,
    patient_name: Option<String>,
    clinic_name: Option<String>,
}

impl Default for EntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryBuilder {
    /// Creates a registered booking with a random patient name
    pub fn new() -> Self {
        Self {
            reference: "0301R0010324V000001".to_string(),
            booking_code: "20240304A001".to_string(),
            medical_record: "000001".to_string(),
            visit_number: Some("2024/03/04/000001".to_string()),
            service_date: TimeFixtures::service_date(),
            patient_name: Some(Name().fake()),
            clinic_name: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn with_booking_code(mut self, code: impl Into<String>) -> Self {
        self.booking_code = code.into();
        self
    }

    pub fn with_medical_record(mut self, number: impl Into<String>) -> Self {
        self.medical_record = number.into();
        self
    }

    pub fn with_visit(mut self, visit: impl Into<String>) -> Self {
        self.visit_number = Some(visit.into());
        self
    }

    /// Booking without a registration row
    pub fn unregistered(mut self) -> Self {
        self.visit_number = None;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.service_date = date;
        self
    }

    pub fn with_clinic(mut self, clinic: impl Into<String>) -> Self {
        self.clinic_name = Some(clinic.into());
        self
    }

    /// Builds the entry
    ///
    /// # Panics
    ///
    /// Panics if an identifier was set to a blank string
    pub fn build(self) -> Entry {
        let mut entry = Entry::new(
            EntryReference::new(&self.reference).unwrap(),
            BookingCode::new(&self.booking_code).unwrap(),
            MedicalRecordNumber::new(&self.medical_record).unwrap(),
            self.service_date,
        );
        if let Some(visit) = self.visit_number {
            entry = entry.with_visit(VisitNumber::new(visit).unwrap());
        }
        if let Some(name) = self.patient_name {
            entry = entry.with_patient(name);
        }
        if let Some(clinic) = self.clinic_name {
            entry = entry.with_clinic(clinic);
        }
        entry
    }
}

/// Builder for source snapshots
#[derive(Default)]
pub struct SnapshotBuilder {
    snapshot: SourceSnapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registration(mut self, value: NaiveDateTime) -> Self {
        self.snapshot.registration = Some(value);
        self
    }

    /// Counter queue start and end
    pub fn counter(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.snapshot.admission_start = Some(start);
        self.snapshot.admission_end = Some(end);
        self
    }

    /// Medical file dispatch and receipt
    pub fn file_movement(mut self, dispatched: Option<NaiveDateTime>, received: Option<NaiveDateTime>) -> Self {
        self.snapshot.file_dispatch = dispatched;
        self.snapshot.file_receipt = received;
        self
    }

    pub fn examination(mut self, value: NaiveDateTime) -> Self {
        self.snapshot.clinic_examination = Some(value);
        self
    }

    pub fn prescription(mut self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        self.snapshot.prescription_start = start;
        self.snapshot.prescription_end = end;
        self
    }

    pub fn build(self) -> SourceSnapshot {
        self.snapshot
    }
}

/// Builder for persisted checkpoint rows
pub struct StoredCheckpointBuilder {
    reference: EntryReference,
    service_date: NaiveDate,
    task: TaskId,
    value: Option<NaiveDateTime>,
    status: CheckpointStatus,
    generated: bool,
    timezone: Timezone,
}

impl StoredCheckpointBuilder {
    /// Pending row for a task of the given entry, without a value
    pub fn for_entry(entry: &Entry, task: TaskId) -> Self {
        Self {
            reference: entry.reference.clone(),
            service_date: entry.service_date,
            task,
            value: None,
            status: CheckpointStatus::Pending,
            generated: false,
            timezone: Timezone::default(),
        }
    }

    pub fn at(mut self, value: NaiveDateTime) -> Self {
        self.value = Some(value);
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.status = CheckpointStatus::Confirmed;
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    pub fn build(self) -> StoredCheckpoint {
        StoredCheckpoint {
            reference: self.reference,
            service_date: self.service_date,
            task: self.task,
            value_ms: self.timezone.to_millis(self.value),
            status: self.status,
            note: note_for(self.task, self.generated),
        }
    }
}
