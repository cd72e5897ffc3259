//! Booking entries and the raw source values gathered for them

use chrono::{NaiveDate, NaiveDateTime};
use core_kernel::{BookingCode, EntryReference, MedicalRecordNumber, VisitNumber};
use serde::{Deserialize, Serialize};

/// One patient booking for one service date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Primary key of the persisted checkpoints
    pub reference: EntryReference,
    /// Key used by the queue service
    pub booking_code: BookingCode,
    pub medical_record: MedicalRecordNumber,
    /// Absent when the booking has no registration row yet
    pub visit_number: Option<VisitNumber>,
    pub service_date: NaiveDate,
    pub patient_name: Option<String>,
    pub clinic_name: Option<String>,
}

impl Entry {
    pub fn new(
        reference: EntryReference,
        booking_code: BookingCode,
        medical_record: MedicalRecordNumber,
        service_date: NaiveDate,
    ) -> Self {
        Self {
            reference,
            booking_code,
            medical_record,
            visit_number: None,
            service_date,
            patient_name: None,
            clinic_name: None,
        }
    }

    pub fn with_visit(mut self, visit_number: VisitNumber) -> Self {
        self.visit_number = Some(visit_number);
        self
    }

    pub fn with_patient(mut self, patient_name: impl Into<String>) -> Self {
        self.patient_name = Some(patient_name.into());
        self
    }

    pub fn with_clinic(mut self, clinic_name: impl Into<String>) -> Self {
        self.clinic_name = Some(clinic_name.into());
        self
    }
}

/// Raw checkpoint values read from the hospital records for one entry
///
/// Every field is already parsed; blanks and zero sentinels arrive as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceSnapshot {
    /// Registration date + time of the visit
    pub registration: Option<NaiveDateTime>,
    /// Counter queue start (slot 1)
    pub admission_start: Option<NaiveDateTime>,
    /// Counter queue end (slot 2)
    pub admission_end: Option<NaiveDateTime>,
    /// Medical file sent (slot 3)
    pub file_dispatch: Option<NaiveDateTime>,
    /// Medical file received (slot 4)
    pub file_receipt: Option<NaiveDateTime>,
    /// Clinic examination (slot 5)
    pub clinic_examination: Option<NaiveDateTime>,
    /// Prescription written (slot 6)
    pub prescription_start: Option<NaiveDateTime>,
    /// Prescription validated (slot 7)
    pub prescription_end: Option<NaiveDateTime>,
}
