//! Pre-built Test Fixtures
//!
//! Ready-to-use test data. Every fixture uses the same service date
//! (Monday 2024-03-04) so values can be compared across tests.

use chrono::{NaiveDate, NaiveDateTime};
use core_kernel::{BookingCode, EntryReference, MedicalRecordNumber, VisitNumber};
use domain_queue::{Entry, ServiceCredentials, ServiceResponse, SourceSnapshot};

/// Fixture for dates and times
pub struct TimeFixtures;

impl TimeFixtures {
    /// Standard service date
    pub fn service_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    /// A wall-clock time on the service date
    pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
        Self::service_date().and_hms_opt(hour, minute, 0).unwrap()
    }

    /// Same, with seconds
    pub fn at_hms(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        Self::service_date().and_hms_opt(hour, minute, second).unwrap()
    }
}

/// Fixture for booking entries
pub struct EntryFixtures;

impl EntryFixtures {
    /// Registered outpatient booking with every identity field set
    pub fn registered() -> Entry {
        Self::numbered(17)
    }

    /// Registered booking with a distinct sequence number
    pub fn numbered(n: u32) -> Entry {
        Entry::new(
            EntryReference::new(format!("0301R00103240{:06}", n)).unwrap(),
            BookingCode::new(format!("20240304A{:03}", n)).unwrap(),
            MedicalRecordNumber::new(format!("{:06}", n)).unwrap(),
            TimeFixtures::service_date(),
        )
        .with_visit(VisitNumber::new(format!("2024/03/04/{:06}", n)).unwrap())
        .with_patient(format!("PATIENT {n}"))
        .with_clinic("Poli Penyakit Dalam")
    }

    /// Booking without a registration row
    pub fn unregistered() -> Entry {
        Entry::new(
            EntryReference::new("0301R0010324V000099").unwrap(),
            BookingCode::new("20240304A099").unwrap(),
            MedicalRecordNumber::new("000099").unwrap(),
            TimeFixtures::service_date(),
        )
    }
}

/// Fixture for source snapshots
pub struct SnapshotFixtures;

impl SnapshotFixtures {
    /// Every source record present and already in order
    pub fn complete() -> SourceSnapshot {
        SourceSnapshot {
            registration: Some(TimeFixtures::at(7, 45)),
            admission_start: Some(TimeFixtures::at(8, 5)),
            admission_end: Some(TimeFixtures::at(8, 12)),
            file_dispatch: Some(TimeFixtures::at(8, 20)),
            file_receipt: Some(TimeFixtures::at(8, 40)),
            clinic_examination: Some(TimeFixtures::at(9, 5)),
            prescription_start: Some(TimeFixtures::at(9, 30)),
            prescription_end: Some(TimeFixtures::at(9, 50)),
        }
    }

    /// Only the registration time
    pub fn registration_only(hour: u32, minute: u32) -> SourceSnapshot {
        SourceSnapshot {
            registration: Some(TimeFixtures::at(hour, minute)),
            ..SourceSnapshot::default()
        }
    }
}

/// Fixture for queue service replies
pub struct ResponseFixtures;

impl ResponseFixtures {
    pub fn ok() -> ServiceResponse {
        ServiceResponse::new(200, "Ok.")
    }

    pub fn already_reported(task: u8) -> ServiceResponse {
        ServiceResponse::new(208, format!("TaskId={task} sudah ada"))
    }

    /// Rejection for a time not after the previous task
    pub fn out_of_order(task: u8) -> ServiceResponse {
        ServiceResponse::new(
            201,
            format!("waktu TaskId={task} tidak boleh kurang atau sama dengan TaskId sebelumnya"),
        )
    }

    pub fn rejected(message: &str) -> ServiceResponse {
        ServiceResponse::new(201, message)
    }

    /// Raw JSON body as returned by the service
    pub fn body(code: i64, message: &str) -> String {
        serde_json::json!({ "metadata": { "code": code, "message": message } }).to_string()
    }
}

/// Fixture for service credentials
pub struct CredentialFixtures;

impl CredentialFixtures {
    pub fn valid() -> ServiceCredentials {
        ServiceCredentials {
            consumer_id: "12345".to_string(),
            secret_key: "secret-key".to_string(),
            base_url: "https://apijkn.example.id/antreanrs/".to_string(),
            user_key: "user-key".to_string(),
        }
    }
}
