//! MySQL Source Adapter
//!
//! Implements `SourceRecords` by reading the registration, counter queue,
//! medical file, examination and prescription tables. Missing rows and
//! unparsable or zero timestamps leave the matching field empty.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::MySqlPool;
use tracing::{debug, instrument};

use core_kernel::temporal::{parse_date_and_time, parse_datetime};
use core_kernel::{DomainPort, PortError};
use domain_queue::{Entry, SourceRecords, SourceSnapshot};

use super::db_to_port_error;
use crate::repositories::source::{CounterRow, DateTimeParts, FileMovementRow, PrescriptionRow, SourceRepository};

/// MySQL-backed implementation of the SourceRecords trait
#[derive(Debug, Clone)]
pub struct MySqlSourceAdapter {
    repository: SourceRepository,
}

impl MySqlSourceAdapter {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            repository: SourceRepository::new(pool),
        }
    }
}

impl DomainPort for MySqlSourceAdapter {}

#[async_trait]
impl SourceRecords for MySqlSourceAdapter {
    #[instrument(skip(self, entry), fields(reference = %entry.reference))]
    async fn fetch_sources(&self, entry: &Entry) -> Result<SourceSnapshot, PortError> {
        let service_date = entry.service_date.format("%Y-%m-%d").to_string();

        let counter = self
            .repository
            .counter_times(entry.medical_record.as_str(), &service_date)
            .await
            .map_err(db_to_port_error)?
            .unwrap_or_default();

        let Some(visit) = entry.visit_number.as_ref() else {
            debug!("Booking has no registration; only counter times are available");
            return Ok(build_snapshot(
                &service_date,
                SourceRows {
                    counter,
                    ..SourceRows::default()
                },
            ));
        };

        let rows = SourceRows {
            registration: self
                .repository
                .registration(visit.as_str())
                .await
                .map_err(db_to_port_error)?
                .unwrap_or_default(),
            counter,
            file_movement: self
                .repository
                .file_movement(visit.as_str())
                .await
                .map_err(db_to_port_error)?
                .unwrap_or_default(),
            examination: self
                .repository
                .examination(visit.as_str())
                .await
                .map_err(db_to_port_error)?
                .unwrap_or_default(),
            prescription: self
                .repository
                .prescription(visit.as_str())
                .await
                .map_err(db_to_port_error)?
                .unwrap_or_default(),
        };

        Ok(build_snapshot(&service_date, rows))
    }
}

/// Raw rows read for one booking
#[derive(Debug, Default)]
struct SourceRows {
    registration: DateTimeParts,
    counter: CounterRow,
    file_movement: FileMovementRow,
    examination: DateTimeParts,
    prescription: PrescriptionRow,
}

fn build_snapshot(service_date: &str, rows: SourceRows) -> SourceSnapshot {
    let prescribed_date = rows.prescription.prescribed_date.as_deref().unwrap_or_default();

    SourceSnapshot {
        registration: date_and_time(rows.registration.date_part.as_deref(), rows.registration.time_part.as_deref()),
        admission_start: counter_time(service_date, rows.counter.start_time.as_deref()),
        admission_end: counter_time(service_date, rows.counter.end_time.as_deref()),
        file_dispatch: rows.file_movement.dispatched.as_deref().and_then(parse_datetime),
        file_receipt: rows.file_movement.received.as_deref().and_then(parse_datetime),
        clinic_examination: date_and_time(
            rows.examination.date_part.as_deref(),
            rows.examination.time_part.as_deref(),
        ),
        prescription_start: date_and_time(Some(prescribed_date), rows.prescription.prescribed_time.as_deref()),
        prescription_end: date_and_time(Some(prescribed_date), rows.prescription.validated_time.as_deref()),
    }
}

fn date_and_time(date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
    parse_date_and_time(date?, time?)
}

/// Counter times are stored as a time of day, sometimes as a full timestamp
fn counter_time(service_date: &str, raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?;
    parse_datetime(raw).or_else(|| parse_date_and_time(service_date, raw))
}
