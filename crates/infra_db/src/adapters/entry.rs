//! MySQL Entry Adapter
//!
//! Implements `EntrySource` over the booking reference table.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;
use tracing::{debug, instrument};

use core_kernel::{
    BookingCode, DomainPort, EntryReference, HealthCheckResult, HealthCheckable, MedicalRecordNumber, PortError,
    VisitNumber,
};
use domain_queue::{Entry, EntrySource, TaskId};

use super::{db_to_port_error, ping};
use crate::repositories::entry::{EntryRepository, EntryRow};

const ADAPTER_ID: &str = "mysql-entry-adapter";

/// MySQL-backed implementation of the EntrySource trait
///
/// Rows that cannot form an entry (blank reference or medical record) are
/// skipped with a debug log rather than failing the whole query.
#[derive(Debug, Clone)]
pub struct MySqlEntryAdapter {
    repository: EntryRepository,
    pool: MySqlPool,
}

impl MySqlEntryAdapter {
    /// Creates a new adapter
    ///
    /// # Arguments
    ///
    /// * `pool` - The MySQL connection pool
    /// * `payer_code` - Payer whose bookings are selected
    pub fn new(pool: MySqlPool, payer_code: impl Into<String>) -> Self {
        Self {
            repository: EntryRepository::new(pool.clone(), payer_code),
            pool,
        }
    }

    pub fn repository(&self) -> &EntryRepository {
        &self.repository
    }
}

impl DomainPort for MySqlEntryAdapter {}

#[async_trait]
impl HealthCheckable for MySqlEntryAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl EntrySource for MySqlEntryAdapter {
    #[instrument(skip(self), fields(payer = %self.repository.payer_code()))]
    async fn pending_entries(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError> {
        let rows = self.repository.find_pending(date).await.map_err(db_to_port_error)?;
        Ok(rows_to_entries(rows))
    }

    #[instrument(skip(self), fields(payer = %self.repository.payer_code()))]
    async fn entries_for_date(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError> {
        let rows = self.repository.find_by_date(date).await.map_err(db_to_port_error)?;
        Ok(rows_to_entries(rows))
    }

    #[instrument(skip(self), fields(payer = %self.repository.payer_code()))]
    async fn entries_with_checkpoints(&self, date: NaiveDate) -> Result<Vec<Entry>, PortError> {
        let rows = self
            .repository
            .find_with_checkpoints(date)
            .await
            .map_err(db_to_port_error)?;
        Ok(rows_to_entries(rows))
    }

    #[instrument(skip(self, task), fields(payer = %self.repository.payer_code(), %task))]
    async fn entries_with_unconfirmed_task(&self, date: NaiveDate, task: TaskId) -> Result<Vec<Entry>, PortError> {
        let rows = self
            .repository
            .find_with_unconfirmed_task(date, i64::from(task.number()))
            .await
            .map_err(db_to_port_error)?;
        Ok(rows_to_entries(rows))
    }

    #[instrument(skip(self, reference), fields(reference = %reference))]
    async fn entry_by_reference(&self, reference: &EntryReference) -> Result<Option<Entry>, PortError> {
        let row = self
            .repository
            .find_by_reference(reference.as_str())
            .await
            .map_err(db_to_port_error)?;

        match row {
            Some(row) => row_to_entry(row).map(Some),
            None => Ok(None),
        }
    }
}

fn rows_to_entries(rows: Vec<EntryRow>) -> Vec<Entry> {
    rows.into_iter()
        .filter_map(|row| {
            let reference = row.nomor_referensi.clone();
            match row_to_entry(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(%reference, error = %e, "Skipping unusable booking row");
                    None
                }
            }
        })
        .collect()
}

/// Converts a database row to a domain entry
fn row_to_entry(row: EntryRow) -> Result<Entry, PortError> {
    let invalid = |e: core_kernel::EmptyIdentifier| PortError::transformation(e.to_string());

    let mut entry = Entry::new(
        EntryReference::new(&row.nomor_referensi).map_err(invalid)?,
        BookingCode::new(&row.kodebooking).map_err(invalid)?,
        MedicalRecordNumber::new(&row.no_rkm_medis).map_err(invalid)?,
        row.tanggal_periksa,
    );

    if let Ok(visit) = VisitNumber::new(&row.no_rawat) {
        entry = entry.with_visit(visit);
    }
    if !row.nm_pasien.trim().is_empty() {
        entry = entry.with_patient(row.nm_pasien.trim());
    }
    if !row.nm_poli.trim().is_empty() {
        entry = entry.with_clinic(row.nm_poli.trim());
    }

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> EntryRow {
        EntryRow {
            tanggal_periksa: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            nomor_referensi: "0301R0010324V000017".to_string(),
            kodebooking: "20240304A017".to_string(),
            no_rkm_medis: "000123".to_string(),
            no_rawat: "2024/03/04/000017".to_string(),
            nm_pasien: "SITI AMINAH".to_string(),
            nm_poli: "Poli Dalam".to_string(),
        }
    }

    #[test]
    fn test_row_to_entry() {
        let entry = row_to_entry(row()).unwrap();
        assert_eq!(entry.reference.as_str(), "0301R0010324V000017");
        assert_eq!(entry.booking_code.as_str(), "20240304A017");
        assert_eq!(entry.visit_number.unwrap().as_str(), "2024/03/04/000017");
        assert_eq!(entry.patient_name.as_deref(), Some("SITI AMINAH"));
        assert_eq!(entry.clinic_name.as_deref(), Some("Poli Dalam"));
    }

    #[test]
    fn test_unregistered_booking_has_no_visit() {
        let mut r = row();
        r.no_rawat = String::new();
        r.nm_poli = String::new();
        let entry = row_to_entry(r).unwrap();
        assert!(entry.visit_number.is_none());
        assert!(entry.clinic_name.is_none());
    }

    #[test]
    fn test_blank_booking_code_skipped() {
        let mut bad = row();
        bad.kodebooking = " ".to_string();
        assert!(row_to_entry(bad.clone()).is_err());

        let entries = rows_to_entries(vec![bad, row()]);
        assert_eq!(entries.len(), 1);
    }
}
