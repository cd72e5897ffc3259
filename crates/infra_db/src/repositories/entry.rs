//! Entry repository implementation
//!
//! Selects the bookings to reconcile from `mlite_antrian_referensi`, joined
//! with the registration, patient and clinic tables. Only bookings of the
//! configured payer with a booking code are ever returned.

use chrono::NaiveDate;
use sqlx::{FromRow, MySqlPool};

use crate::error::DatabaseError;

const ENTRY_SELECT: &str = r#"
    SELECT
        mar.tanggal_periksa,
        mar.nomor_referensi,
        mar.kodebooking,
        mar.no_rkm_medis,
        COALESCE(rp.no_rawat, '') AS no_rawat,
        COALESCE(p.nm_pasien, '') AS nm_pasien,
        COALESCE(pol.nm_poli, '') AS nm_poli
    FROM mlite_antrian_referensi mar
    LEFT JOIN reg_periksa rp ON mar.no_rkm_medis = rp.no_rkm_medis
        AND mar.tanggal_periksa = rp.tgl_registrasi
    LEFT JOIN pasien p ON mar.no_rkm_medis = p.no_rkm_medis
    LEFT JOIN poliklinik pol ON rp.kd_poli = pol.kd_poli
    WHERE mar.kodebooking != ''
        AND rp.kd_pj = ?
"#;

const ORDER_BY_REGISTRATION: &str = "ORDER BY rp.jam_reg ASC";

/// Repository for booking entries
#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: MySqlPool,
    payer_code: String,
}

impl EntryRepository {
    /// Creates a new EntryRepository
    ///
    /// # Arguments
    ///
    /// * `pool` - The MySQL connection pool
    /// * `payer_code` - `kd_pj` of the insurance payer whose bookings are reported
    pub fn new(pool: MySqlPool, payer_code: impl Into<String>) -> Self {
        Self {
            pool,
            payer_code: payer_code.into(),
        }
    }

    pub fn payer_code(&self) -> &str {
        &self.payer_code
    }

    /// Sent bookings of a date whose tasks 1..5 are not all confirmed
    pub async fn find_pending(&self, date: NaiveDate) -> Result<Vec<EntryRow>, DatabaseError> {
        let sql = format!(
            r#"{ENTRY_SELECT}
                AND mar.tanggal_periksa = ?
                AND mar.status_kirim = 'Sudah'
                AND (
                    NOT EXISTS (
                        SELECT 1 FROM mlite_antrian_referensi_taskid t
                        WHERE t.nomor_referensi = mar.nomor_referensi
                    )
                    OR (
                        SELECT COUNT(*) FROM mlite_antrian_referensi_taskid t
                        WHERE t.nomor_referensi = mar.nomor_referensi
                            AND t.taskid IN (1, 2, 3, 4, 5)
                            AND t.status = 'Sudah'
                    ) < 5
                )
            {ORDER_BY_REGISTRATION}"#
        );

        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(&self.payer_code)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Every booking of the payer on a date
    pub async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<EntryRow>, DatabaseError> {
        let sql = format!(
            r#"{ENTRY_SELECT}
                AND mar.tanggal_periksa = ?
            {ORDER_BY_REGISTRATION}"#
        );

        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(&self.payer_code)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Bookings of a date that already have persisted checkpoints
    pub async fn find_with_checkpoints(&self, date: NaiveDate) -> Result<Vec<EntryRow>, DatabaseError> {
        let sql = format!(
            r#"{ENTRY_SELECT}
                AND mar.tanggal_periksa = ?
                AND EXISTS (
                    SELECT 1 FROM mlite_antrian_referensi_taskid t
                    WHERE t.nomor_referensi = mar.nomor_referensi
                )
            {ORDER_BY_REGISTRATION}"#
        );

        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(&self.payer_code)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Bookings of a date whose given task is persisted but not confirmed
    pub async fn find_with_unconfirmed_task(&self, date: NaiveDate, task: i64) -> Result<Vec<EntryRow>, DatabaseError> {
        let sql = format!(
            r#"{ENTRY_SELECT}
                AND mar.tanggal_periksa = ?
                AND EXISTS (
                    SELECT 1 FROM mlite_antrian_referensi_taskid t
                    WHERE t.nomor_referensi = mar.nomor_referensi
                        AND t.taskid = ?
                        AND t.status != 'Sudah'
                )
            {ORDER_BY_REGISTRATION}"#
        );

        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(&self.payer_code)
            .bind(date)
            .bind(task)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// One booking by reference number
    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<EntryRow>, DatabaseError> {
        let sql = format!(
            r#"{ENTRY_SELECT}
                AND mar.nomor_referensi = ?
            LIMIT 1"#
        );

        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(&self.payer_code)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }
}

/// Database row for a booking entry
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct EntryRow {
    pub tanggal_periksa: NaiveDate,
    pub nomor_referensi: String,
    pub kodebooking: String,
    pub no_rkm_medis: String,
    /// Empty when the booking has no registration yet
    pub no_rawat: String,
    pub nm_pasien: String,
    pub nm_poli: String,
}
