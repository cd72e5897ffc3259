//! Source record repository implementation
//!
//! Read-only access to the hospital tables that hold the raw checkpoint
//! times. Every date and time column is read back as text: the hospital
//! system stores zero dates (`0000-00-00 00:00:00`) and times in columns of
//! varying types, and parsing happens in one place above this layer.

use sqlx::{FromRow, MySqlPool};

use crate::error::DatabaseError;

/// Repository for the source tables of the checkpoint times
#[derive(Debug, Clone)]
pub struct SourceRepository {
    pool: MySqlPool,
}

impl SourceRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Registration date and time of a visit (`reg_periksa`)
    pub async fn registration(&self, visit_number: &str) -> Result<Option<DateTimeParts>, DatabaseError> {
        let row = sqlx::query_as::<_, DateTimeParts>(
            r#"
            SELECT
                CAST(tgl_registrasi AS CHAR) AS date_part,
                CAST(jam_reg AS CHAR) AS time_part
            FROM reg_periksa
            WHERE no_rawat = ?
            LIMIT 1
            "#,
        )
        .bind(visit_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Counter queue start and end times (`mlite_antrian_loket`)
    ///
    /// # Arguments
    ///
    /// * `medical_record` - The patient's medical record number
    /// * `date` - Service date as `YYYY-MM-DD`
    pub async fn counter_times(&self, medical_record: &str, date: &str) -> Result<Option<CounterRow>, DatabaseError> {
        let row = sqlx::query_as::<_, CounterRow>(
            r#"
            SELECT
                CAST(start_time AS CHAR) AS start_time,
                CAST(end_time AS CHAR) AS end_time
            FROM mlite_antrian_loket
            WHERE no_rkm_medis = ? AND postdate = ?
            LIMIT 1
            "#,
        )
        .bind(medical_record)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Medical file dispatch and receipt times (`mutasi_berkas`)
    pub async fn file_movement(&self, visit_number: &str) -> Result<Option<FileMovementRow>, DatabaseError> {
        let row = sqlx::query_as::<_, FileMovementRow>(
            r#"
            SELECT
                CAST(dikirim AS CHAR) AS dispatched,
                CAST(diterima AS CHAR) AS received
            FROM mutasi_berkas
            WHERE no_rawat = ?
            LIMIT 1
            "#,
        )
        .bind(visit_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Clinic examination date and time (`pemeriksaan_ralan`)
    pub async fn examination(&self, visit_number: &str) -> Result<Option<DateTimeParts>, DatabaseError> {
        let row = sqlx::query_as::<_, DateTimeParts>(
            r#"
            SELECT
                CAST(tgl_perawatan AS CHAR) AS date_part,
                CAST(jam_rawat AS CHAR) AS time_part
            FROM pemeriksaan_ralan
            WHERE no_rawat = ?
            ORDER BY tgl_perawatan, jam_rawat
            LIMIT 1
            "#,
        )
        .bind(visit_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Prescription times (`resep_obat`)
    pub async fn prescription(&self, visit_number: &str) -> Result<Option<PrescriptionRow>, DatabaseError> {
        let row = sqlx::query_as::<_, PrescriptionRow>(
            r#"
            SELECT
                CAST(tgl_peresepan AS CHAR) AS prescribed_date,
                CAST(jam_peresepan AS CHAR) AS prescribed_time,
                CAST(jam AS CHAR) AS validated_time
            FROM resep_obat
            WHERE no_rawat = ?
            LIMIT 1
            "#,
        )
        .bind(visit_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

/// A date column and a time column read as text
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct DateTimeParts {
    pub date_part: Option<String>,
    pub time_part: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct CounterRow {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct FileMovementRow {
    pub dispatched: Option<String>,
    pub received: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct PrescriptionRow {
    pub prescribed_date: Option<String>,
    /// Time the prescription was written (task 6)
    pub prescribed_time: Option<String>,
    /// Time the prescription was validated (task 7)
    pub validated_time: Option<String>,
}
