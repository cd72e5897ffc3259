//! Checkpoint repository implementation
//!
//! Database access for `mlite_antrian_referensi_taskid`, the table holding
//! one row per (reference, task) with the time in epoch milliseconds and the
//! submission status. Confirmed rows (`status = 'Sudah'`) are never
//! rewritten by these queries.

use chrono::NaiveDate;
use sqlx::{FromRow, MySqlPool};

use crate::error::DatabaseError;

/// Status value of a confirmed row
pub const STATUS_CONFIRMED: &str = "Sudah";
/// Status value of a pending row
pub const STATUS_PENDING: &str = "Belum";

/// Repository for the persisted checkpoint table
#[derive(Debug, Clone)]
pub struct CheckpointRepository {
    pool: MySqlPool,
}

impl CheckpointRepository {
    /// Creates a new CheckpointRepository with the given connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Retrieves every row of a reference
    ///
    /// # Arguments
    ///
    /// * `reference` - The booking's reference number
    pub async fn find_by_reference(&self, reference: &str) -> Result<Vec<CheckpointRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            r#"
            SELECT
                tanggal_periksa,
                nomor_referensi,
                CAST(taskid AS SIGNED) AS taskid,
                CAST(waktu AS SIGNED) AS waktu,
                CAST(status AS CHAR) AS status,
                COALESCE(keterangan, '') AS keterangan
            FROM mlite_antrian_referensi_taskid
            WHERE nomor_referensi = ?
            ORDER BY taskid
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts a pending row, or refreshes value and note of an unconfirmed one
    pub async fn upsert_pending(&self, row: &NewCheckpoint) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO mlite_antrian_referensi_taskid
                (tanggal_periksa, nomor_referensi, taskid, waktu, status, keterangan)
            VALUES (?, ?, ?, ?, 'Belum', ?)
            ON DUPLICATE KEY UPDATE
                waktu = IF(status != 'Sudah', VALUES(waktu), waktu),
                keterangan = IF(status != 'Sudah', VALUES(keterangan), keterangan)
            "#,
        )
        .bind(row.service_date)
        .bind(&row.reference)
        .bind(row.task)
        .bind(row.value_ms)
        .bind(&row.note)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the time of an unconfirmed row
    ///
    /// # Returns
    ///
    /// The number of rows changed; `0` when the row is confirmed or missing
    pub async fn update_value(&self, reference: &str, task: i64, value_ms: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE mlite_antrian_referensi_taskid
            SET waktu = ?
            WHERE nomor_referensi = ? AND taskid = ? AND status != 'Sudah'
            "#,
        )
        .bind(value_ms)
        .bind(reference)
        .bind(task)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn update_status(&self, reference: &str, task: i64, status: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE mlite_antrian_referensi_taskid
            SET status = ?
            WHERE nomor_referensi = ? AND taskid = ?
            "#,
        )
        .bind(status)
        .bind(reference)
        .bind(task)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes every row of a reference
    pub async fn delete_by_reference(&self, reference: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM mlite_antrian_referensi_taskid WHERE nomor_referensi = ?")
            .bind(reference)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Largest confirmed time, `0` when nothing is confirmed
    pub async fn max_confirmed_value(&self, reference: &str) -> Result<i64, DatabaseError> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT CAST(COALESCE(MAX(CAST(waktu AS SIGNED)), 0) AS SIGNED)
            FROM mlite_antrian_referensi_taskid
            WHERE nomor_referensi = ? AND status = 'Sudah'
            "#,
        )
        .bind(reference)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }

    /// Task numbers of the confirmed rows
    pub async fn confirmed_tasks(&self, reference: &str) -> Result<Vec<i64>, DatabaseError> {
        let tasks = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT CAST(taskid AS SIGNED)
            FROM mlite_antrian_referensi_taskid
            WHERE nomor_referensi = ? AND status = 'Sudah'
            ORDER BY taskid
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// Database row for a persisted checkpoint
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CheckpointRow {
    pub tanggal_periksa: NaiveDate,
    pub nomor_referensi: String,
    pub taskid: i64,
    pub waktu: i64,
    pub status: String,
    pub keterangan: String,
}

/// Values for inserting a pending checkpoint
#[derive(Debug, Clone)]
pub struct NewCheckpoint {
    pub reference: String,
    pub service_date: NaiveDate,
    pub task: i64,
    pub value_ms: i64,
    pub note: String,
}
