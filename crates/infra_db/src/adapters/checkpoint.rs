//! MySQL Checkpoint Adapter
//!
//! Implements `CheckpointStore` over `mlite_antrian_referensi_taskid` using
//! the [`CheckpointRepository`].

use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::{debug, instrument, warn};

use core_kernel::{DomainPort, EntryReference, HealthCheckResult, HealthCheckable, PortError};
use domain_queue::{CheckpointStatus, CheckpointStore, StoredCheckpoint, TaskId};

use super::{db_to_port_error, ping};
use crate::repositories::checkpoint::{CheckpointRepository, CheckpointRow, NewCheckpoint, STATUS_CONFIRMED};

const ADAPTER_ID: &str = "mysql-checkpoint-adapter";

/// MySQL-backed implementation of the CheckpointStore trait
///
/// Confirmed rows are protected by the queries themselves: value updates
/// carry a `status != 'Sudah'` guard.
#[derive(Debug, Clone)]
pub struct MySqlCheckpointAdapter {
    repository: CheckpointRepository,
}

impl MySqlCheckpointAdapter {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            repository: CheckpointRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &CheckpointRepository {
        &self.repository
    }
}

impl DomainPort for MySqlCheckpointAdapter {}

#[async_trait]
impl HealthCheckable for MySqlCheckpointAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(self.repository.pool(), ADAPTER_ID).await
    }
}

#[async_trait]
impl CheckpointStore for MySqlCheckpointAdapter {
    #[instrument(skip(self, reference), fields(reference = %reference))]
    async fn get_all(&self, reference: &EntryReference) -> Result<Vec<StoredCheckpoint>, PortError> {
        let rows = self
            .repository
            .find_by_reference(reference.as_str())
            .await
            .map_err(db_to_port_error)?;

        debug!(count = rows.len(), "Loaded persisted checkpoints");
        Ok(rows_to_stored(rows))
    }

    #[instrument(skip(self, row), fields(reference = %row.reference, task = %row.task))]
    async fn upsert_pending(&self, row: &StoredCheckpoint) -> Result<(), PortError> {
        self.repository
            .upsert_pending(&stored_to_new(row))
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, reference, task), fields(reference = %reference, %task))]
    async fn update_value(&self, reference: &EntryReference, task: TaskId, value_ms: i64) -> Result<(), PortError> {
        let changed = self
            .repository
            .update_value(reference.as_str(), i64::from(task.number()), value_ms)
            .await
            .map_err(db_to_port_error)?;

        if changed == 0 {
            debug!("No unconfirmed row to update");
        }
        Ok(())
    }

    #[instrument(skip(self, reference, task), fields(reference = %reference, %task))]
    async fn mark_confirmed(&self, reference: &EntryReference, task: TaskId) -> Result<(), PortError> {
        self.repository
            .update_status(reference.as_str(), i64::from(task.number()), STATUS_CONFIRMED)
            .await
            .map_err(db_to_port_error)?;
        Ok(())
    }

    #[instrument(skip(self, reference), fields(reference = %reference))]
    async fn delete_all(&self, reference: &EntryReference) -> Result<u64, PortError> {
        self.repository
            .delete_by_reference(reference.as_str())
            .await
            .map_err(db_to_port_error)
    }

    async fn max_confirmed_value(&self, reference: &EntryReference) -> Result<i64, PortError> {
        self.repository
            .max_confirmed_value(reference.as_str())
            .await
            .map_err(db_to_port_error)
    }

    async fn confirmed_tasks(&self, reference: &EntryReference) -> Result<Vec<TaskId>, PortError> {
        let numbers = self
            .repository
            .confirmed_tasks(reference.as_str())
            .await
            .map_err(db_to_port_error)?;

        Ok(numbers
            .into_iter()
            .filter_map(|n| match TaskId::from_number(n) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!(task = n, error = %e, "Skipping confirmed row with unknown task");
                    None
                }
            })
            .collect())
    }
}

/// Converts rows, skipping any that do not map to a domain row
fn rows_to_stored(rows: Vec<CheckpointRow>) -> Vec<StoredCheckpoint> {
    rows.into_iter()
        .filter_map(|row| {
            let reference = row.nomor_referensi.clone();
            let task = row.taskid;
            match row_to_stored(row) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    warn!(%reference, task, error = %e, "Skipping unreadable checkpoint row");
                    None
                }
            }
        })
        .collect()
}

/// Converts a database row to a domain row
fn row_to_stored(row: CheckpointRow) -> Result<StoredCheckpoint, PortError> {
    let reference = EntryReference::new(&row.nomor_referensi)
        .map_err(|e| PortError::transformation(e.to_string()))?;
    let task = TaskId::from_number(row.taskid).map_err(|e| PortError::transformation(e.to_string()))?;

    Ok(StoredCheckpoint {
        reference,
        service_date: row.tanggal_periksa,
        task,
        value_ms: row.waktu,
        status: CheckpointStatus::from_db_str(&row.status),
        note: row.keterangan,
    })
}

fn stored_to_new(row: &StoredCheckpoint) -> NewCheckpoint {
    NewCheckpoint {
        reference: row.reference.as_str().to_string(),
        service_date: row.service_date,
        task: i64::from(row.task.number()),
        value_ms: row.value_ms,
        note: row.note.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(task: i64, status: &str) -> CheckpointRow {
        CheckpointRow {
            tanggal_periksa: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            nomor_referensi: "0301R0010324V000017".to_string(),
            taskid: task,
            waktu: 1_709_517_600_000,
            status: status.to_string(),
            keterangan: "Mulai pelayanan poli.".to_string(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let stored = row_to_stored(row(4, "Sudah")).unwrap();
        assert_eq!(stored.task, TaskId::FileReceipt);
        assert!(stored.is_confirmed());
        assert_eq!(stored.value_ms, 1_709_517_600_000);

        let pending = row_to_stored(row(6, "Belum")).unwrap();
        assert_eq!(pending.status, CheckpointStatus::Pending);
    }

    #[test]
    fn test_unknown_status_is_pending() {
        let stored = row_to_stored(row(1, "")).unwrap();
        assert_eq!(stored.status, CheckpointStatus::Pending);
    }

    #[test]
    fn test_invalid_task_rejected() {
        let err = row_to_stored(row(9, "Belum")).unwrap_err();
        assert!(matches!(err, PortError::Transformation { .. }));
    }

    #[test]
    fn test_unreadable_rows_are_skipped() {
        let stored = rows_to_stored(vec![row(3, "Sudah"), row(9, "Belum"), row(5, "Belum")]);
        let tasks: Vec<_> = stored.iter().map(|r| r.task).collect();
        assert_eq!(tasks, vec![TaskId::FileDispatch, TaskId::ClinicService]);
        assert!(stored[0].is_confirmed());
    }

    #[test]
    fn test_empty_reference_rejected() {
        let mut bad = row(1, "Belum");
        bad.nomor_referensi = "  ".to_string();
        assert!(row_to_stored(bad).is_err());
    }

    #[test]
    fn test_stored_to_new_uses_protocol_number() {
        let stored = row_to_stored(row(7, "Belum")).unwrap();
        let new = stored_to_new(&stored);
        assert_eq!(new.task, 7);
        assert_eq!(new.reference, "0301R0010324V000017");
        assert_eq!(new.note, "Mulai pelayanan poli.");
    }
}
