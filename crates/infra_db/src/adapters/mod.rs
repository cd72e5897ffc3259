//! Domain Adapters
//!
//! Adapter implementations of the `domain_queue` ports backed by the
//! hospital's MySQL database.
//!
//! # Architecture
//!
//! Each adapter:
//! - Implements one port trait
//! - Translates between repository rows and domain types
//! - Uses the repository layer for database operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::MySqlCheckpointAdapter;
//! use domain_queue::CheckpointStore;
//!
//! let adapter = MySqlCheckpointAdapter::new(pool);
//! let rows = adapter.get_all(&reference).await?;
//! ```

pub mod checkpoint;
pub mod entry;
pub mod settings;
pub mod source;

pub use checkpoint::MySqlCheckpointAdapter;
pub use entry::MySqlEntryAdapter;
pub use settings::{load_queue_settings, QueueSettings, DEFAULT_PAYER_CODE};
pub use source::MySqlSourceAdapter;

use core_kernel::{HealthCheckResult, PortError};
use sqlx::MySqlPool;

use crate::error::DatabaseError;

/// Converts database errors to port errors
pub(crate) fn db_to_port_error(e: DatabaseError) -> PortError {
    match e {
        DatabaseError::NotFound(msg) => PortError::NotFound {
            entity_type: "record".to_string(),
            id: msg,
        },
        DatabaseError::DuplicateEntry(msg) => PortError::Conflict { message: msg },
        DatabaseError::ConnectionFailed(msg) => PortError::connection(msg),
        DatabaseError::PoolExhausted => PortError::connection("connection pool exhausted"),
        DatabaseError::InvalidData(msg) => PortError::transformation(msg),
        // Classification never yields SqlError again
        DatabaseError::SqlError(sql) => db_to_port_error(DatabaseError::from(&sql)),
        other => PortError::internal(other.to_string()),
    }
}

/// Runs `SELECT 1` against the pool
pub(crate) async fn ping(pool: &MySqlPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult::healthy(adapter_id, latency_ms),
        Err(e) => HealthCheckResult::unhealthy(adapter_id, latency_ms, format!("Database error: {}", e)),
    }
}
