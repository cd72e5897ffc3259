//! Infrastructure Database Layer
//!
//! This crate provides the MySQL infrastructure for the queue reconciler:
//! connection pooling, repositories over the hospital information system
//! tables, and adapters implementing the `domain_queue` ports.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Repositories own the SQL and
//! return row types; adapters translate rows into domain types and database
//! errors into `PortError`.
//!
//! # Tables
//!
//! - `mlite_antrian_referensi`: bookings (read)
//! - `mlite_antrian_referensi_taskid`: persisted checkpoints (read/write)
//! - `reg_periksa`, `mlite_antrian_loket`, `mutasi_berkas`,
//!   `pemeriksaan_ralan`, `resep_obat`: source records (read)
//! - `mlite_settings`: service credentials (read)
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, MySqlCheckpointAdapter};
//!
//! let pool = create_pool(DatabaseConfig::default()).await?;
//! let store = MySqlCheckpointAdapter::new(pool.clone());
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{
    load_queue_settings, MySqlCheckpointAdapter, MySqlEntryAdapter, MySqlSourceAdapter, QueueSettings,
    DEFAULT_PAYER_CODE,
};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
