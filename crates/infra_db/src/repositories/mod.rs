//! Repository implementations for the hospital tables
//!
//! Repositories encapsulate SQL and return plain row types; mapping to
//! domain types happens in [`crate::adapters`].
//!
//! - Queries are checked at runtime; the schema belongs to the hospital
//!   system and is not owned by this crate
//! - Confirmed checkpoint rows are only ever read or re-marked
//! - Source tables are read-only

pub mod checkpoint;
pub mod entry;
pub mod settings;
pub mod source;

pub use checkpoint::{CheckpointRepository, CheckpointRow, NewCheckpoint};
pub use entry::{EntryRepository, EntryRow};
pub use settings::{SettingsRepository, QUEUE_MODULE};
pub use source::SourceRepository;
