//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! taskid-sync test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built entries, dates and service responses
//! - `builders`: Builder patterns for entries, snapshots and stored rows
//! - `database`: MySQL test container management and seeding
//! - `assertions`: Timeline and outcome assertion helpers
//! - `generators`: Property-based test data generators

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
