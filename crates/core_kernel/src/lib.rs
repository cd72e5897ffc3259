//! Core Kernel - Foundational types and utilities for the queue reconciler
//!
//! This crate provides the building blocks shared by every other crate:
//! - Typed identifiers for bookings, patients and visits
//! - Wall-clock / epoch-millisecond conversion in the facility time zone
//! - Injectable sources of bounded random offsets
//! - Port error and health-check abstractions for adapters

pub mod identifiers;
pub mod ports;
pub mod random;
pub mod temporal;

pub use identifiers::{BookingCode, EmptyIdentifier, EntryReference, MedicalRecordNumber, PassId, VisitNumber};
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
pub use random::{FixedOffsets, OffsetSource, RandomOffsets, SequenceOffsets};
pub use temporal::{DateRange, TemporalError, Timezone};
