//! Queue Task Timeline Domain
//!
//! This crate reconciles the seven administrative checkpoints of a booking
//! and reports them to the national queue service, which only accepts
//! strictly increasing times per booking.
//!
//! # Pipeline
//!
//! - **Resolver**: gathers values from persisted rows and hospital records,
//!   synthesizing missing ones with bounded random offsets
//! - **Sequencer**: floors to opening time, repairs order, drops incomplete
//!   pharmacy pairs
//! - **Submission engine**: sends open slots in order, bumps stale values,
//!   retries monotonicity rejections once with a forward cascade
//! - **Reconciler**: runs the above for one entry and reports an outcome
//!
//! # Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use core_kernel::FixedOffsets;
//! use domain_queue::{Sequencer, TaskId, Timeline};
//! use std::sync::Arc;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
//! let timeline = Timeline::from_values([
//!     Some(day.and_hms_opt(7, 50, 0).unwrap()),
//!     Some(day.and_hms_opt(7, 55, 0).unwrap()),
//!     None,
//!     None,
//!     None,
//!     None,
//!     None,
//! ]);
//!
//! let normalized = Sequencer::new(Arc::new(FixedOffsets(1))).normalize(timeline);
//! assert_eq!(normalized.value(TaskId::AdmissionWait), day.and_hms_opt(8, 0, 0));
//! assert_eq!(normalized.value(TaskId::AdmissionService), day.and_hms_opt(8, 1, 0));
//! ```

pub mod adapters;
pub mod cascade;
pub mod checkpoint;
pub mod entry;
pub mod error;
pub mod outcome;
pub mod ports;
pub mod reconcile;
pub mod resolver;
pub mod response;
pub mod sequencer;
pub mod submission;
pub mod timeline;

pub use adapters::{AntreanClient, ServiceCredentials};
pub use cascade::{cascade_forward, Cascade};
pub use checkpoint::{note_for, Checkpoint, CheckpointStatus, Slot, StoredCheckpoint, TaskId};
pub use entry::{Entry, SourceSnapshot};
pub use error::{InvalidTaskId, ReconcileError, SubmissionError};
pub use outcome::{EntryOutcome, SlotOutcome, SlotStatus};
pub use ports::{CheckpointStore, EntrySource, QueueServicePort, SourceRecords};
pub use reconcile::Reconciler;
pub use resolver::TimelineResolver;
pub use response::{ServiceResponse, Verdict};
pub use sequencer::Sequencer;
pub use submission::{SubmissionEngine, SubmissionReport, SubmissionScope};
pub use timeline::Timeline;
