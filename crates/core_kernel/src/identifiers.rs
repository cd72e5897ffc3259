//! Strongly-typed identifiers for queue entities
//!
//! The hospital information system keys everything by free-form codes
//! (reference numbers, booking codes, medical-record numbers). Wrapping them
//! in newtypes prevents accidentally passing a booking code where the
//! checkpoint table expects a reference number.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when an identifier is blank
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} must not be empty")]
pub struct EmptyIdentifier {
    pub kind: &'static str,
}

macro_rules! define_code {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, trimming surrounding whitespace
            pub fn new(value: impl AsRef<str>) -> Result<Self, EmptyIdentifier> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(EmptyIdentifier { kind: $kind });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Human readable name of the identifier kind
            pub fn kind() -> &'static str {
                $kind
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = EmptyIdentifier;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Booking identity
define_code!(EntryReference, "reference number");
define_code!(BookingCode, "booking code");

// Patient / visit identity
define_code!(MedicalRecordNumber, "medical record number");
define_code!(VisitNumber, "visit number");

/// Identifier of one reconciliation pass, used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassId(Uuid);

impl PassId {
    /// Creates a new time-ordered pass identifier
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PASS-{}", self.0)
    }
}
