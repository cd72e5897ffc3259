//! Queue domain errors
//!
//! Submission errors describe a single call to the queue service. Reconcile
//! errors abort one entry before anything is submitted.

use core_kernel::PortError;
use thiserror::Error;

/// Task number outside 1..=7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task id {0} is outside 1..=7")]
pub struct InvalidTaskId(pub i64);

/// Failure of one submission to the queue service
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Missing endpoint or credentials
    #[error("Queue service not configured: {0}")]
    Configuration(String),

    /// Network failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be parsed
    #[error("Unparsable response: {message}")]
    Protocol { message: String, body: String },
}

impl SubmissionError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SubmissionError::Configuration(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        SubmissionError::Transport(message.into())
    }

    pub fn protocol(message: impl Into<String>, body: impl Into<String>) -> Self {
        SubmissionError::Protocol {
            message: message.into(),
            body: body.into(),
        }
    }
}

/// Failure that aborts one entry before submission
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Source records unavailable: {0}")]
    Sources(#[source] PortError),

    #[error("Checkpoint store failed: {0}")]
    Store(#[source] PortError),

    #[error("no task times")]
    NoTaskTimes,
}
