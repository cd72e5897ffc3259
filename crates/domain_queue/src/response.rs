//! Queue service responses and their classification

use serde::{Deserialize, Serialize};

/// Phrase the service uses when a booking/task pair was already accepted
const DUPLICATE_PHRASE: &str = "sudah ada";

/// Phrase the service uses when a time is not after the previous one
const MONOTONICITY_PHRASE: &str = "tidak boleh kurang atau sama";

pub const CODE_OK: i64 = 200;
pub const CODE_ALREADY_REPORTED: i64 = 208;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Envelope returned by `antrean/updatewaktu`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub metadata: ResponseMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl ServiceResponse {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            metadata: ResponseMetadata {
                code,
                message: message.into(),
            },
            response: None,
        }
    }

    pub fn code(&self) -> i64 {
        self.metadata.code
    }

    pub fn message(&self) -> &str {
        &self.metadata.message
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::classify(self)
    }
}

/// How the engine treats a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    /// Already accepted earlier; treated as acceptance
    Duplicate,
    /// Rejected because the time is not after the last accepted one
    Conflict,
    Rejected,
}

impl Verdict {
    pub fn classify(response: &ServiceResponse) -> Self {
        let message = response.message();
        if response.code() == CODE_OK {
            Verdict::Accepted
        } else if response.code() == CODE_ALREADY_REPORTED && is_duplicate(message) {
            Verdict::Duplicate
        } else if is_monotonicity_violation(message) {
            Verdict::Conflict
        } else {
            Verdict::Rejected
        }
    }

    pub fn is_acceptance(self) -> bool {
        matches!(self, Verdict::Accepted | Verdict::Duplicate)
    }
}

/// Whether the message reports an already-recorded submission
pub fn is_duplicate(message: &str) -> bool {
    message.to_lowercase().contains(DUPLICATE_PHRASE)
}

/// Whether the message reports a non-increasing time
pub fn is_monotonicity_violation(message: &str) -> bool {
    message.to_lowercase().contains(MONOTONICITY_PHRASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(ServiceResponse::new(200, "Ok.").verdict(), Verdict::Accepted);
        assert_eq!(
            ServiceResponse::new(208, "TaskId=3 sudah ada").verdict(),
            Verdict::Duplicate
        );
        assert_eq!(
            ServiceResponse::new(
                201,
                "waktu TaskId=4 tidak boleh kurang atau sama dengan TaskId sebelumnya"
            )
            .verdict(),
            Verdict::Conflict
        );
        assert_eq!(ServiceResponse::new(201, "Data Booking tidak ditemukan").verdict(), Verdict::Rejected);
        // 208 without the phrase is a plain rejection
        assert_eq!(ServiceResponse::new(208, "Reported").verdict(), Verdict::Rejected);
    }

    #[test]
    fn test_phrase_matching_ignores_case() {
        assert!(is_duplicate("TaskID SUDAH ADA"));
        assert!(is_monotonicity_violation("Waktu Tidak Boleh Kurang Atau Sama"));
    }

    #[test]
    fn test_parse_envelope() {
        let body = r#"{"metadata":{"code":200,"message":"Ok."}}"#;
        let response: ServiceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.code(), 200);
        assert!(response.response.is_none());
        assert!(response.verdict().is_acceptance());
    }
}
