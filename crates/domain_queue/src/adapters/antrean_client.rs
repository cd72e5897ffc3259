//! Antrean HTTP Adapter
//!
//! Signed client for the queue service's `antrean/updatewaktu` endpoint.
//!
//! Every request carries the consumer id, the current unix time and a
//! signature computed as `base64(HMAC-SHA256(secret, "{cons_id}&{timestamp}"))`.
//! The response body is parsed whatever the HTTP status; the service reports
//! its verdict in `metadata.code`.
//!
//! # Error Handling
//!
//! - Empty base URL or consumer id -> `SubmissionError::Configuration`
//! - Network failure or timeout -> `SubmissionError::Transport`
//! - Body that is not a response envelope -> `SubmissionError::Protocol`

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use core_kernel::{BookingCode, DomainPort, HealthCheckResult, HealthCheckable};

use crate::checkpoint::TaskId;
use crate::error::SubmissionError;
use crate::ports::QueueServicePort;
use crate::response::ServiceResponse;

type HmacSha256 = Hmac<Sha256>;

const UPDATE_TIME_PATH: &str = "antrean/updatewaktu";

/// Content type the service expects, although the body is JSON
const SERVICE_CONTENT_TYPE: &str = "Application/x-www-form-urlencoded";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials of the queue service, stored in the settings table
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCredentials {
    pub consumer_id: String,
    pub secret_key: String,
    /// Base URL, e.g. `https://apijkn.example.id/antreanrs/`
    pub base_url: String,
    pub user_key: String,
}

impl ServiceCredentials {
    /// Checks the fields needed to send anything
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.base_url.trim().is_empty() {
            return Err(SubmissionError::configuration("antrean URL not configured"));
        }
        if self.consumer_id.trim().is_empty() {
            return Err(SubmissionError::configuration("consumer id not configured"));
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("consumer_id", &self.consumer_id)
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("user_key", &"<redacted>")
            .finish()
    }
}

/// Computes the request signature for a consumer id and unix timestamp
pub fn sign(secret_key: &str, consumer_id: &str, timestamp: i64) -> Result<String, SubmissionError> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|err| SubmissionError::configuration(format!("invalid secret key: {err}")))?;
    mac.update(format!("{consumer_id}&{timestamp}").as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Serialize)]
struct UpdateTimeRequest<'a> {
    kodebooking: &'a str,
    taskid: u8,
    waktu: i64,
}

/// Queue service client implementing [`QueueServicePort`]
#[derive(Debug, Clone)]
pub struct AntreanClient {
    client: Client,
    credentials: ServiceCredentials,
}

impl AntreanClient {
    /// Creates a client with the given request timeout
    ///
    /// # Arguments
    ///
    /// * `credentials` - Consumer id, secret, base URL and user key
    /// * `timeout` - Bound on every request, connection included
    ///
    /// # Returns
    ///
    /// The client, or a configuration error when the base URL or consumer id
    /// is missing
    pub fn new(credentials: ServiceCredentials, timeout: Duration) -> Result<Self, SubmissionError> {
        credentials.validate()?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SubmissionError::configuration(format!("http client build failed: {err}")))?;
        Ok(Self { client, credentials })
    }

    pub fn base_url(&self) -> &str {
        &self.credentials.base_url
    }

    fn update_time_url(&self) -> String {
        format!("{}/{}", self.credentials.base_url.trim_end_matches('/'), UPDATE_TIME_PATH)
    }
}

impl DomainPort for AntreanClient {}

#[async_trait]
impl HealthCheckable for AntreanClient {
    /// Reports whether the base URL answers at all
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = self.client.get(&self.credentials.base_url).send().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("antrean-client", latency_ms),
            Err(err) => HealthCheckResult::unhealthy("antrean-client", latency_ms, err.to_string()),
        }
    }
}

#[async_trait]
impl QueueServicePort for AntreanClient {
    #[instrument(skip(self, booking_code, task), fields(booking = %booking_code, %task))]
    async fn update_time(
        &self,
        booking_code: &BookingCode,
        task: TaskId,
        value_ms: i64,
    ) -> Result<ServiceResponse, SubmissionError> {
        let timestamp = Utc::now().timestamp();
        let signature = sign(&self.credentials.secret_key, &self.credentials.consumer_id, timestamp)?;

        let body = serde_json::to_string(&UpdateTimeRequest {
            kodebooking: booking_code.as_str(),
            taskid: task.number(),
            waktu: value_ms,
        })
        .map_err(|err| SubmissionError::protocol(format!("request encoding failed: {err}"), String::new()))?;

        let response = self
            .client
            .post(self.update_time_url())
            .header(CONTENT_TYPE, SERVICE_CONTENT_TYPE)
            .header("X-cons-id", &self.credentials.consumer_id)
            .header("X-timestamp", timestamp.to_string())
            .header("X-signature", signature)
            .header("user_key", &self.credentials.user_key)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SubmissionError::transport(format!("request timed out: {err}"))
                } else {
                    SubmissionError::transport(err.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| SubmissionError::transport(format!("reading response failed: {err}")))?;
        debug!(%status, body = %text, "queue service answered");

        parse_response(&text)
    }
}

/// Parses a response envelope, keeping the raw body on failure
pub fn parse_response(body: &str) -> Result<ServiceResponse, SubmissionError> {
    serde_json::from_str(body).map_err(|err| SubmissionError::protocol(format!("{err}, body: {body}"), body))
}
