//! Queue service settings
//!
//! Credentials of the antrean service and the payer code are maintained by
//! the hospital in `mlite_settings` under the `jkn_mobile` module.

use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::{instrument, warn};

use domain_queue::ServiceCredentials;

use crate::error::DatabaseError;
use crate::repositories::settings::{SettingsRepository, QUEUE_MODULE};

/// Payer code used when the settings table has none
pub const DEFAULT_PAYER_CODE: &str = "BPJ";

const FIELD_CONSUMER_ID: &str = "BpjsConsID";
const FIELD_SECRET_KEY: &str = "BpjsSecretKey";
const FIELD_BASE_URL: &str = "BpjsAntrianUrl";
const FIELD_USER_KEY: &str = "BpjsUserKey";
const FIELD_PAYER_CODE: &str = "kd_pj_bpjs";

const FIELDS: [&str; 5] = [
    FIELD_CONSUMER_ID,
    FIELD_SECRET_KEY,
    FIELD_BASE_URL,
    FIELD_USER_KEY,
    FIELD_PAYER_CODE,
];

/// Settings needed to reconcile and submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub credentials: ServiceCredentials,
    /// `kd_pj` of the insurance payer
    pub payer_code: String,
}

impl QueueSettings {
    /// Builds settings from a field map, trimming every value
    pub fn from_values(values: &HashMap<String, String>) -> Self {
        let get = |field: &str| values.get(field).map(|v| v.trim().to_string()).unwrap_or_default();

        let payer_code = match get(FIELD_PAYER_CODE) {
            code if code.is_empty() => DEFAULT_PAYER_CODE.to_string(),
            code => code,
        };

        Self {
            credentials: ServiceCredentials {
                consumer_id: get(FIELD_CONSUMER_ID),
                secret_key: get(FIELD_SECRET_KEY),
                base_url: get(FIELD_BASE_URL),
                user_key: get(FIELD_USER_KEY),
            },
            payer_code,
        }
    }
}

/// Reads the queue settings from the database
///
/// Missing fields are left empty; credential validation happens when the
/// service client is built.
#[instrument(skip(pool))]
pub async fn load_queue_settings(pool: &MySqlPool) -> Result<QueueSettings, DatabaseError> {
    let repository = SettingsRepository::new(pool.clone());
    let values = repository.module_values(QUEUE_MODULE, &FIELDS).await?;

    if values.len() < FIELDS.len() {
        let missing: Vec<&str> = FIELDS.iter().copied().filter(|f| !values.contains_key(*f)).collect();
        warn!(?missing, "Queue settings incomplete");
    }

    Ok(QueueSettings::from_values(&values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_settings_from_values() {
        let settings = QueueSettings::from_values(&values(&[
            ("BpjsConsID", "12345"),
            ("BpjsSecretKey", " secret "),
            ("BpjsAntrianUrl", "https://apijkn.example.id/antreanrs/"),
            ("BpjsUserKey", "user-key"),
            ("kd_pj_bpjs", "A02"),
        ]));

        assert_eq!(settings.credentials.consumer_id, "12345");
        assert_eq!(settings.credentials.secret_key, "secret");
        assert_eq!(settings.credentials.base_url, "https://apijkn.example.id/antreanrs/");
        assert_eq!(settings.payer_code, "A02");
        assert!(settings.credentials.validate().is_ok());
    }

    #[test]
    fn test_payer_code_defaults() {
        let settings = QueueSettings::from_values(&values(&[("kd_pj_bpjs", "  ")]));
        assert_eq!(settings.payer_code, DEFAULT_PAYER_CODE);
        assert!(settings.credentials.validate().is_err());
    }
}
