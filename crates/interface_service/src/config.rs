//! Service configuration
//!
//! Values come from an optional YAML file and from environment variables
//! prefixed with `TASKID`, sections separated by `__`:
//!
//! ```text
//! TASKID_DATABASE__HOST=10.0.0.5
//! TASKID_WATCHER__POLL_INTERVAL_SECS=10
//! TASKID_API__ENABLED=true
//! ```
//!
//! Queue service credentials are not part of this file; they are read from
//! the hospital settings table at startup.

use core_kernel::Timezone;
use infra_db::DatabaseConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ServiceError;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Full service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database: DatabaseSection,
    pub watcher: WatcherSection,
    pub api: ApiSection,
    pub report: ReportSection,
    pub service: QueueSection,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl ServiceConfig {
    /// Loads configuration from a file (if present) and the environment
    ///
    /// # Arguments
    ///
    /// * `path` - YAML file; a missing file is not an error
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let mut config: ServiceConfig = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("TASKID")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if config.log_level.trim().is_empty() {
            config.log_level = "info".to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would only fail later at runtime
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.service.timezone()?;
        if self.watcher.poll_interval_secs == 0 {
            return Err(ServiceError::Configuration(
                "watcher.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.service.request_timeout_secs == 0 {
            return Err(ServiceError::Configuration(
                "service.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// `database` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            name: "mlite".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseSection {
    /// Pool configuration for this section
    pub fn pool_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.host, self.port, &self.user, &self.password, &self.name)
            .max_connections(self.max_connections.max(1))
    }
}

/// `watcher` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherSection {
    pub poll_interval_secs: u64,
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self { poll_interval_secs: 5 }
    }
}

impl WatcherSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// `api` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Serve the status API alongside the watcher
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 8085,
        }
    }
}

impl ApiSection {
    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `report` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    /// Directory holding one JSON file per processing day
    pub dir: String,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            dir: "./reports".to_string(),
        }
    }
}

/// `service` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    /// IANA zone of the facility
    pub timezone: String,
    pub request_timeout_secs: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            timezone: "Asia/Jakarta".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl QueueSection {
    pub fn timezone(&self) -> Result<Timezone, ServiceError> {
        Timezone::parse(&self.timezone).map_err(|e| ServiceError::Configuration(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
