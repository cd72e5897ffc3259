//! External Adapters for the Queue Domain
//!
//! - **AntreanClient**: signed HTTP client for the queue service
//! - Mocks for every port live in [`crate::ports::mock`]
//!
//! ```rust,ignore
//! use domain_queue::adapters::{AntreanClient, ServiceCredentials, DEFAULT_TIMEOUT};
//! use domain_queue::QueueServicePort;
//! use std::sync::Arc;
//!
//! let client = AntreanClient::new(credentials, DEFAULT_TIMEOUT)?;
//! let port: Arc<dyn QueueServicePort> = Arc::new(client);
//! ```

pub mod antrean_client;

pub use antrean_client::{sign, AntreanClient, ServiceCredentials, DEFAULT_TIMEOUT};
