//! Service Layer
//!
//! Everything around the reconciliation engine that turns it into a
//! running service:
//!
//! - **Config**: YAML file plus `TASKID_*` environment variables
//! - **Scheduler**: cancellable poll loop over today's pending entries
//! - **Batch**: manual runs over a service date
//! - **Report**: JSON archive of per-entry outcomes
//! - **Handlers**: read-only JSON status API
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_service::{config::ServiceConfig, context::ServiceContext};
//!
//! let context = ServiceContext::connect(ServiceConfig::load("config.yaml")?).await?;
//! let handle = context.watcher().start();
//! ```

pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod report;
pub mod scheduler;

use axum::{routing::get, Router};
use core_kernel::{HealthCheckable, Timezone};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{health, reports};
use crate::report::ReportStore;

pub use batch::{BatchKind, BatchOptions, BatchRunner, BatchSummary};
pub use error::{ApiError, ReportError, ServiceError};
pub use scheduler::Watcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<ReportStore>,
    /// Adapters reported by `/api/status`
    pub health_checks: Vec<Arc<dyn HealthCheckable>>,
    pub timezone: Timezone,
}

/// Creates the status API router
///
/// # Arguments
///
/// * `state` - Report archive and adapters to report on
///
/// # Returns
///
/// Configured Axum router; every route is a read-only `GET`
pub fn create_router(state: AppState) -> Router {
    let report_routes = Router::new()
        .route("/today", get(reports::today))
        .route("/summary", get(reports::summary))
        .route("/:date", get(reports::by_date));

    let api_routes = Router::new()
        .route("/status", get(health::status))
        .nest("/reports", report_routes);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
