//! Health and status handlers

use axum::{extract::State, Json};
use core_kernel::{AdapterHealth, HealthCheckResult};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: AdapterHealth,
    pub version: String,
    pub timezone: String,
    pub checks: Vec<HealthCheckResult>,
}

/// Adapter status endpoint
///
/// Runs every registered health check in turn. The overall status is the
/// worst of the individual ones.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut checks = Vec::with_capacity(state.health_checks.len());
    for adapter in &state.health_checks {
        checks.push(adapter.health_check().await);
    }

    Json(StatusResponse {
        status: overall(&checks),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timezone: state.timezone.name().to_string(),
        checks,
    })
}

fn overall(checks: &[HealthCheckResult]) -> AdapterHealth {
    if checks.iter().any(|c| c.status == AdapterHealth::Unhealthy) {
        AdapterHealth::Unhealthy
    } else if checks.iter().all(|c| c.status == AdapterHealth::Healthy) {
        AdapterHealth::Healthy
    } else {
        AdapterHealth::Degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        assert_eq!(overall(&[]), AdapterHealth::Healthy);
        assert_eq!(
            overall(&[HealthCheckResult::healthy("db", 1), HealthCheckResult::unhealthy("svc", 5, "down")]),
            AdapterHealth::Unhealthy
        );

        let mut unknown = HealthCheckResult::healthy("svc", 0);
        unknown.status = AdapterHealth::Unknown;
        assert_eq!(overall(&[HealthCheckResult::healthy("db", 1), unknown]), AdapterHealth::Degraded);
    }
}
