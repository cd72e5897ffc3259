//! Tests for the status API

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Duration;
use core_kernel::{HealthCheckable, Timezone};
use domain_queue::ports::mock::{MockCheckpointStore, MockQueueService};
use domain_queue::EntryOutcome;
use interface_service::report::ReportStore;
use interface_service::{create_router, AppState};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use test_utils::EntryFixtures;

struct TestApp {
    server: TestServer,
    reports: Arc<ReportStore>,
    store: Arc<MockCheckpointStore>,
    _dir: TempDir,
}

async fn app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let timezone = Timezone::default();
    let reports = Arc::new(ReportStore::open(dir.path(), timezone.today()).await.unwrap());
    let store = Arc::new(MockCheckpointStore::new());
    let service = Arc::new(MockQueueService::new());

    let health_checks: Vec<Arc<dyn HealthCheckable>> = vec![store.clone(), service];
    let state = AppState {
        reports: reports.clone(),
        health_checks,
        timezone,
    };

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        reports,
        store,
        _dir: dir,
    }
}

fn submitted(n: u32) -> EntryOutcome {
    let mut outcome = EntryOutcome::for_entry(&EntryFixtures::numbered(n));
    outcome.auto_order_done = true;
    outcome.submission_done = true;
    outcome
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_status_reports_adapters() {
    let app = app().await;

    let response = app.server.get("/api/status").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["timezone"], "Asia/Jakarta");
    assert_eq!(body["checks"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_is_unhealthy_when_an_adapter_fails() {
    let app = app().await;
    app.store.fail_reads(true);

    let body: Value = app.server.get("/api/status").await.json();

    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"][0]["adapter_id"], "mock-checkpoint-store");
}

#[tokio::test]
async fn test_today_report() {
    let app = app().await;
    let today = Timezone::default().today();
    app.reports.save(today, submitted(1)).await.unwrap();
    app.reports
        .save(today, EntryOutcome::failed(&EntryFixtures::numbered(2), "no task times"))
        .await
        .unwrap();

    let response = app.server.get("/api/reports/today").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["date"], today.format("%Y-%m-%d").to_string());
    assert_eq!(body["processed"], 2);
    assert_eq!(body["success"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_report_by_date() {
    let app = app().await;
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    app.reports.save(date, submitted(1)).await.unwrap();

    let body: Value = app.server.get("/api/reports/2024-03-04").await.json();
    assert_eq!(body["processed"], 1);
    assert_eq!(body["items"][0]["reference"], "0301R00103240000001");

    let empty: Value = app.server.get("/api/reports/2024-03-05").await.json();
    assert_eq!(empty["processed"], 0);
}

#[tokio::test]
async fn test_report_rejects_bad_date() {
    let app = app().await;

    let response = app.server.get("/api/reports/04-03-2024").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_summary_defaults_to_today() {
    let app = app().await;
    let today = Timezone::default().today();
    app.reports.save(today, submitted(1)).await.unwrap();

    let body: Value = app.server.get("/api/reports/summary").await.json();

    assert_eq!(body["start"], today.format("%Y-%m-%d").to_string());
    assert_eq!(body["end"], today.format("%Y-%m-%d").to_string());
    assert_eq!(body["processed"], 1);
}

#[tokio::test]
async fn test_summary_over_range() {
    let app = app().await;
    let today = Timezone::default().today();
    let earlier = today - Duration::days(3);
    app.reports.save(today, submitted(1)).await.unwrap();
    app.reports.save(earlier, submitted(2)).await.unwrap();

    let response = app
        .server
        .get("/api/reports/summary")
        .add_query_param("start", earlier.format("%Y-%m-%d").to_string())
        .add_query_param("end", today.format("%Y-%m-%d").to_string())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["processed"], 2);
    assert_eq!(body["success"], 2);
}

#[tokio::test]
async fn test_summary_rejects_invalid_ranges() {
    let app = app().await;

    app.server
        .get("/api/reports/summary")
        .add_query_param("start", "2024-03-05")
        .add_query_param("end", "2024-03-04")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .get("/api/reports/summary")
        .add_query_param("start", "2022-01-01")
        .add_query_param("end", "2024-03-04")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .get("/api/reports/summary")
        .add_query_param("start", "yesterday")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
