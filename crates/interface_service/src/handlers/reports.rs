//! Report archive handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use core_kernel::temporal::parse_date;
use core_kernel::DateRange;
use domain_queue::EntryOutcome;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::report::ReportSummary;
use crate::AppState;

/// Longest range accepted by the summary endpoint, in days
const MAX_SUMMARY_DAYS: i64 = 366;

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyReportResponse {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: ReportSummary,
    pub items: Vec<EntryOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub summary: ReportSummary,
}

/// Outcomes recorded today
pub async fn today(State(state): State<AppState>) -> Result<Json<DailyReportResponse>, ApiError> {
    daily_report(&state, state.timezone.today()).await
}

/// Outcomes recorded on a given day
pub async fn by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DailyReportResponse>, ApiError> {
    let date = parse_date(&date).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    daily_report(&state, date).await
}

/// Totals over `start..=end`; both default to today
pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let today = state.timezone.today();
    let end = optional_date(query.end.as_deref())?.unwrap_or(today);
    let start = optional_date(query.start.as_deref())?.unwrap_or(end);

    let range = DateRange::new(start, end).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if (range.end - range.start).num_days() >= MAX_SUMMARY_DAYS {
        return Err(ApiError::BadRequest(format!(
            "range must not exceed {MAX_SUMMARY_DAYS} days"
        )));
    }

    let summary = state.reports.summary_range(range).await?;
    Ok(Json(SummaryResponse { start, end, summary }))
}

async fn daily_report(state: &AppState, date: NaiveDate) -> Result<Json<DailyReportResponse>, ApiError> {
    let items = state.reports.results(date).await?;
    Ok(Json(DailyReportResponse {
        date,
        summary: ReportSummary::of(&items),
        items,
    }))
}

fn optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_date(value)
            .map(Some)
            .map_err(|e| ApiError::BadRequest(e.to_string())),
        None => Ok(None),
    }
}
