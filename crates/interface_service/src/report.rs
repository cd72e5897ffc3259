//! JSON report archive
//!
//! One file per processing day (`<dir>/<YYYY-MM-DD>.json`) holding the
//! outcomes of that day. Saving an outcome for a reference already present
//! in the day replaces the earlier one. Per-day summaries are cached in
//! memory and refreshed on every save.

use chrono::{Duration, NaiveDate};
use core_kernel::DateRange;
use domain_queue::EntryOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::ReportError;

/// Days loaded into the summary cache when the archive is opened
const PRELOAD_DAYS: i64 = 31;

/// Contents of one day's file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub results: Vec<EntryOutcome>,
}

/// Counts for one day or a range of days
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
}

impl ReportSummary {
    pub fn of(results: &[EntryOutcome]) -> Self {
        let success = results.iter().filter(|r| r.is_success()).count();
        Self {
            processed: results.len(),
            success,
            failed: results.len() - success,
        }
    }

    fn add(&mut self, other: ReportSummary) {
        self.processed += other.processed;
        self.success += other.success;
        self.failed += other.failed;
    }
}

/// File-backed outcome archive
#[derive(Debug)]
pub struct ReportStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
    summaries: RwLock<HashMap<NaiveDate, ReportSummary>>,
}

impl ReportStore {
    /// Opens the archive, creating the directory if needed
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory holding the daily files
    /// * `today` - Processing day; summaries of the preceding month are preloaded
    pub async fn open(dir: impl Into<PathBuf>, today: NaiveDate) -> Result<Self, ReportError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ReportError::io(&dir, e))?;

        let store = Self {
            dir,
            write_lock: Mutex::new(()),
            summaries: RwLock::new(HashMap::new()),
        };

        for back in 0..PRELOAD_DAYS {
            let date = today - Duration::days(back);
            if let Some(report) = store.read_day(date).await? {
                store.summaries.write().await.insert(date, ReportSummary::of(&report.results));
            }
        }

        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Reads a day's file; `None` when it does not exist
    ///
    /// A file that cannot be parsed is treated as empty.
    async fn read_day(&self, date: NaiveDate) -> Result<Option<DailyReport>, ReportError> {
        let path = self.file_path(date);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReportError::io(&path, e)),
        };

        match serde_json::from_slice::<DailyReport>(&bytes) {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable report file, treating as empty");
                Ok(Some(DailyReport {
                    date,
                    results: Vec::new(),
                }))
            }
        }
    }

    /// Stores an outcome under a processing day
    ///
    /// An earlier outcome of the same reference on that day is replaced.
    pub async fn save(&self, date: NaiveDate, outcome: EntryOutcome) -> Result<(), ReportError> {
        let _guard = self.write_lock.lock().await;

        let mut report = self.read_day(date).await?.unwrap_or_else(|| DailyReport {
            date,
            results: Vec::new(),
        });
        report.date = date;

        match report.results.iter_mut().find(|r| r.reference == outcome.reference) {
            Some(existing) => *existing = outcome,
            None => report.results.push(outcome),
        }

        let path = self.file_path(date);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&report)?;
        tokio::fs::write(&tmp, body).await.map_err(|e| ReportError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| ReportError::io(&path, e))?;

        self.summaries.write().await.insert(date, ReportSummary::of(&report.results));
        debug!(%date, count = report.results.len(), "Report saved");
        Ok(())
    }

    /// Outcomes of a day, empty when nothing was recorded
    pub async fn results(&self, date: NaiveDate) -> Result<Vec<EntryOutcome>, ReportError> {
        Ok(self.read_day(date).await?.map(|r| r.results).unwrap_or_default())
    }

    pub async fn summary(&self, date: NaiveDate) -> Result<ReportSummary, ReportError> {
        if let Some(summary) = self.summaries.read().await.get(&date) {
            return Ok(*summary);
        }
        Ok(ReportSummary::of(&self.results(date).await?))
    }

    /// Totals over an inclusive range of days
    pub async fn summary_range(&self, range: DateRange) -> Result<ReportSummary, ReportError> {
        let mut total = ReportSummary::default();
        for date in range.days() {
            total.add(self.summary(date).await?);
        }
        Ok(total)
    }

    /// Whether the reference was fully submitted on the given day
    pub async fn is_processed(&self, reference: &str, date: NaiveDate) -> Result<bool, ReportError> {
        Ok(self
            .results(date)
            .await?
            .iter()
            .any(|r| r.reference.as_str() == reference && r.submission_done))
    }
}
