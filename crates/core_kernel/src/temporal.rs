//! Wall-clock handling for checkpoint timestamps
//!
//! Checkpoints are naive local date-times in the facility's time zone. The
//! external queue service and the persisted checkpoint table both speak in
//! epoch milliseconds, where `0` means "no value".

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Hour at which the facility opens; no checkpoint may precede it
pub const OPENING_HOUR: u32 = 8;

/// Placeholder MySQL writes into unset DATETIME columns
pub const ZERO_DATETIME: &str = "0000-00-00 00:00:00";

/// Canonical textual form used in logs and reports
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical date form used for service dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },
}

/// Timezone wrapper for the facility
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timezone::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA zone name such as `Asia/Jakarta`
    pub fn parse(name: &str) -> Result<Self, TemporalError> {
        Tz::from_str(name.trim())
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(name.to_string()))
    }

    /// Converts an optional local date-time to epoch milliseconds
    ///
    /// `None` maps to `0`. Local times that fall into a DST gap are read as UTC.
    pub fn to_millis(&self, value: Option<NaiveDateTime>) -> i64 {
        match value {
            None => 0,
            Some(t) => self
                .0
                .from_local_datetime(&t)
                .earliest()
                .map(|dt| dt.timestamp_millis())
                .unwrap_or_else(|| t.and_utc().timestamp_millis()),
        }
    }

    /// Converts epoch milliseconds back to a local date-time
    ///
    /// Non-positive values mean "unset" and map to `None`.
    pub fn from_millis(&self, millis: i64) -> Option<NaiveDateTime> {
        if millis <= 0 {
            return None;
        }
        DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(&self.0).naive_local())
    }

    /// Current wall-clock time in this zone
    pub fn now(&self) -> NaiveDateTime {
        chrono::Utc::now().with_timezone(&self.0).naive_local()
    }

    /// Today's date in this zone
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Asia::Jakarta)
    }
}

/// Opening time (08:00:00) on the given date
pub fn opening_time(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(OPENING_HOUR, 0, 0).unwrap_or_default())
}

/// Raises a value to 08:00:00 of its own date when it is earlier than that
pub fn floor_to_opening(value: NaiveDateTime) -> NaiveDateTime {
    if value.hour() < OPENING_HOUR {
        opening_time(value.date())
    } else {
        value
    }
}

pub fn add_minutes(value: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    value + Duration::minutes(minutes)
}

/// Whole minutes from `from` to `to`, truncated toward zero
pub fn whole_minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_minutes()
}

/// Parses a full date-time string as stored by the hospital system
///
/// Accepts `YYYY-MM-DD HH:MM:SS` and the ISO `T` separator, ignoring any
/// fractional seconds or zone suffix. Blank strings and the zero sentinel
/// yield `None`.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == ZERO_DATETIME || trimmed.len() < 19 {
        return None;
    }
    let head = trimmed.get(..19)?.replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&head, DATETIME_FORMAT).ok()
}

/// Parses a date column plus a separate time column
///
/// Date columns may carry a time suffix; only the first ten characters are
/// used.
pub fn parse_date_and_time(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = parse_date(date.trim().get(..10)?).ok()?;
    let time = time.trim();
    if time.is_empty() {
        return None;
    }
    let time = NaiveTime::parse_from_str(time.get(..8).unwrap_or(time), "%H:%M:%S").ok()?;
    Some(date.and_time(time))
}

/// Parses a `YYYY-MM-DD` date
pub fn parse_date(raw: &str) -> Result<NaiveDate, TemporalError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| TemporalError::InvalidDate(raw.to_string()))
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Inclusive range of service dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterates every date in the range, start first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_millis_round_trip_in_jakarta() {
        let tz = Timezone::default();
        let value = at(9, 15, 0);
        let millis = tz.to_millis(Some(value));
        // Asia/Jakarta is UTC+7
        assert_eq!(millis, at(2, 15, 0).and_utc().timestamp_millis());
        assert_eq!(tz.from_millis(millis), Some(value));
    }

    #[test]
    fn test_unset_maps_to_zero() {
        let tz = Timezone::default();
        assert_eq!(tz.to_millis(None), 0);
        assert_eq!(tz.from_millis(0), None);
        assert_eq!(tz.from_millis(-5), None);
    }

    #[test]
    fn test_floor_to_opening() {
        assert_eq!(floor_to_opening(at(7, 50, 0)), at(8, 0, 0));
        assert_eq!(floor_to_opening(at(0, 0, 1)), at(8, 0, 0));
        assert_eq!(floor_to_opening(at(8, 0, 0)), at(8, 0, 0));
        assert_eq!(floor_to_opening(at(13, 5, 9)), at(13, 5, 9));
    }

    #[test]
    fn test_whole_minutes_truncate() {
        assert_eq!(whole_minutes_between(at(9, 0, 0), at(9, 30, 59)), 30);
        assert_eq!(whole_minutes_between(at(9, 0, 0), at(9, 0, 59)), 0);
    }

    #[test]
    fn test_parse_datetime_variants() {
        assert_eq!(parse_datetime("2024-03-04 09:01:02"), Some(at(9, 1, 2)));
        assert_eq!(parse_datetime("2024-03-04T09:01:02Z"), Some(at(9, 1, 2)));
        assert_eq!(parse_datetime("2024-03-04T09:01:02.000+07:00"), Some(at(9, 1, 2)));
        assert_eq!(parse_datetime(ZERO_DATETIME), None);
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("garbage"), None);
    }

    #[test]
    fn test_parse_date_and_time() {
        assert_eq!(parse_date_and_time("2024-03-04", "10:20:30"), Some(at(10, 20, 30)));
        assert_eq!(
            parse_date_and_time("2024-03-04 00:00:00", "10:20:30"),
            Some(at(10, 20, 30))
        );
        assert_eq!(parse_date_and_time("2024-03-04", ""), None);
        assert_eq!(parse_date_and_time("", "10:20:30"), None);
    }

    #[test]
    fn test_timezone_parse() {
        assert_eq!(Timezone::parse("Asia/Jakarta").unwrap(), Timezone::default());
        assert!(Timezone::parse("Mars/Olympus").is_err());
    }

    #[test]
    fn test_date_range_days() {
        let start = parse_date("2024-02-28").unwrap();
        let end = parse_date("2024-03-01").unwrap();
        let range = DateRange::new(start, end).unwrap();
        assert_eq!(range.days().count(), 3);
        assert!(DateRange::new(end, start).is_err());
    }
}
