//! Property-Based Test Generators
//!
//! Proptest strategies for timelines and source snapshots on the standard
//! service date.

use chrono::NaiveDateTime;
use domain_queue::{SourceSnapshot, Timeline};
use proptest::prelude::*;

use crate::fixtures::TimeFixtures;

/// Strategy for a wall-clock time between 00:00 and 19:59 on the service date
pub fn time_of_day_strategy() -> impl Strategy<Value = NaiveDateTime> {
    (0u32..20, 0u32..60).prop_map(|(h, m)| TimeFixtures::at(h, m))
}

/// Strategy for an optional time, present about two times out of three
pub fn optional_time_strategy() -> impl Strategy<Value = Option<NaiveDateTime>> {
    prop_oneof![
        1 => Just(None),
        2 => time_of_day_strategy().prop_map(Some),
    ]
}

/// Strategy for an unnormalized timeline with arbitrary values and gaps
pub fn raw_timeline_strategy() -> impl Strategy<Value = Timeline> {
    prop::array::uniform7(optional_time_strategy()).prop_map(Timeline::from_values)
}

/// Strategy for a source snapshot with arbitrary gaps
pub fn snapshot_strategy() -> impl Strategy<Value = SourceSnapshot> {
    (
        optional_time_strategy(),
        optional_time_strategy(),
        optional_time_strategy(),
        optional_time_strategy(),
        optional_time_strategy(),
        optional_time_strategy(),
        optional_time_strategy(),
        optional_time_strategy(),
    )
        .prop_map(
            |(registration, start, end, dispatch, receipt, examination, rx_start, rx_end)| SourceSnapshot {
                registration,
                admission_start: start,
                admission_end: end,
                file_dispatch: dispatch,
                file_receipt: receipt,
                clinic_examination: examination,
                prescription_start: rx_start,
                prescription_end: rx_end,
            },
        )
}
