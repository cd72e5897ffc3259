//! Custom Test Assertions
//!
//! Assertion helpers for timelines and outcomes that print the whole
//! timeline on failure.

use chrono::NaiveTime;
use domain_queue::{EntryOutcome, SlotStatus, TaskId, Timeline};

fn describe(timeline: &Timeline) -> String {
    TaskId::ALL
        .into_iter()
        .map(|t| match timeline.value(t) {
            Some(v) => format!("{}={}", t.number(), v.format("%H:%M:%S")),
            None => format!("{}=-", t.number()),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Asserts that present values of unconfirmed slots strictly increase
pub fn assert_strictly_increasing(timeline: &Timeline) {
    let values: Vec<_> = timeline
        .iter()
        .filter(|(_, c)| !c.is_confirmed())
        .filter_map(|(t, c)| c.value().map(|v| (t, v)))
        .collect();

    for pair in values.windows(2) {
        assert!(
            pair[0].1 < pair[1].1,
            "{} is not before {}: {}",
            pair[0].0,
            pair[1].0,
            describe(timeline)
        );
    }
}

/// Asserts that no present value is before the 08:00 opening time
pub fn assert_after_opening(timeline: &Timeline) {
    let opening = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
    for (task, checkpoint) in timeline.iter() {
        if let Some(value) = checkpoint.value() {
            assert!(value.time() >= opening, "{} before opening: {}", task, describe(timeline));
        }
    }
}

/// Asserts that the pharmacy slots are both present or both absent
pub fn assert_pharmacy_pair(timeline: &Timeline) {
    assert_eq!(
        timeline.is_present(TaskId::PharmacyStart),
        timeline.is_present(TaskId::PharmacyEnd),
        "pharmacy pair incomplete: {}",
        describe(timeline)
    );
}

/// Asserts every normalization invariant at once
pub fn assert_normalized(timeline: &Timeline) {
    assert_strictly_increasing(timeline);
    assert_after_opening(timeline);
    assert_pharmacy_pair(timeline);
}

/// Asserts the final status of one slot of an outcome
pub fn assert_slot_status(outcome: &EntryOutcome, task: TaskId, expected: SlotStatus) {
    let slot = outcome
        .slot(task)
        .unwrap_or_else(|| panic!("{} missing from outcome of {}", task, outcome.reference));
    assert_eq!(
        slot.status, expected,
        "{} of {}: expected {:?}, got {:?} ({:?})",
        task, outcome.reference, expected, slot.status, slot.message
    );
}
