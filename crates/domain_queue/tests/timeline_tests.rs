//! Integration tests for timeline resolution and normalization
//!
//! Runs the resolver and sequencer together on realistic source snapshots,
//! and checks the sequencer's ordering guarantees on arbitrary timelines.

use chrono::{NaiveDate, NaiveDateTime};
use core_kernel::{
    BookingCode, EntryReference, FixedOffsets, MedicalRecordNumber, OffsetSource, RandomOffsets, Timezone,
};
use domain_queue::{
    CheckpointStatus, Entry, Sequencer, SourceSnapshot, StoredCheckpoint, TaskId, Timeline, TimelineResolver,
};
use proptest::prelude::*;
use std::sync::Arc;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    date().and_hms_opt(h, m, 0).unwrap()
}

fn entry() -> Entry {
    Entry::new(
        EntryReference::new("2024/03/04/000017").unwrap(),
        BookingCode::new("20240304000017").unwrap(),
        MedicalRecordNumber::new("000017").unwrap(),
        date(),
    )
}

fn run(sources: SourceSnapshot, stored: &[StoredCheckpoint], offsets: Arc<dyn OffsetSource>) -> Timeline {
    let resolver = TimelineResolver::new(Timezone::default(), offsets.clone());
    let sequencer = Sequencer::new(offsets);
    sequencer.normalize(resolver.resolve(&entry(), stored, &sources))
}

fn values(timeline: &Timeline) -> Vec<Option<NaiveDateTime>> {
    TaskId::ALL.into_iter().map(|t| timeline.value(t)).collect()
}

mod scenarios {
    use super::*;

    #[test]
    fn test_early_counter_times_are_floored_and_ordered() {
        let sources = SourceSnapshot {
            admission_start: Some(at(7, 50)),
            admission_end: Some(at(7, 55)),
            ..SourceSnapshot::default()
        };
        let timeline = run(sources, &[], Arc::new(FixedOffsets(3)));

        assert_eq!(
            values(&timeline),
            vec![
                Some(at(8, 0)),
                Some(at(8, 1)),
                Some(at(8, 2)),
                Some(at(8, 5)),
                Some(at(8, 11)),
                None,
                None,
            ]
        );
        assert!(!timeline.get(TaskId::AdmissionWait).slot.is_generated());
        assert!(timeline.get(TaskId::FileDispatch).slot.is_generated());
        assert!(timeline.get(TaskId::ClinicService).slot.is_generated());
    }

    #[test]
    fn test_receipt_equal_to_dispatch_is_repaired() {
        let sources = SourceSnapshot {
            admission_start: Some(at(8, 40)),
            admission_end: Some(at(8, 45)),
            file_dispatch: Some(at(9, 0)),
            file_receipt: Some(at(9, 0)),
            clinic_examination: Some(at(9, 30)),
            ..SourceSnapshot::default()
        };
        let timeline = run(sources, &[], Arc::new(FixedOffsets(2)));

        assert_eq!(timeline.value(TaskId::FileReceipt), Some(at(9, 2)));
        assert_eq!(timeline.value(TaskId::ClinicService), Some(at(9, 30)));
        assert!((0..5).all(|i| !timeline.get(TaskId::ALL[i]).slot.is_generated()));
    }

    #[test]
    fn test_registration_time_backs_missing_counter() {
        let sources = SourceSnapshot {
            registration: Some(at(10, 15)),
            ..SourceSnapshot::default()
        };
        let timeline = run(sources, &[], Arc::new(FixedOffsets(3)));

        assert_eq!(
            values(&timeline)[..5],
            [
                Some(at(10, 15)),
                Some(at(10, 17)),
                Some(at(10, 18)),
                Some(at(10, 21)),
                Some(at(10, 31)),
            ]
        );
    }

    #[test]
    fn test_half_pharmacy_pair_is_dropped() {
        let sources = SourceSnapshot {
            admission_start: Some(at(8, 10)),
            admission_end: Some(at(8, 15)),
            prescription_start: Some(at(10, 0)),
            ..SourceSnapshot::default()
        };
        let timeline = run(sources, &[], Arc::new(FixedOffsets(3)));

        assert!(!timeline.is_present(TaskId::PharmacyStart));
        assert!(!timeline.is_present(TaskId::PharmacyEnd));
    }

    #[test]
    fn test_complete_pharmacy_pair_is_kept() {
        let sources = SourceSnapshot {
            admission_start: Some(at(8, 10)),
            admission_end: Some(at(8, 15)),
            clinic_examination: Some(at(9, 30)),
            prescription_start: Some(at(9, 45)),
            prescription_end: Some(at(10, 5)),
            ..SourceSnapshot::default()
        };
        let timeline = run(sources, &[], Arc::new(FixedOffsets(3)));

        assert_eq!(timeline.value(TaskId::PharmacyStart), Some(at(9, 45)));
        assert_eq!(timeline.value(TaskId::PharmacyEnd), Some(at(10, 5)));
    }

    #[test]
    fn test_confirmed_rows_bound_later_slots() {
        let tz = Timezone::default();
        let mut confirmed = StoredCheckpoint::pending(
            entry().reference,
            date(),
            TaskId::FileDispatch,
            tz.to_millis(Some(at(9, 40))),
            false,
        );
        confirmed.status = CheckpointStatus::Confirmed;

        let sources = SourceSnapshot {
            admission_start: Some(at(8, 10)),
            admission_end: Some(at(8, 15)),
            file_receipt: Some(at(9, 20)),
            clinic_examination: Some(at(9, 50)),
            ..SourceSnapshot::default()
        };
        let timeline = run(sources, &[confirmed], Arc::new(FixedOffsets(4)));

        assert!(timeline.is_confirmed(TaskId::FileDispatch));
        assert_eq!(timeline.value(TaskId::FileDispatch), Some(at(9, 40)));
        assert_eq!(timeline.value(TaskId::FileReceipt), Some(at(9, 44)));
        assert_eq!(timeline.value(TaskId::ClinicService), Some(at(9, 50)));
    }
}

mod properties {
    use super::*;

    fn arb_value() -> impl Strategy<Value = Option<NaiveDateTime>> {
        prop::option::of((0u32..20, 0u32..60).prop_map(|(h, m)| at(h, m)))
    }

    fn arb_timeline() -> impl Strategy<Value = Timeline> {
        prop::array::uniform7(arb_value()).prop_map(Timeline::from_values)
    }

    fn sequencer() -> Sequencer {
        Sequencer::new(Arc::new(RandomOffsets))
    }

    proptest! {
        #[test]
        fn prop_present_slots_strictly_increase(timeline in arb_timeline()) {
            let out = sequencer().normalize(timeline);
            let present: Vec<NaiveDateTime> = TaskId::ALL.into_iter().filter_map(|t| out.value(t)).collect();
            prop_assert!(present.windows(2).all(|w| w[0] < w[1]), "not increasing: {:?}", present);
        }

        #[test]
        fn prop_nothing_before_opening(timeline in arb_timeline()) {
            let out = sequencer().normalize(timeline);
            for task in TaskId::ALL {
                if let Some(value) = out.value(task) {
                    prop_assert!(value >= at(8, 0));
                }
            }
        }

        #[test]
        fn prop_pharmacy_pair_complete_or_absent(timeline in arb_timeline()) {
            let out = sequencer().normalize(timeline);
            prop_assert_eq!(out.is_present(TaskId::PharmacyStart), out.is_present(TaskId::PharmacyEnd));
        }

        #[test]
        fn prop_first_five_slots_keep_presence(timeline in arb_timeline()) {
            let out = sequencer().normalize(timeline);
            for task in TaskId::ALL.into_iter().take(5) {
                prop_assert_eq!(out.is_present(task), timeline.is_present(task));
            }
        }

        #[test]
        fn prop_values_never_move_backward(timeline in arb_timeline()) {
            let out = sequencer().normalize(timeline);
            for task in TaskId::ALL {
                if let (Some(before), Some(after)) = (timeline.value(task), out.value(task)) {
                    prop_assert!(after >= before.max(at(8, 0)));
                }
            }
        }

        #[test]
        fn prop_normalize_is_idempotent(timeline in arb_timeline()) {
            let sequencer = sequencer();
            let once = sequencer.normalize(timeline);
            let twice = sequencer.normalize(once);
            prop_assert_eq!(once, twice);
        }
    }
}
