//! Sources of bounded random minute offsets
//!
//! Synthesized checkpoints and order repairs shift a value forward by a
//! random number of minutes. The source is injected so tests can pin the
//! offsets and reproduce a timeline exactly.

use rand::Rng;
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::Mutex;

/// Draws minute offsets from an inclusive range
pub trait OffsetSource: Send + Sync {
    fn offset_minutes(&self, range: RangeInclusive<i64>) -> i64;
}

/// Uniform offsets from the thread-local generator
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOffsets;

impl OffsetSource for RandomOffsets {
    fn offset_minutes(&self, range: RangeInclusive<i64>) -> i64 {
        if range.is_empty() {
            return *range.start();
        }
        rand::thread_rng().gen_range(range)
    }
}

/// Always returns the same offset, clamped into the requested range
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsets(pub i64);

impl OffsetSource for FixedOffsets {
    fn offset_minutes(&self, range: RangeInclusive<i64>) -> i64 {
        clamp_into(self.0, &range)
    }
}

/// Replays a scripted list of offsets, then falls back to the range start
#[derive(Debug, Default)]
pub struct SequenceOffsets {
    queue: Mutex<VecDeque<i64>>,
}

impl SequenceOffsets {
    pub fn new(values: impl IntoIterator<Item = i64>) -> Self {
        Self {
            queue: Mutex::new(values.into_iter().collect()),
        }
    }

    /// Number of scripted offsets not yet consumed
    pub fn remaining(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl OffsetSource for SequenceOffsets {
    fn offset_minutes(&self, range: RangeInclusive<i64>) -> i64 {
        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(value) => clamp_into(value, &range),
            None => *range.start(),
        }
    }
}

fn clamp_into(value: i64, range: &RangeInclusive<i64>) -> i64 {
    if range.is_empty() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_offsets_stay_in_range() {
        let source = RandomOffsets;
        for _ in 0..200 {
            let v = source.offset_minutes(10..=25);
            assert!((10..=25).contains(&v));
        }
    }

    #[test]
    fn test_fixed_offsets_clamp() {
        let source = FixedOffsets(3);
        assert_eq!(source.offset_minutes(1..=5), 3);
        assert_eq!(source.offset_minutes(10..=25), 10);
        assert_eq!(source.offset_minutes(1..=2), 2);
    }

    #[test]
    fn test_sequence_offsets_replay() {
        let source = SequenceOffsets::new([2, 7, 40]);
        assert_eq!(source.offset_minutes(1..=5), 2);
        assert_eq!(source.offset_minutes(1..=10), 7);
        assert_eq!(source.offset_minutes(10..=25), 25);
        assert_eq!(source.remaining(), 0);
        assert_eq!(source.offset_minutes(3..=7), 3);
    }
}
