//! BarSeries — ordered, deduplicated, time-indexed bars.
//!
//! The ordering invariant is checked once at construction; every consumer
//! (simulator, walk-forward slicing) relies on it afterwards.

use chrono::NaiveDateTime;

use super::bar::Bar;
use crate::error::DataIntegrityError;

/// Bars in strictly ascending timestamp order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate ordering and prices, then wrap the bars.
    pub fn new(bars: Vec<Bar>) -> Result<Self, DataIntegrityError> {
        if bars.is_empty() {
            return Err(DataIntegrityError::EmptySeries);
        }
        for (i, bar) in bars.iter().enumerate() {
            if bar.is_void()
                || bar.open <= 0.0
                || bar.high <= 0.0
                || bar.low <= 0.0
                || bar.close <= 0.0
                || bar.volume < 0.0
            {
                return Err(DataIntegrityError::InsaneBar {
                    timestamp: bar.timestamp,
                });
            }
            if i == 0 {
                continue;
            }
            let previous = bars[i - 1].timestamp;
            if bar.timestamp == previous {
                return Err(DataIntegrityError::DuplicateTimestamp {
                    index: i,
                    timestamp: bar.timestamp,
                });
            }
            if bar.timestamp < previous {
                return Err(DataIntegrityError::NonMonotonic {
                    index: i,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_timestamp(&self) -> NaiveDateTime {
        self.bars[0].timestamp
    }

    pub fn last_timestamp(&self) -> NaiveDateTime {
        self.bars[self.bars.len() - 1].timestamp
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Bars with `start <= timestamp < end`, or `None` if that range holds no bars.
    ///
    /// Borrows from the series; sub-slices keep its ordering guarantees.
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Option<&[Bar]> {
        let lo = self.bars.partition_point(|b| b.timestamp < start);
        let hi = self.bars.partition_point(|b| b.timestamp < end);
        (lo < hi).then(|| &self.bars[lo..hi])
    }

    /// Split at `at`: bars strictly before, and bars at or after.
    pub fn split_at_time(&self, at: NaiveDateTime) -> (Option<&[Bar]>, Option<&[Bar]>) {
        let (before, after) = self.bars.split_at(self.bars.partition_point(|b| b.timestamp < at));
        (
            (!before.is_empty()).then_some(before),
            (!after.is_empty()).then_some(after),
        )
    }
}
