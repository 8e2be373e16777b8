//! Strategy trait and the enriched frame it reads from.
//!
//! A strategy has two required operations and one optional one:
//! - `enrich`: compute indicator columns once over the whole bar slice
//! - `signal`: map (frame, bar index, held position) to the next position
//! - `stop_loss`: checked before `signal`; `true` forces Flat for the bar
//!
//! All three must be pure: re-running a simulation with the same inputs
//! yields the same positions.

use std::collections::BTreeMap;

use crate::domain::{Bar, Position};
use crate::error::{IndicatorError, InvalidSignalError};

/// Bars plus named indicator columns, each as long as the bars.
#[derive(Debug, Clone)]
pub struct EnrichedBars<'a> {
    bars: &'a [Bar],
    columns: BTreeMap<String, Vec<f64>>,
}

impl<'a> EnrichedBars<'a> {
    pub fn new(bars: &'a [Bar]) -> Self {
        Self {
            bars,
            columns: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.insert(name.into(), values);
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    pub fn bar(&self, index: usize) -> Option<&'a Bar> {
        self.bars.get(index)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Column value at `index`; NaN when the column or index does not exist.
    ///
    /// Every comparison against NaN is false, so a missing value never
    /// triggers an entry or exit.
    pub fn value(&self, column: &str, index: usize) -> f64 {
        self.columns
            .get(column)
            .and_then(|v| v.get(index).copied())
            .unwrap_or(f64::NAN)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// First column whose length differs from the bar count, with its length.
    pub fn misaligned_column(&self) -> Option<(&str, usize)> {
        self.columns
            .iter()
            .find(|(_, v)| v.len() != self.bars.len())
            .map(|(k, v)| (k.as_str(), v.len()))
    }
}

/// Fail with `InsufficientHistory` unless `bars` holds more than `lookback` rows.
pub fn require_history(
    indicator: &str,
    lookback: usize,
    bars: &[Bar],
) -> Result<(), IndicatorError> {
    if bars.len() > lookback {
        Ok(())
    } else {
        Err(IndicatorError::InsufficientHistory {
            indicator: indicator.to_string(),
            required: lookback + 1,
            available: bars.len(),
        })
    }
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Add indicator columns. Never reorders or drops rows.
    fn enrich<'a>(&self, bars: &'a [Bar]) -> Result<EnrichedBars<'a>, IndicatorError>;

    /// Position to hold after bar `index` (always >= 1).
    fn signal(
        &self,
        enriched: &EnrichedBars<'_>,
        index: usize,
        current: Position,
    ) -> Result<Position, InvalidSignalError>;

    fn stop_loss(&self, _enriched: &EnrichedBars<'_>, _index: usize, _current: Position) -> bool {
        false
    }
}
