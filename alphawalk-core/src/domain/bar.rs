//! Bar — one intraday OHLCV record.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// OHLCV bar at minute granularity. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Calendar date of the bar's session.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Wall-clock time of the bar.
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Positive prices, non-negative volume, high/low bracket open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.open > 0.0
            && self.close > 0.0
            && self.low > 0.0
            && self.volume >= 0.0
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
