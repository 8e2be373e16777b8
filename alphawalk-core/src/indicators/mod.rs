//! Indicator implementations.
//!
//! Indicators are pure functions of bar history: a full series in, a numeric
//! series of the same length out, with `f64::NAN` during warmup. Strategies
//! compute them once in `enrich` and read them per bar in `signal`.
//!
//! Each indicator also exposes a free function over plain `&[f64]` inputs so
//! strategies can feed derived series (filtered closes, volume) through it.

pub mod atr;
pub mod lowpass;
pub mod mfi;
pub mod roc;
pub mod sma;

pub use atr::Atr;
pub use mfi::Mfi;
pub use roc::Roc;
pub use sma::Sma;

use crate::domain::Bar;

/// A named, bar-driven indicator.
///
/// No value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Column name, e.g. "sma_20".
    fn name(&self) -> &str;

    /// Number of leading NaN values in the output.
    fn lookback(&self) -> usize;

    /// Output has the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Synthetic minute bars from closes for tests.
///
/// open = prev close, high/low = max/min(open, close) ± 1, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
