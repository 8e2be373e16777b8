//! Simple Moving Average (SMA).
//!
//! Rolling mean over a window of `period` values.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::Bar;

/// Which bar field the average runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmaSource {
    Close,
    Volume,
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: SmaSource,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self::over(period, SmaSource::Close)
    }

    pub fn over(period: usize, source: SmaSource) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        let name = match source {
            SmaSource::Close => format!("sma_{period}"),
            SmaSource::Volume => format!("volume_sma_{period}"),
        };
        Self {
            period,
            source,
            name,
        }
    }
}

/// Rolling mean of `values`. A NaN anywhere in a window makes that output NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            nan_count += 1;
        } else {
            sum += v;
        }
        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= period && nan_count == 0 {
            result[i] = sum / period as f64;
        }
    }
    result
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let values: Vec<f64> = match self.source {
            SmaSource::Close => bars.iter().map(|b| b.close).collect(),
            SmaSource::Volume => bars.iter().map(|b| b.volume).collect(),
        };
        rolling_mean(&values, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_basic() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = Sma::new(3).compute(&bars);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_approx(out[3], 3.0, DEFAULT_EPSILON);
        assert_approx(out[4], 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_over_volume() {
        let mut bars = make_bars(&[10.0, 10.0, 10.0]);
        bars[0].volume = 100.0;
        bars[1].volume = 200.0;
        bars[2].volume = 600.0;
        let sma = Sma::over(2, SmaSource::Volume);
        assert_eq!(sma.name(), "volume_sma_2");
        let out = sma.compute(&bars);
        assert_approx(out[1], 150.0, DEFAULT_EPSILON);
        assert_approx(out[2], 400.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_mean_recovers_after_nan() {
        let out = rolling_mean(&[f64::NAN, 2.0, 4.0, 6.0], 2);
        assert!(out[1].is_nan());
        assert_approx(out[2], 3.0, DEFAULT_EPSILON);
        assert_approx(out[3], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn short_input_is_all_nan() {
        assert!(rolling_mean(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
    }
}
