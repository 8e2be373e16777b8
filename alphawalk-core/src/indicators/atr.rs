//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR applies Wilder smoothing (alpha = 1/period) to TR[1..]; TR[0] has no
//! previous close and is excluded, so the lookback is `period`.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True Range series. TR[0] = high[0] - low[0].
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let span = bar.high - bar.low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                None => span,
                Some(pc) => span.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
            }
        })
        .collect()
}

/// Wilder smoothing. Leading NaNs are skipped; the seed is the mean of the
/// first `period` values after them. A later NaN poisons the rest.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }

    let start = match values.iter().position(|v| !v.is_nan()) {
        Some(s) => s,
        None => return result,
    };
    let seed_end = start + period;
    if seed_end > n || values[start..seed_end].iter().any(|v| v.is_nan()) {
        return result;
    }

    let mut prev = values[start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    let alpha = 1.0 / period as f64;
    for i in seed_end..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut tr = true_range(bars);
        if let Some(first) = tr.first_mut() {
            *first = f64::NAN;
        }
        wilder_smooth(&tr, self.period)
    }
}
