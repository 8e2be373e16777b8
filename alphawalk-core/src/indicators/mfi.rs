//! Money Flow Index (MFI).
//!
//! Typical price tp = (high + low + close) / 3, raw flow = tp * volume.
//! A bar's flow is positive when tp rises against the previous bar, negative
//! when it falls, and ignored when unchanged. Over the trailing `period` bars:
//! MFI = 100 * positive / (positive + negative).
//! Lookback: period (each bar in the window needs a previous bar).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
    name: String,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "MFI period must be >= 1");
        Self {
            period,
            name: format!("mfi_{period}"),
        }
    }

    /// MFI with `close` substituted for the bars' own closes (e.g. a filtered series).
    pub fn compute_with_close(&self, bars: &[Bar], close: &[f64]) -> Vec<f64> {
        let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        money_flow_index(&high, &low, close, &volume, self.period)
    }
}

/// MFI over parallel input series. A window with no money flow at all reads 50.
pub fn money_flow_index(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
    period: usize,
) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len()).min(volume.len());
    let mut result = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return result;
    }

    let tp: Vec<f64> = (0..n).map(|i| (high[i] + low[i] + close[i]) / 3.0).collect();
    // (positive, negative) flow per bar; index 0 carries none
    let flows: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            if i == 0 {
                return (0.0, 0.0);
            }
            let raw = tp[i] * volume[i];
            if tp[i] > tp[i - 1] {
                (raw, 0.0)
            } else if tp[i] < tp[i - 1] {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    for i in period..n {
        let window = &flows[i + 1 - period..=i];
        let positive: f64 = window.iter().map(|f| f.0).sum();
        let negative: f64 = window.iter().map(|f| f.1).sum();
        let total = positive + negative;
        result[i] = if total.is_nan() {
            f64::NAN
        } else if total == 0.0 {
            50.0
        } else {
            100.0 * positive / total
        };
    }
    result
}

impl Indicator for Mfi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
        self.compute_with_close(bars, &close)
    }
}
