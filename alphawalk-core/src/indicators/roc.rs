//! Rate of Change (ROC).
//!
//! ROC[t] = (close[t] - close[t-period]) / close[t-period] * 100
//! Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self {
            period,
            name: format!("roc_{period}"),
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let prev = bars[i - self.period].close;
            let curr = bars[i].close;
            if !prev.is_nan() && !curr.is_nan() && prev != 0.0 {
                result[i] = (curr - prev) / prev * 100.0;
            }
        }

        result
    }
}
