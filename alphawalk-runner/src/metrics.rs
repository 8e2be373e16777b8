//! Performance evaluator — positions and prices in, metrics out.
//!
//! Accounting is in price points for one contract:
//! - bar PnL `g[i] = pos[i-1] * (price[i] - price[i-1])`
//! - the fee is charged once at every `i` where `pos[i] != pos[i-1]`
//! - the cumulative curve starts at 0 and adds `g[i] - fee[i]`
//!
//! Every helper below is a pure function of its slice inputs.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use alphawalk_core::domain::{Bar, Position, PositionSeries};

/// Fee per position change used when none is configured.
pub const DEFAULT_FEE: f64 = 0.3;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(
        "input lengths differ: {timestamps} timestamps, {positions} positions, {prices} prices"
    )]
    LengthMismatch {
        timestamps: usize,
        positions: usize,
        prices: usize,
    },

    #[error("fee must be a finite non-negative number, got {0}")]
    InvalidFee(f64),
}

/// Largest peak-to-trough fall of the cumulative curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    /// Non-negative depth in price points.
    pub value: f64,
    /// Index of the peak.
    pub start: usize,
    /// Index of the trough.
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub profit_after_fee: f64,
    pub total_fee: f64,
    pub fee_charges: usize,
    pub trading_days: usize,
    pub profit_per_day: f64,
    pub profit_per_year: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: Drawdown,
    pub hit_rate: f64,
    pub closed_positions: usize,
}

/// Contract the optimizer depends on: a pure function of its inputs.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        timestamps: &[NaiveDateTime],
        positions: &[Position],
        prices: &[f64],
    ) -> Result<Metrics, EvalError>;

    /// Evaluate against bar closes.
    fn evaluate_bars(&self, bars: &[Bar], positions: &PositionSeries) -> Result<Metrics, EvalError> {
        let timestamps: Vec<NaiveDateTime> = bars.iter().map(|b| b.timestamp).collect();
        let prices: Vec<f64> = bars.iter().map(|b| b.close).collect();
        self.evaluate(&timestamps, positions.as_slice(), &prices)
    }
}

/// Point-based evaluator with a flat fee per position change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEvaluator {
    fee: f64,
}

impl Default for PointEvaluator {
    fn default() -> Self {
        Self { fee: DEFAULT_FEE }
    }
}

impl PointEvaluator {
    pub fn new(fee: f64) -> Result<Self, EvalError> {
        if !fee.is_finite() || fee < 0.0 {
            return Err(EvalError::InvalidFee(fee));
        }
        Ok(Self { fee })
    }

    pub fn fee(&self) -> f64 {
        self.fee
    }
}

impl Evaluator for PointEvaluator {
    fn evaluate(
        &self,
        timestamps: &[NaiveDateTime],
        positions: &[Position],
        prices: &[f64],
    ) -> Result<Metrics, EvalError> {
        if timestamps.len() != positions.len() || positions.len() != prices.len() {
            return Err(EvalError::LengthMismatch {
                timestamps: timestamps.len(),
                positions: positions.len(),
                prices: prices.len(),
            });
        }
        if positions.is_empty() {
            return Ok(Metrics::default());
        }

        let gross = gross_pnl(positions, prices);
        let fees = fee_schedule(positions, self.fee);
        let net: Vec<f64> = gross.iter().zip(&fees).map(|(g, f)| g - f).collect();
        let curve = cumulative(&net);
        let daily = daily_totals(timestamps, &net);
        let closed = closed_position_pnls(positions, &gross, self.fee);

        let profit_after_fee = curve.last().copied().unwrap_or(0.0);
        let trading_days = daily.len();
        let profit_per_day = if trading_days == 0 {
            0.0
        } else {
            profit_after_fee / trading_days as f64
        };

        Ok(Metrics {
            profit_after_fee,
            total_fee: fees.iter().sum(),
            fee_charges: fee_charge_count(positions),
            trading_days,
            profit_per_day,
            profit_per_year: profit_per_day * TRADING_DAYS_PER_YEAR,
            sharpe_ratio: sharpe_ratio(&daily),
            max_drawdown: max_drawdown(&curve),
            hit_rate: hit_rate(&closed),
            closed_positions: closed.len(),
        })
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Gross PnL per bar; index 0 is always 0.
pub fn gross_pnl(positions: &[Position], prices: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; positions.len().min(prices.len())];
    for i in 1..out.len() {
        out[i] = positions[i - 1].sign() * (prices[i] - prices[i - 1]);
    }
    out
}

/// Fee charged at each bar.
pub fn fee_schedule(positions: &[Position], fee: f64) -> Vec<f64> {
    let mut out = vec![0.0; positions.len()];
    for i in 1..positions.len() {
        if positions[i] != positions[i - 1] {
            out[i] = fee;
        }
    }
    out
}

pub fn fee_charge_count(positions: &[Position]) -> usize {
    positions.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Running sum; the first element is the first input.
pub fn cumulative(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Net PnL summed per calendar date, in date order.
pub fn daily_totals(timestamps: &[NaiveDateTime], net: &[f64]) -> Vec<f64> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (ts, v) in timestamps.iter().zip(net) {
        *by_day.entry(ts.date()).or_insert(0.0) += v;
    }
    by_day.into_values().collect()
}

/// Annualized Sharpe of daily PnL: mean / sample std * sqrt(252).
///
/// Returns 0.0 with fewer than 2 days or zero variance.
pub fn sharpe_ratio(daily: &[f64]) -> f64 {
    if daily.len() < 2 {
        return 0.0;
    }
    let std = std_dev(daily);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(daily) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn max_drawdown(curve: &[f64]) -> Drawdown {
    let mut worst = Drawdown::default();
    let mut peak = 0.0_f64;
    let mut peak_index = 0usize;
    for (i, &v) in curve.iter().enumerate() {
        if i == 0 || v > peak {
            peak = v;
            peak_index = i;
        }
        let depth = peak - v;
        if depth > worst.value {
            worst = Drawdown {
                value: depth,
                start: peak_index,
                end: i,
            };
        }
    }
    worst
}

/// Net PnL of every closed position, charged one fee each.
///
/// A position is a maximal run of identical non-flat values; it closes at
/// the first bar holding something else. A run still open at the last bar
/// is not counted.
pub fn closed_position_pnls(positions: &[Position], gross: &[f64], fee: f64) -> Vec<f64> {
    let mut closed = Vec::new();
    let mut open_pnl = 0.0;
    for i in 1..positions.len() {
        let held = positions[i - 1];
        if !held.is_flat() {
            open_pnl += gross[i];
            if positions[i] != held {
                closed.push(open_pnl - fee);
                open_pnl = 0.0;
            }
        }
    }
    closed
}

/// Fraction of closed positions with positive net PnL.
pub fn hit_rate(closed: &[f64]) -> f64 {
    if closed.is_empty() {
        return 0.0;
    }
    closed.iter().filter(|&&p| p > 0.0).count() as f64 / closed.len() as f64
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). Returns 0.0 for fewer than 2 values.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Population standard deviation (n). Returns 0.0 for an empty slice.
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use Position::*;

    fn minutes(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        (0..n).map(|i| start + Duration::minutes(i as i64)).collect()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn long_then_flat_round_trip() {
        let prices = [100.0, 101.0, 103.0, 102.0];
        let positions = [Flat, Long, Long, Flat];
        let m = PointEvaluator::new(0.3)
            .unwrap()
            .evaluate(&minutes(4), &positions, &prices)
            .unwrap();
        // gross: 0, 0, +2, -1 ; two changes cost 0.6
        assert_close(m.profit_after_fee, 0.4);
        assert_close(m.total_fee, 0.6);
        assert_eq!(m.fee_charges, 2);
        assert_eq!(m.trading_days, 1);
        assert_close(m.profit_per_day, 0.4);
        assert_close(m.profit_per_year, 0.4 * 252.0);
        assert_eq!(m.closed_positions, 1);
        assert_close(m.hit_rate, 1.0);
    }

    #[test]
    fn short_profits_from_falling_prices() {
        let prices = [50.0, 50.0, 48.0, 47.0];
        let positions = [Flat, Short, Short, Short];
        let m = PointEvaluator::new(0.0)
            .unwrap()
            .evaluate(&minutes(4), &positions, &prices)
            .unwrap();
        assert_close(m.profit_after_fee, 3.0);
        // still open at the end
        assert_eq!(m.closed_positions, 0);
        assert_eq!(m.hit_rate, 0.0);
    }

    #[test]
    fn flip_closes_one_position_and_opens_another() {
        let positions = [Flat, Long, Short, Flat];
        let prices = [10.0, 10.0, 12.0, 11.0];
        let gross = gross_pnl(&positions, &prices);
        assert_eq!(gross, vec![0.0, 0.0, 2.0, 1.0]);
        let closed = closed_position_pnls(&positions, &gross, 0.5);
        assert_eq!(closed, vec![1.5, 0.5]);
        assert_eq!(fee_charge_count(&positions), 3);
    }

    #[test]
    fn drawdown_tracks_peak_and_trough() {
        let curve = [0.0, 2.0, 5.0, 1.0, 3.0, 0.5, 6.0];
        let dd = max_drawdown(&curve);
        assert_close(dd.value, 4.5);
        assert_eq!((dd.start, dd.end), (2, 5));
        assert_eq!(max_drawdown(&[0.0, 1.0, 2.0]), Drawdown::default());
    }

    #[test]
    fn drawdown_from_start_when_losing_immediately() {
        let dd = max_drawdown(&[0.0, -1.0, -3.0]);
        assert_close(dd.value, 3.0);
        assert_eq!((dd.start, dd.end), (0, 2));
    }

    #[test]
    fn daily_totals_group_by_date() {
        let day1 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let day2 = day1.succ_opt().unwrap();
        let ts = [
            day1.and_hms_opt(9, 0, 0).unwrap(),
            day1.and_hms_opt(9, 1, 0).unwrap(),
            day2.and_hms_opt(9, 0, 0).unwrap(),
        ];
        assert_eq!(daily_totals(&ts, &[1.0, 2.0, -0.5]), vec![3.0, -0.5]);
    }

    #[test]
    fn sharpe_uses_sample_std() {
        let daily = [1.0, 2.0, 3.0];
        // mean 2, sample std 1
        assert_close(sharpe_ratio(&daily), 2.0 * 252f64.sqrt());
        assert_eq!(sharpe_ratio(&[1.0]), 0.0);
        assert_eq!(sharpe_ratio(&[2.0, 2.0]), 0.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = PointEvaluator::default()
            .evaluate(&minutes(3), &[Flat, Flat], &[1.0, 2.0, 3.0])
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::LengthMismatch {
                timestamps: 3,
                positions: 2,
                prices: 3
            }
        );
    }

    #[test]
    fn empty_input_is_zeroed() {
        let m = PointEvaluator::default().evaluate(&[], &[], &[]).unwrap();
        assert_eq!(m, Metrics::default());
    }

    #[test]
    fn negative_fee_is_rejected() {
        assert_eq!(PointEvaluator::new(-0.1), Err(EvalError::InvalidFee(-0.1)));
        assert_eq!(PointEvaluator::default().fee(), DEFAULT_FEE);
    }

    #[test]
    fn std_helpers() {
        assert_close(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.138089935299395);
        assert_close(population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(std_dev(&[1.0]), 0.0);
    }

    fn position() -> impl Strategy<Value = Position> {
        prop_oneof![Just(Short), Just(Flat), Just(Long)]
    }

    proptest! {
        #[test]
        fn net_profit_is_gross_minus_fees(
            rows in prop::collection::vec((position(), 1.0f64..500.0), 1..120),
            fee in 0.0f64..2.0,
        ) {
            let (positions, prices): (Vec<Position>, Vec<f64>) = rows.into_iter().unzip();
            let m = PointEvaluator::new(fee)
                .unwrap()
                .evaluate(&minutes(positions.len()), &positions, &prices)
                .unwrap();
            let gross: f64 = gross_pnl(&positions, &prices).iter().sum();
            prop_assert_eq!(m.fee_charges, fee_charge_count(&positions));
            prop_assert!((m.total_fee - fee * m.fee_charges as f64).abs() < 1e-6);
            prop_assert!((m.profit_after_fee - (gross - m.total_fee)).abs() < 1e-6);
            prop_assert!(m.max_drawdown.value >= 0.0);
            prop_assert!((0.0..=1.0).contains(&m.hit_rate));
        }
    }
}
