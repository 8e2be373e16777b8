//! Walk-forward optimization — rolling train search, out-of-sample test.
//!
//! Windows start at the first bar and advance by the test length while
//! `start + train + test <= last timestamp`. Each window searches parameters
//! on `[start, start + train)` and scores the winner on the following
//! `[start + train, start + train + test)`. Train windows overlap whenever
//! the train length exceeds the test length.
//!
//! Every window is sliced before any search starts, so an empty slice is a
//! configuration error raised up front. A window whose search or test run
//! fails aborts the whole optimization; windows are never skipped.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use alphawalk_core::domain::{Bar, BarSeries};
use alphawalk_core::params::{ParamSet, ParameterSpec};
use alphawalk_core::rng::RngHierarchy;

use crate::config::{ConfigError, SearchSettings};
use crate::metrics::{mean_f64, population_std, std_dev, Metrics};
use crate::runner::{Backtester, RunError};
use crate::search::{FailurePolicy, RandomSampler, SearchError, StudyDirections};
use crate::target::TargetMetric;
use crate::tune::run_study;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardConfig {
    pub train_window: Duration,
    pub test_window: Duration,
    /// Trials per window.
    pub n_trials: usize,
    /// Master seed; window `k` samples from the `("window", k)` sub-stream.
    pub seed: u64,
    pub parallel_trials: bool,
    pub parallel_windows: bool,
    pub failure_policy: FailurePolicy,
}

impl WalkForwardConfig {
    pub fn new(
        train_window: Duration,
        test_window: Duration,
        n_trials: usize,
    ) -> Result<Self, ConfigError> {
        if train_window <= Duration::zero() {
            return Err(ConfigError::NonPositiveWindow {
                name: "train_window",
            });
        }
        if test_window <= Duration::zero() {
            return Err(ConfigError::NonPositiveWindow {
                name: "test_window",
            });
        }
        if n_trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        Ok(Self {
            train_window,
            test_window,
            n_trials,
            seed: 0,
            parallel_trials: true,
            parallel_windows: false,
            failure_policy: FailurePolicy::default(),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel_trials(mut self, parallel: bool) -> Self {
        self.parallel_trials = parallel;
        self
    }

    pub fn with_parallel_windows(mut self, parallel: bool) -> Self {
        self.parallel_windows = parallel;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

// ─── Windows ─────────────────────────────────────────────────────────

/// Half-open train and test ranges of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub train_start: NaiveDateTime,
    pub train_end: NaiveDateTime,
    pub test_start: NaiveDateTime,
    pub test_end: NaiveDateTime,
}

/// All windows between `first` and `last`, in start order.
pub fn plan_windows(
    first: NaiveDateTime,
    last: NaiveDateTime,
    train: Duration,
    test: Duration,
) -> Vec<Window> {
    if train <= Duration::zero() || test <= Duration::zero() {
        return Vec::new();
    }
    let mut windows = Vec::new();
    let mut current = first;
    // Bounds past the calendar range end the plan.
    while let Some((train_end, test_end)) = current
        .checked_add_signed(train)
        .and_then(|train_end| Some((train_end, train_end.checked_add_signed(test)?)))
    {
        if test_end > last {
            break;
        }
        windows.push(Window {
            train_start: current,
            train_end,
            test_start: train_end,
            test_end,
        });
        match current.checked_add_signed(test) {
            Some(next) => current = next,
            None => break,
        }
    }
    windows
}

// ─── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub index: usize,
    pub window: Window,
    pub best_params: ParamSet,
    /// First target on the train slice.
    pub train_score: f64,
    pub train_values: Vec<f64>,
    /// First target on the test slice.
    pub test_score: f64,
    pub test_values: Vec<f64>,
    pub test_metrics: Metrics,
    pub trials: usize,
    pub failed_trials: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub mean: f64,
    /// Sample standard deviation; 0 with a single window.
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub windows: Vec<WindowResult>,
    pub parameter_stability: BTreeMap<String, ParamStats>,
    pub performance_stability: BTreeMap<String, PerformanceStats>,
}

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("window {index}: search failed: {source}")]
    Search {
        index: usize,
        #[source]
        source: SearchError,
    },

    #[error("window {index}: test evaluation failed: {source}")]
    Test {
        index: usize,
        #[source]
        source: RunError,
    },
}

// ─── Optimizer ───────────────────────────────────────────────────────

pub struct WalkForwardOptimizer<'a> {
    backtester: Backtester<'a>,
    settings: SearchSettings,
    config: WalkForwardConfig,
}

impl<'a> WalkForwardOptimizer<'a> {
    pub fn new(
        backtester: Backtester<'a>,
        space: ParameterSpec,
        targets: Vec<TargetMetric>,
        directions: StudyDirections,
        config: WalkForwardConfig,
    ) -> Self {
        let settings = SearchSettings {
            space,
            targets,
            directions,
            n_trials: config.n_trials,
            seed: config.seed,
            parallel: config.parallel_trials,
            failure_policy: config.failure_policy,
        };
        Self {
            backtester,
            settings,
            config,
        }
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    pub fn run(&self, series: &BarSeries) -> Result<WalkForwardReport, WalkForwardError> {
        let windows = plan_windows(
            series.first_timestamp(),
            series.last_timestamp(),
            self.config.train_window,
            self.config.test_window,
        );
        if windows.is_empty() {
            return Err(ConfigError::NoWindows {
                first: series.first_timestamp(),
                last: series.last_timestamp(),
                train_window: self.config.train_window,
                test_window: self.config.test_window,
            }
            .into());
        }

        let sliced = windows
            .iter()
            .enumerate()
            .map(|(index, w)| {
                let train = slice(series, index, "train", w.train_start, w.train_end)?;
                let test = slice(series, index, "test", w.test_start, w.test_end)?;
                Ok::<_, ConfigError>((index, *w, train, test))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        info!(
            windows = sliced.len(),
            n_trials = self.config.n_trials,
            parallel_windows = self.config.parallel_windows,
            "starting walk-forward optimization"
        );

        let results = if self.config.parallel_windows {
            sliced
                .par_iter()
                .map(|(index, w, train, test)| self.evaluate_window(*index, *w, train, test))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            sliced
                .iter()
                .map(|(index, w, train, test)| self.evaluate_window(*index, *w, train, test))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(aggregate(&self.settings.space, results))
    }

    fn evaluate_window(
        &self,
        index: usize,
        window: Window,
        train: &[Bar],
        test: &[Bar],
    ) -> Result<WindowResult, WalkForwardError> {
        info!(
            window = index,
            train_start = %window.train_start,
            test_start = %window.test_start,
            test_end = %window.test_end,
            "optimizing window"
        );
        let sampler = RandomSampler::from_rng(
            RngHierarchy::new(self.config.seed).rng_for("window", index as u64),
        );
        let search_err = |source| WalkForwardError::Search { index, source };
        let study =
            run_study(&self.backtester, train, &self.settings, sampler).map_err(search_err)?;
        let best = study.best().map_err(search_err)?;

        let test_metrics = self
            .backtester
            .metrics(&best.params, test)
            .map_err(|source| WalkForwardError::Test { index, source })?;
        let test_values: Vec<f64> = self
            .settings
            .targets
            .iter()
            .map(|t| t.extract(&test_metrics))
            .collect();

        let result = WindowResult {
            index,
            window,
            best_params: best.params.clone(),
            train_score: best.value(),
            train_values: best.values.clone(),
            test_score: test_values.first().copied().unwrap_or(f64::NAN),
            test_values,
            test_metrics,
            trials: study.trials().len(),
            failed_trials: study.trials().iter().filter(|t| !t.is_complete()).count(),
        };
        info!(
            window = index,
            train_score = result.train_score,
            test_score = result.test_score,
            best_params = %result.best_params,
            "window finished"
        );
        Ok(result)
    }
}

fn slice<'s>(
    series: &'s BarSeries,
    index: usize,
    part: &'static str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<&'s [Bar], ConfigError> {
    series.between(start, end).ok_or(ConfigError::EmptyWindow {
        index,
        part,
        start,
        end,
    })
}

// ─── Aggregation ─────────────────────────────────────────────────────

/// Stability statistics across windows.
///
/// Parameters: numeric ranges of `space` only. Performance: train and test
/// score plus the headline test metrics.
pub fn aggregate(space: &ParameterSpec, windows: Vec<WindowResult>) -> WalkForwardReport {
    let parameter_stability = space
        .numeric_names()
        .into_iter()
        .filter_map(|name| {
            let values: Vec<f64> = windows
                .iter()
                .filter_map(|w| w.best_params.get(name).and_then(|v| v.as_f64()))
                .collect();
            if values.is_empty() {
                return None;
            }
            let stats = ParamStats {
                mean: mean_f64(&values),
                std: population_std(&values),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            Some((name.to_string(), stats))
        })
        .collect();

    let columns: [(&str, fn(&WindowResult) -> f64); 7] = [
        ("train_score", |w| w.train_score),
        ("test_score", |w| w.test_score),
        ("profit_after_fee", |w| w.test_metrics.profit_after_fee),
        ("profit_per_day", |w| w.test_metrics.profit_per_day),
        ("sharpe_ratio", |w| w.test_metrics.sharpe_ratio),
        ("max_drawdown", |w| w.test_metrics.max_drawdown.value),
        ("hit_rate", |w| w.test_metrics.hit_rate),
    ];
    let performance_stability = columns
        .iter()
        .map(|(name, column)| {
            let values: Vec<f64> = windows.iter().map(column).collect();
            let stats = PerformanceStats {
                mean: mean_f64(&values),
                std: std_dev(&values),
            };
            (name.to_string(), stats)
        })
        .collect();

    WalkForwardReport {
        windows,
        parameter_stability,
        performance_stability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphawalk_core::params::{ParamRange, ParamValue};
    use chrono::NaiveDate;

    fn day(d: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(d)
    }

    #[test]
    fn thirty_days_ten_by_five_gives_three_windows() {
        // Daily bars on days 0..=29.
        let w = plan_windows(day(0), day(29), Duration::days(10), Duration::days(5));
        let test_starts: Vec<_> = w.iter().map(|w| w.test_start).collect();
        assert_eq!(test_starts, vec![day(10), day(15), day(20)]);
        assert_eq!(w.last().unwrap().test_end, day(25));
    }

    #[test]
    fn exact_fit_is_included() {
        let w = plan_windows(day(0), day(15), Duration::days(10), Duration::days(5));
        assert_eq!(w.len(), 1);
        assert!(plan_windows(day(0), day(14), Duration::days(10), Duration::days(5)).is_empty());
    }

    #[test]
    fn test_windows_are_contiguous_and_train_windows_overlap() {
        let w = plan_windows(day(0), day(100), Duration::days(20), Duration::days(7));
        for pair in w.windows(2) {
            assert_eq!(pair[1].test_start, pair[0].test_end);
            assert!(pair[1].train_start < pair[0].train_end);
        }
        for win in &w {
            assert_eq!(win.train_end, win.test_start);
        }
    }

    #[test]
    fn windows_past_the_calendar_range_plan_nothing() {
        let w = plan_windows(day(0), day(30), Duration::days(1_000_000_000), Duration::days(5));
        assert!(w.is_empty());
        let w = plan_windows(day(0), day(30), Duration::days(10), Duration::days(1_000_000_000));
        assert!(w.is_empty());
    }

    #[test]
    fn non_positive_lengths_plan_nothing() {
        assert!(plan_windows(day(0), day(30), Duration::zero(), Duration::days(5)).is_empty());
        assert!(matches!(
            WalkForwardConfig::new(Duration::days(5), Duration::days(-1), 3),
            Err(ConfigError::NonPositiveWindow { name: "test_window" })
        ));
        assert!(matches!(
            WalkForwardConfig::new(Duration::days(5), Duration::days(1), 0),
            Err(ConfigError::ZeroTrials)
        ));
    }

    fn result(index: usize, period: i64, train: f64, test: f64) -> WindowResult {
        WindowResult {
            index,
            window: Window {
                train_start: day(0),
                train_end: day(1),
                test_start: day(1),
                test_end: day(2),
            },
            best_params: ParamSet::new()
                .with("mfi_period", ParamValue::Int(period))
                .with("lowpass_filter_ratio", ParamValue::Float(0.75)),
            train_score: train,
            train_values: vec![train],
            test_score: test,
            test_values: vec![test],
            test_metrics: Metrics {
                profit_after_fee: test,
                ..Default::default()
            },
            trials: 4,
            failed_trials: 0,
        }
    }

    #[test]
    fn aggregation_uses_population_std_for_params_and_sample_std_for_scores() {
        let space = ParameterSpec::new()
            .with("mfi_period", ParamRange::Int { low: 5, high: 30 })
            .with(
                "lowpass_filter_ratio",
                ParamRange::Fixed {
                    value: ParamValue::Float(0.75),
                },
            );
        let report = aggregate(
            &space,
            vec![result(0, 10, 1.0, 2.0), result(1, 20, 3.0, 4.0)],
        );

        let p = report.parameter_stability["mfi_period"];
        assert_eq!(p.mean, 15.0);
        assert_eq!(p.std, 5.0);
        assert_eq!((p.min, p.max), (10.0, 20.0));
        assert!(!report.parameter_stability.contains_key("lowpass_filter_ratio"));

        let t = report.performance_stability["test_score"];
        assert_eq!(t.mean, 3.0);
        assert!((t.std - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(report.performance_stability.len(), 7);
        assert_eq!(report.windows.len(), 2);
    }
}
