//! Single-split parameter search: optimize on train, confirm on test.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use alphawalk_core::domain::{Bar, BarSeries};
use alphawalk_core::params::ParamSet;
use alphawalk_core::rng::RngHierarchy;

use crate::config::SearchSettings;
use crate::metrics::Metrics;
use crate::runner::{Backtester, RunError};
use crate::search::{RandomSampler, SearchError, Study, TrialRecord};
use crate::split::SplitMethod;

#[derive(Debug, Error)]
pub enum TuneError {
    #[error("split leaves no {0} bars")]
    EmptySplit(&'static str),

    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error("best parameters failed on {part} data: {source}")]
    Rerun {
        part: &'static str,
        #[source]
        source: RunError,
    },
}

/// Result of one train/test search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub strategy: String,
    pub best_params: ParamSet,
    pub train_values: Vec<f64>,
    pub test_values: Vec<f64>,
    pub train_metrics: Metrics,
    pub test_metrics: Metrics,
    pub trials: Vec<TrialRecord>,
}

/// Run one study over `bars` with the given sampler.
///
/// Every trial builds its own strategy, so trials may run in parallel.
pub fn run_study(
    backtester: &Backtester<'_>,
    bars: &[Bar],
    settings: &SearchSettings,
    sampler: RandomSampler,
) -> Result<Study<RandomSampler>, SearchError> {
    let mut study = Study::new(settings.space.clone(), settings.directions.clone(), sampler)
        .with_failure_policy(settings.failure_policy)
        .with_parallelism(settings.parallel);
    study.optimize(
        |params| backtester.objective(params, bars, &settings.targets),
        settings.n_trials,
    )?;
    Ok(study)
}

pub struct ParamSearch<'a> {
    backtester: Backtester<'a>,
    settings: &'a SearchSettings,
}

impl<'a> ParamSearch<'a> {
    pub fn new(backtester: Backtester<'a>, settings: &'a SearchSettings) -> Self {
        Self {
            backtester,
            settings,
        }
    }

    pub fn run(&self, series: &BarSeries, split: &SplitMethod) -> Result<SearchOutcome, TuneError> {
        let (train, test) = split.split(series);
        let train = train.ok_or(TuneError::EmptySplit("train"))?;
        let test = test.ok_or(TuneError::EmptySplit("test"))?;
        info!(
            train_bars = train.len(),
            test_bars = test.len(),
            n_trials = self.settings.n_trials,
            "starting train/test search"
        );

        let sampler =
            RandomSampler::from_rng(RngHierarchy::new(self.settings.seed).rng_for("split", 0));
        let study = run_study(&self.backtester, train, self.settings, sampler)?;
        let best = study.best()?;

        let rerun = |bars: &[Bar], part| {
            self.backtester
                .run(&best.params, bars)
                .map_err(|source| TuneError::Rerun { part, source })
        };
        let train_run = rerun(train, "train")?;
        let test_metrics = rerun(test, "test")?.metrics;
        let test_values = self
            .settings
            .targets
            .iter()
            .map(|t| t.extract(&test_metrics))
            .collect();

        Ok(SearchOutcome {
            strategy: train_run.strategy,
            best_params: best.params.clone(),
            train_values: best.values.clone(),
            test_values,
            train_metrics: train_run.metrics,
            test_metrics,
            trials: study.trials().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PointEvaluator;
    use crate::search::{Direction, FailurePolicy, StudyDirections};
    use crate::target::TargetMetric;
    use alphawalk_core::domain::ExpirationCalendar;
    use alphawalk_core::params::{ParamRange, ParameterSpec};
    use alphawalk_core::simulator::{SessionRules, Simulator};
    use alphawalk_core::strategies::NamedStrategy;
    use chrono::{Duration, NaiveDate};

    fn series(n: usize) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 50.0 + (i as f64 * 0.21).sin() * 2.0 + (i as f64 * 0.05).cos();
                Bar {
                    timestamp: start + Duration::minutes(i as i64),
                    open: close,
                    high: close + 0.3,
                    low: close - 0.3,
                    close,
                    volume: 500.0 + (i % 11) as f64 * 40.0,
                }
            })
            .collect();
        BarSeries::new(bars).unwrap()
    }

    fn settings(n_trials: usize) -> SearchSettings {
        SearchSettings {
            space: ParameterSpec::new()
                .with("mfi_period", ParamRange::Int { low: 5, high: 20 })
                .with("lowpass_filter_ratio", ParamRange::Float { low: 0.2, high: 0.9 }),
            targets: vec![TargetMetric::ProfitAfterFee],
            directions: StudyDirections::Single(Direction::Maximize),
            n_trials,
            seed: 17,
            parallel: true,
            failure_policy: FailurePolicy::WorstScore,
        }
    }

    #[test]
    fn best_params_are_re_evaluated_on_both_sides() {
        let calendar = ExpirationCalendar::new();
        let factory = NamedStrategy::new("mfi_reversal").unwrap();
        let evaluator = PointEvaluator::default();
        let bt = Backtester::new(
            &factory,
            Simulator::new(SessionRules::default(), &calendar),
            &evaluator,
        );
        let data = series(600);
        let split = SplitMethod::Sequence {
            split_at: data.bars()[400].timestamp,
        };
        let settings = settings(12);
        let outcome = ParamSearch::new(bt, &settings).run(&data, &split).unwrap();

        assert_eq!(outcome.trials.len(), 12);
        assert_eq!(outcome.strategy, "mfi_reversal");
        assert_eq!(outcome.train_values, vec![outcome.train_metrics.profit_after_fee]);
        assert_eq!(outcome.test_values, vec![outcome.test_metrics.profit_after_fee]);
        assert!(outcome
            .trials
            .iter()
            .all(|t| t.values[0] <= outcome.train_values[0]));

        let again = ParamSearch::new(bt, &settings).run(&data, &split).unwrap();
        assert_eq!(outcome, again);
    }

    #[test]
    fn empty_side_is_an_error() {
        let calendar = ExpirationCalendar::new();
        let factory = NamedStrategy::new("mfi_reversal").unwrap();
        let evaluator = PointEvaluator::default();
        let bt = Backtester::new(
            &factory,
            Simulator::new(SessionRules::default(), &calendar),
            &evaluator,
        );
        let data = series(50);
        let split = SplitMethod::Sequence {
            split_at: data.last_timestamp() + Duration::minutes(1),
        };
        let settings = settings(2);
        assert!(matches!(
            ParamSearch::new(bt, &settings).run(&data, &split),
            Err(TuneError::EmptySplit("test"))
        ));
    }
}
