//! AlphaWalk Runner — evaluation, parameter search and walk-forward optimization.
//!
//! This crate builds on `alphawalk-core` to provide:
//! - The point-based performance evaluator and target metrics
//! - A seeded search engine (sampler, study, failure policy)
//! - Train/test split search and the walk-forward optimizer with stability stats
//! - TOML experiment configuration
//! - CSV loading for bars and expiration dates, JSON/CSV export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod search;
pub mod split;
pub mod target;
pub mod tune;
pub mod walk_forward;

pub use config::{ConfigError, Experiment, ExperimentConfig, SearchSettings};
pub use data_loader::{load_bars, load_expirations, LoadError, LoadedBars};
pub use metrics::{Drawdown, EvalError, Evaluator, Metrics, PointEvaluator, DEFAULT_FEE};
pub use runner::{BacktestResult, Backtester, RunError};
pub use search::{
    Direction, DirectionSpec, FailurePolicy, RandomSampler, Sampler, SearchError, Study,
    StudyDirections, TrialRecord,
};
pub use split::SplitMethod;
pub use target::TargetMetric;
pub use tune::{ParamSearch, SearchOutcome, TuneError};
pub use walk_forward::{
    plan_windows, WalkForwardConfig, WalkForwardError, WalkForwardOptimizer, WalkForwardReport,
    Window, WindowResult,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn evaluator_types_are_send_sync() {
        assert_send::<Metrics>();
        assert_sync::<Metrics>();
        assert_send::<PointEvaluator>();
        assert_sync::<PointEvaluator>();
        assert_sync::<Box<dyn Evaluator>>();
    }

    #[test]
    fn backtester_is_shareable_across_trials() {
        assert_send::<Backtester<'static>>();
        assert_sync::<Backtester<'static>>();
        assert_send::<RunError>();
    }

    #[test]
    fn search_types_are_send_sync() {
        assert_send::<Study<RandomSampler>>();
        assert_send::<TrialRecord>();
        assert_sync::<TrialRecord>();
        assert_send::<SearchError>();
    }

    #[test]
    fn walk_forward_types_are_send_sync() {
        assert_send::<WalkForwardConfig>();
        assert_sync::<WalkForwardConfig>();
        assert_send::<WindowResult>();
        assert_sync::<WindowResult>();
        assert_send::<WalkForwardReport>();
        assert_send::<WalkForwardError>();
        assert_sync::<WalkForwardOptimizer<'static>>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ExperimentConfig>();
        assert_sync::<ExperimentConfig>();
        assert_send::<Experiment>();
        assert_send::<ConfigError>();
    }
}
