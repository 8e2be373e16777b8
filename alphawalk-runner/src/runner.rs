//! Backtest runner — strategy factory, simulator and evaluator wired together.
//!
//! One `Backtester` is shared read-only by every trial of a search; each call
//! builds its own strategy instance, so trials never share mutable state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use alphawalk_core::domain::{Bar, PositionSeries};
use alphawalk_core::params::ParamSet;
use alphawalk_core::simulator::{ForcedExit, Simulator};
use alphawalk_core::strategies::{FactoryError, StrategyFactory};
use alphawalk_core::SimulationError;

use crate::metrics::{EvalError, Evaluator, Metrics};
use crate::target::TargetMetric;

/// Why one backtest run could not produce metrics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("strategy construction failed: {0}")]
    Strategy(#[from] FactoryError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub params: ParamSet,
    pub bar_count: usize,
    pub positions: PositionSeries,
    pub forced_exits: Vec<ForcedExit>,
    pub metrics: Metrics,
}

#[derive(Clone, Copy)]
pub struct Backtester<'a> {
    factory: &'a dyn StrategyFactory,
    simulator: Simulator<'a>,
    evaluator: &'a dyn Evaluator,
}

impl<'a> Backtester<'a> {
    pub fn new(
        factory: &'a dyn StrategyFactory,
        simulator: Simulator<'a>,
        evaluator: &'a dyn Evaluator,
    ) -> Self {
        Self {
            factory,
            simulator,
            evaluator,
        }
    }

    pub fn simulator(&self) -> &Simulator<'a> {
        &self.simulator
    }

    /// Build the strategy for `params`, simulate it over `bars`, evaluate.
    pub fn run(&self, params: &ParamSet, bars: &[Bar]) -> Result<BacktestResult, RunError> {
        let strategy = self.factory.build(params)?;
        let simulation = self.simulator.simulate(strategy.as_ref(), bars)?;
        let metrics = self.evaluator.evaluate_bars(bars, &simulation.positions)?;
        Ok(BacktestResult {
            strategy: strategy.name().to_string(),
            params: params.clone(),
            bar_count: bars.len(),
            positions: simulation.positions,
            forced_exits: simulation.forced_exits,
            metrics,
        })
    }

    pub fn metrics(&self, params: &ParamSet, bars: &[Bar]) -> Result<Metrics, RunError> {
        self.run(params, bars).map(|r| r.metrics)
    }

    /// Objective vector for a search: one value per target, in order.
    pub fn objective(
        &self,
        params: &ParamSet,
        bars: &[Bar],
        targets: &[TargetMetric],
    ) -> Result<Vec<f64>, RunError> {
        let metrics = self.metrics(params, bars)?;
        Ok(targets.iter().map(|t| t.extract(&metrics)).collect())
    }
}
