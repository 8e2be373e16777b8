//! Study — trial bookkeeping around a sampler.
//!
//! `ask` draws a parameter assignment, `tell` records its objective values,
//! and `best` reports the winning trial under the study's direction(s).
//! `optimize` drives a fixed trial budget through that loop, optionally
//! evaluating a whole batch of pre-drawn trials in parallel.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use alphawalk_core::params::{ParamSet, ParameterSpec};

use super::direction::{Direction, StudyDirections};
use super::sampler::Sampler;

/// What happens when a trial's objective fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the worst possible score and keep searching.
    #[default]
    WorstScore,
    /// Stop the search at the first failure.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub id: usize,
    pub params: ParamSet,
    pub values: Vec<f64>,
    pub state: TrialState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrialRecord {
    pub fn is_complete(&self) -> bool {
        self.state == TrialState::Complete
    }

    /// First objective value.
    pub fn value(&self) -> f64 {
        self.values.first().copied().unwrap_or(f64::NAN)
    }
}

/// A drawn but not yet reported trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub id: usize,
    pub params: ParamSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Complete(Vec<f64>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("trial {id} failed with params {params}: {message}")]
    TrialFailed {
        id: usize,
        params: ParamSet,
        message: String,
    },

    #[error("no trial completed successfully out of {trials}")]
    NoSuccessfulTrial { trials: usize },

    #[error("objective returned {got} values, study expects {expected}")]
    ObjectiveArity { expected: usize, got: usize },

    #[error("trial {0} is not pending")]
    UnknownTrial(usize),

    #[error("trial budget must be positive")]
    ZeroTrials,
}

pub struct Study<S: Sampler> {
    space: ParameterSpec,
    directions: StudyDirections,
    sampler: S,
    policy: FailurePolicy,
    parallel: bool,
    next_id: usize,
    pending: BTreeMap<usize, ParamSet>,
    trials: Vec<TrialRecord>,
}

impl<S: Sampler> fmt::Debug for Study<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Study")
            .field("space", &self.space)
            .field("directions", &self.directions)
            .field("policy", &self.policy)
            .field("parallel", &self.parallel)
            .field("trials", &self.trials.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<S: Sampler> Study<S> {
    pub fn new(space: ParameterSpec, directions: StudyDirections, sampler: S) -> Self {
        Self {
            space,
            directions,
            sampler,
            policy: FailurePolicy::default(),
            parallel: true,
            next_id: 0,
            pending: BTreeMap::new(),
            trials: Vec::new(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Evaluate each batch of trials on the rayon pool.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn directions(&self) -> &StudyDirections {
        &self.directions
    }

    pub fn space(&self) -> &ParameterSpec {
        &self.space
    }

    /// Finished trials in id order.
    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn ask(&mut self) -> Trial {
        let id = self.next_id;
        self.next_id += 1;
        let params = self.sampler.suggest(&self.space);
        self.pending.insert(id, params.clone());
        Trial { id, params }
    }

    /// Record a pending trial's outcome.
    ///
    /// Failed trials (and NaN objectives) are stored with the worst value for
    /// each direction. Under `FailurePolicy::Abort` the failure is also returned.
    pub fn tell(&mut self, id: usize, outcome: TrialOutcome) -> Result<&TrialRecord, SearchError> {
        let params = self
            .pending
            .remove(&id)
            .ok_or(SearchError::UnknownTrial(id))?;

        let failure = match outcome {
            TrialOutcome::Complete(values) if values.len() != self.directions.len() => {
                return Err(SearchError::ObjectiveArity {
                    expected: self.directions.len(),
                    got: values.len(),
                });
            }
            TrialOutcome::Complete(values) if values.iter().any(|v| v.is_nan()) => {
                Err("objective returned NaN".to_string())
            }
            TrialOutcome::Complete(values) => Ok(values),
            TrialOutcome::Failed(message) => Err(message),
        };

        let record = match failure {
            Ok(values) => {
                debug!(trial = id, params = %params, ?values, "trial complete");
                self.sampler.observe(&params, &values);
                TrialRecord {
                    id,
                    params,
                    values,
                    state: TrialState::Complete,
                    error: None,
                }
            }
            Err(message) => {
                warn!(trial = id, params = %params, error = %message, "trial failed");
                if self.policy == FailurePolicy::Abort {
                    return Err(SearchError::TrialFailed {
                        id,
                        params,
                        message,
                    });
                }
                TrialRecord {
                    id,
                    params,
                    values: self.directions.worst_values(),
                    state: TrialState::Failed,
                    error: Some(message),
                }
            }
        };

        let at = self.trials.partition_point(|t| t.id < id);
        self.trials.insert(at, record);
        Ok(&self.trials[at])
    }

    /// Run `n_trials` evaluations of `objective`.
    ///
    /// Parameters are drawn sequentially, so a seeded sampler yields the same
    /// trials whether evaluation runs in parallel or not.
    pub fn optimize<F, E>(&mut self, objective: F, n_trials: usize) -> Result<(), SearchError>
    where
        F: Fn(&ParamSet) -> Result<Vec<f64>, E> + Sync,
        E: fmt::Display + Send,
    {
        if n_trials == 0 {
            return Err(SearchError::ZeroTrials);
        }

        if self.parallel {
            let batch: Vec<Trial> = (0..n_trials).map(|_| self.ask()).collect();
            let outcomes: Vec<(usize, Result<Vec<f64>, E>)> = batch
                .par_iter()
                .map(|t| (t.id, objective(&t.params)))
                .collect();
            for (id, result) in outcomes {
                self.tell(id, into_outcome(result))?;
            }
        } else {
            for _ in 0..n_trials {
                let trial = self.ask();
                let result = objective(&trial.params);
                self.tell(trial.id, into_outcome(result))?;
            }
        }

        let failed = self.trials.iter().filter(|t| !t.is_complete()).count();
        match self.best() {
            Ok(best) => info!(
                trials = self.trials.len(),
                failed,
                best_value = best.value(),
                best_params = %best.params,
                "search finished"
            ),
            Err(_) => warn!(trials = self.trials.len(), failed, "search finished without a successful trial"),
        }
        Ok(())
    }

    fn completed(&self) -> impl Iterator<Item = &TrialRecord> {
        self.trials.iter().filter(|t| t.is_complete())
    }

    /// Non-dominated completed trials, in id order.
    pub fn pareto_front(&self) -> Vec<&TrialRecord> {
        let dirs = self.directions.as_slice();
        let done: Vec<&TrialRecord> = self.completed().collect();
        done.iter()
            .filter(|candidate| {
                !done
                    .iter()
                    .any(|other| dominates(dirs, &other.values, &candidate.values))
            })
            .copied()
            .collect()
    }

    /// Best completed trial.
    ///
    /// Single objective: best value, earliest trial on ties. Multi-objective:
    /// the Pareto-optimal trial that ranks first on the first objective.
    pub fn best(&self) -> Result<&TrialRecord, SearchError> {
        let primary = self.directions.primary();
        let pool: Vec<&TrialRecord> = if self.directions.is_multi() {
            self.pareto_front()
        } else {
            self.completed().collect()
        };
        pool.into_iter()
            .fold(None, |best: Option<&TrialRecord>, t| match best {
                Some(b) if !primary.is_better(t.value(), b.value()) => Some(b),
                _ => Some(t),
            })
            .ok_or(SearchError::NoSuccessfulTrial {
                trials: self.trials.len(),
            })
    }

    pub fn best_params(&self) -> Result<&ParamSet, SearchError> {
        self.best().map(|t| &t.params)
    }

    pub fn best_value(&self) -> Result<f64, SearchError> {
        self.best().map(TrialRecord::value)
    }
}

fn into_outcome<E: fmt::Display>(result: Result<Vec<f64>, E>) -> TrialOutcome {
    match result {
        Ok(values) => TrialOutcome::Complete(values),
        Err(e) => TrialOutcome::Failed(e.to_string()),
    }
}

/// `a` is no worse than `b` everywhere and strictly better somewhere.
fn dominates(directions: &[Direction], a: &[f64], b: &[f64]) -> bool {
    let mut strictly = false;
    for ((d, x), y) in directions.iter().zip(a).zip(b) {
        if !d.is_at_least(*x, *y) {
            return false;
        }
        if d.is_better(*x, *y) {
            strictly = true;
        }
    }
    strictly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::sampler::RandomSampler;
    use alphawalk_core::params::{ParamRange, ParamValue};

    fn space() -> ParameterSpec {
        ParameterSpec::new()
            .with("x", ParamRange::Int { low: -10, high: 10 })
            .with("c", ParamRange::Fixed { value: ParamValue::Int(3) })
    }

    fn x(p: &ParamSet) -> f64 {
        p.get("x").and_then(ParamValue::as_f64).unwrap_or(f64::NAN)
    }

    fn single(d: Direction) -> StudyDirections {
        StudyDirections::Single(d)
    }

    #[test]
    fn maximizes_and_minimizes() {
        let mut up = Study::new(space(), single(Direction::Maximize), RandomSampler::new(1));
        up.optimize(|p| Ok::<_, String>(vec![x(p)]), 60).unwrap();
        let best_up = up.best().unwrap();
        assert!(up.trials().iter().all(|t| t.value() <= best_up.value()));

        let mut down = Study::new(space(), single(Direction::Minimize), RandomSampler::new(1));
        down.optimize(|p| Ok::<_, String>(vec![x(p)]), 60).unwrap();
        let best_down = down.best().unwrap();
        assert!(down.trials().iter().all(|t| t.value() >= best_down.value()));
        assert_eq!(best_down.params.get("c"), Some(&ParamValue::Int(3)));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let run = |parallel| {
            let mut s = Study::new(space(), single(Direction::Maximize), RandomSampler::new(9))
                .with_parallelism(parallel);
            s.optimize(|p| Ok::<_, String>(vec![-(x(p) - 2.0).powi(2)]), 25)
                .unwrap();
            s.trials().to_vec()
        };
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn failed_trials_get_worst_score() {
        let mut s = Study::new(space(), single(Direction::Maximize), RandomSampler::new(4))
            .with_parallelism(false);
        s.optimize(
            |p| {
                if x(p) < 0.0 {
                    Err("negative x".to_string())
                } else {
                    Ok(vec![x(p)])
                }
            },
            40,
        )
        .unwrap();
        let failed: Vec<_> = s.trials().iter().filter(|t| !t.is_complete()).collect();
        assert!(!failed.is_empty());
        for t in &failed {
            assert_eq!(t.values, vec![f64::NEG_INFINITY]);
            assert_eq!(t.error.as_deref(), Some("negative x"));
        }
        assert!(s.best().unwrap().is_complete());
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let mut s = Study::new(space(), single(Direction::Maximize), RandomSampler::new(4))
            .with_failure_policy(FailurePolicy::Abort);
        let err = s
            .optimize(|_| Err::<Vec<f64>, _>("boom"), 5)
            .unwrap_err();
        assert!(matches!(err, SearchError::TrialFailed { id: 0, .. }));
    }

    #[test]
    fn all_failed_has_no_best() {
        let mut s = Study::new(space(), single(Direction::Minimize), RandomSampler::new(2));
        s.optimize(|_| Err::<Vec<f64>, _>("always"), 3).unwrap();
        assert_eq!(s.best(), Err(SearchError::NoSuccessfulTrial { trials: 3 }));
        assert_eq!(s.trials()[0].values, vec![f64::INFINITY]);
    }

    #[test]
    fn nan_objective_counts_as_failure() {
        let mut s = Study::new(space(), single(Direction::Maximize), RandomSampler::new(2));
        let t = s.ask();
        let rec = s.tell(t.id, TrialOutcome::Complete(vec![f64::NAN])).unwrap();
        assert_eq!(rec.state, TrialState::Failed);
    }

    #[test]
    fn ask_tell_protocol() {
        let mut s = Study::new(space(), single(Direction::Maximize), RandomSampler::new(5));
        let a = s.ask();
        let b = s.ask();
        s.tell(b.id, TrialOutcome::Complete(vec![1.0])).unwrap();
        s.tell(a.id, TrialOutcome::Complete(vec![2.0])).unwrap();
        assert_eq!(s.trials()[0].id, a.id);
        assert_eq!(s.best_value().unwrap(), 2.0);
        assert_eq!(
            s.tell(a.id, TrialOutcome::Complete(vec![3.0])).unwrap_err(),
            SearchError::UnknownTrial(a.id)
        );
        let c = s.ask();
        assert_eq!(
            s.tell(c.id, TrialOutcome::Complete(vec![1.0, 2.0])).unwrap_err(),
            SearchError::ObjectiveArity {
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn multi_objective_front_and_best() {
        let dirs = StudyDirections::Multi(vec![Direction::Maximize, Direction::Minimize]);
        let mut s = Study::new(space(), dirs, RandomSampler::new(0));
        let values = [
            vec![5.0, 3.0], // front
            vec![4.0, 1.0], // front
            vec![4.0, 3.0], // dominated by both
            vec![5.0, 3.0], // equal to the first, not dominated
        ];
        for v in values {
            let t = s.ask();
            s.tell(t.id, TrialOutcome::Complete(v)).unwrap();
        }
        let front: Vec<usize> = s.pareto_front().iter().map(|t| t.id).collect();
        assert_eq!(front, vec![0, 1, 3]);
        assert_eq!(s.best().unwrap().id, 0);
    }

    #[test]
    fn zero_budget_is_rejected() {
        let mut s = Study::new(space(), single(Direction::Maximize), RandomSampler::new(0));
        assert_eq!(
            s.optimize(|_| Ok::<_, String>(vec![0.0]), 0),
            Err(SearchError::ZeroTrials)
        );
    }
}
