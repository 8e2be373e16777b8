//! Experiment configuration — TOML file in, validated runtime settings out.
//!
//! ```toml
//! [data]
//! bars = "data/bars.csv"
//! expirations = "data/expirations.csv"
//!
//! [strategy]
//! name = "mfi_reversal"
//!
//! [strategy.params]
//! mfi_period = [5, 30]
//! lowpass_filter_ratio = [0.1, 0.9]
//! mfi_middle_upper = 60
//!
//! [session]
//! short_exit_cutoff = "14:25:00"
//! expiration_cutoff = "14:45:00"
//!
//! [evaluation]
//! fee = 0.3
//! targets = ["sharpe_ratio"]
//!
//! [search]
//! direction = "maximize"
//! n_trials = 50
//! seed = 42
//!
//! [walk_forward]
//! train_days = 365
//! test_days = 180
//!
//! [split]
//! method = "sequence"
//! args = { split_date = "2023-01-01 00:00:00" }
//! ```
//!
//! Every check happens in `validate()`, before any bars are simulated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use alphawalk_core::params::{ParameterSpec, SpecError};
use alphawalk_core::simulator::SessionRules;
use alphawalk_core::strategies::{FactoryError, NamedStrategy};

use crate::metrics::{PointEvaluator, DEFAULT_FEE};
use crate::search::{Direction, DirectionSpec, FailurePolicy, StudyDirections};
use crate::split::SplitMethod;
use crate::target::TargetMetric;
use crate::walk_forward::WalkForwardConfig;

/// Configuration problems, all reported before simulation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("search needs either `direction` or `directions`")]
    MissingDirection,

    #[error("search sets both `direction` and `directions`; pick one")]
    AmbiguousDirection,

    #[error("`directions` must not be empty")]
    EmptyDirections,

    #[error("{directions} direction(s) configured for {objectives} objective(s)")]
    DirectionCountMismatch { directions: usize, objectives: usize },

    #[error("unknown direction '{0}': expected 'maximize' or 'minimize'")]
    UnknownDirection(String),

    #[error("unknown split method '{0}'")]
    UnknownSplitMethod(String),

    #[error("split method '{method}' requires argument '{argument}'")]
    MissingSplitArgument { method: String, argument: String },

    #[error("malformed parameter spec: {0}")]
    Spec(#[from] SpecError),

    #[error("strategy: {0}")]
    Strategy(#[from] FactoryError),

    #[error(
        "data from {first} to {last} is shorter than one window ({train_window} train + {test_window} test)"
    )]
    NoWindows {
        first: chrono::NaiveDateTime,
        last: chrono::NaiveDateTime,
        train_window: Duration,
        test_window: Duration,
    },

    #[error("{name} must be positive")]
    NonPositiveWindow { name: &'static str },

    #[error("{name} of {days} days is out of range")]
    WindowTooLarge { name: &'static str, days: i64 },

    #[error("n_trials must be positive")]
    ZeroTrials,

    #[error("window {index} has no {part} bars in [{start}, {end})")]
    EmptyWindow {
        index: usize,
        part: &'static str,
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ─── File sections ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Bars CSV with Date, Open, High, Low, Close, Volume columns.
    pub bars: PathBuf,
    /// Expiration dates CSV; no expirations when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expirations: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub name: String,
    #[serde(default)]
    pub params: ParameterSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationConfig {
    #[serde(default = "default_fee")]
    pub fee: f64,
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetMetric>,
}

fn default_fee() -> f64 {
    DEFAULT_FEE
}

fn default_targets() -> Vec<TargetMetric> {
    vec![TargetMetric::default()]
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            fee: default_fee(),
            targets: default_targets(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<Vec<Direction>>,
    #[serde(default = "default_n_trials")]
    pub n_trials: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl SearchConfig {
    pub fn direction_spec(&self) -> DirectionSpec {
        DirectionSpec {
            direction: self.direction,
            directions: self.directions.clone(),
        }
    }
}

fn default_n_trials() -> usize {
    50
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalkForwardSection {
    pub train_days: i64,
    pub test_days: i64,
    #[serde(default)]
    pub parallel_windows: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    pub method: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

/// The experiment file as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub session: SessionRules,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    pub search: SearchConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walk_forward: Option<WalkForwardSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<SplitConfig>,
}

// ─── Validated settings ─────────────────────────────────────────────

/// Search settings shared by the single-split search and every window.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub space: ParameterSpec,
    pub targets: Vec<TargetMetric>,
    pub directions: StudyDirections,
    pub n_trials: usize,
    pub seed: u64,
    pub parallel: bool,
    pub failure_policy: FailurePolicy,
}

/// Runtime settings after validation.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub bars_path: PathBuf,
    pub expirations_path: Option<PathBuf>,
    pub strategy: NamedStrategy,
    pub session: SessionRules,
    pub evaluator: PointEvaluator,
    pub search: SearchSettings,
    pub walk_forward: Option<WalkForwardConfig>,
    pub split: Option<SplitMethod>,
}

impl ExperimentConfig {
    /// Read and parse; relative data paths resolve against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(base) = path.parent() {
            config.data.bars = base.join(&config.data.bars);
            config.data.expirations = config.data.expirations.map(|p| base.join(p));
        }
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<Experiment, ConfigError> {
        let strategy = NamedStrategy::new(&self.strategy.name)?;

        let evaluator =
            PointEvaluator::new(self.evaluation.fee).map_err(|e| ConfigError::InvalidValue {
                field: "evaluation.fee",
                reason: e.to_string(),
            })?;
        if self.evaluation.targets.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "evaluation.targets",
                reason: "at least one target metric is required".to_string(),
            });
        }
        let directions = self
            .search
            .direction_spec()
            .resolve(self.evaluation.targets.len())?;
        if self.search.n_trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if self.session.short_exit_cutoff > self.session.expiration_cutoff {
            tracing::warn!(
                short_exit = %self.session.short_exit_cutoff,
                expiration = %self.session.expiration_cutoff,
                "short-exit cutoff is later than the expiration cutoff"
            );
        }

        let search = SearchSettings {
            space: self.strategy.params.clone(),
            targets: self.evaluation.targets.clone(),
            directions,
            n_trials: self.search.n_trials,
            seed: self.search.seed,
            parallel: self.search.parallel,
            failure_policy: self.search.failure_policy,
        };

        let walk_forward = self
            .walk_forward
            .as_ref()
            .map(|wf| {
                WalkForwardConfig::new(
                    window_days("train_window", wf.train_days)?,
                    window_days("test_window", wf.test_days)?,
                    self.search.n_trials,
                )
                .map(|c| {
                    c.with_seed(self.search.seed)
                        .with_parallel_trials(self.search.parallel)
                        .with_parallel_windows(wf.parallel_windows)
                        .with_failure_policy(self.search.failure_policy)
                })
            })
            .transpose()?;

        let split = self
            .split
            .as_ref()
            .map(|s| SplitMethod::from_args(&s.method, &s.args))
            .transpose()?;

        Ok(Experiment {
            bars_path: self.data.bars.clone(),
            expirations_path: self.data.expirations.clone(),
            strategy,
            session: self.session,
            evaluator,
            search,
            walk_forward,
            split,
        })
    }
}

fn window_days(name: &'static str, days: i64) -> Result<Duration, ConfigError> {
    Duration::try_days(days).ok_or(ConfigError::WindowTooLarge { name, days })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphawalk_core::params::ParamRange;
    use chrono::NaiveTime;

    const FULL: &str = r#"
        [data]
        bars = "bars.csv"
        expirations = "exp.csv"

        [strategy]
        name = "mfi_reversal"

        [strategy.params]
        mfi_period = [5, 30]
        lowpass_filter_ratio = [0.1, 0.9]
        mfi_middle_upper = 60

        [session]
        short_exit_cutoff = "14:20:00"

        [evaluation]
        fee = 0.5
        targets = ["profit_after_fee", "max_drawdown"]

        [search]
        directions = ["maximize", "minimize"]
        n_trials = 20
        seed = 9
        failure_policy = "abort"

        [walk_forward]
        train_days = 10
        test_days = 5

        [split]
        method = "sequence"
        args = { split_date = "2024-01-15" }
    "#;

    fn minimal(search: &str) -> String {
        format!(
            "[data]\nbars = \"b.csv\"\n[strategy]\nname = \"enhanced_mfi\"\n[search]\n{search}\n"
        )
    }

    #[test]
    fn full_file_validates() {
        let config = ExperimentConfig::from_toml(FULL).unwrap();
        assert_eq!(
            config.strategy.params.get("mfi_period"),
            Some(&ParamRange::Int { low: 5, high: 30 })
        );
        assert_eq!(
            config.session.short_exit_cutoff,
            NaiveTime::from_hms_opt(14, 20, 0).unwrap()
        );
        assert_eq!(
            config.session.expiration_cutoff,
            NaiveTime::from_hms_opt(14, 45, 0).unwrap()
        );

        let exp = config.validate().unwrap();
        assert_eq!(exp.strategy.name(), "mfi_reversal");
        assert_eq!(exp.evaluator.fee(), 0.5);
        assert_eq!(
            exp.search.directions,
            StudyDirections::Multi(vec![Direction::Maximize, Direction::Minimize])
        );
        assert_eq!(exp.search.failure_policy, FailurePolicy::Abort);
        let wf = exp.walk_forward.unwrap();
        assert_eq!(wf.train_window, Duration::days(10));
        assert_eq!(wf.n_trials, 20);
        assert_eq!(wf.seed, 9);
        assert!(matches!(exp.split, Some(SplitMethod::Sequence { .. })));
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let config = ExperimentConfig::from_toml(&minimal("direction = \"maximize\"")).unwrap();
        assert_eq!(config.session, SessionRules::default());
        assert_eq!(config.evaluation, EvaluationConfig::default());
        let exp = config.validate().unwrap();
        assert_eq!(exp.search.n_trials, 50);
        assert!(exp.search.parallel);
        assert_eq!(exp.search.targets, vec![TargetMetric::SharpeRatio]);
        assert!(exp.walk_forward.is_none());
        assert!(exp.split.is_none());
    }

    #[test]
    fn direction_must_be_given_exactly_once() {
        let none = ExperimentConfig::from_toml(&minimal("n_trials = 3")).unwrap();
        assert!(matches!(none.validate(), Err(ConfigError::MissingDirection)));

        let both = ExperimentConfig::from_toml(&minimal(
            "direction = \"maximize\"\ndirections = [\"maximize\"]",
        ))
        .unwrap();
        assert!(matches!(both.validate(), Err(ConfigError::AmbiguousDirection)));
    }

    #[test]
    fn directions_must_match_targets() {
        let config =
            ExperimentConfig::from_toml(&minimal("directions = [\"maximize\", \"minimize\"]"))
                .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DirectionCountMismatch {
                directions: 2,
                objectives: 1
            })
        ));
    }

    #[test]
    fn malformed_param_spec_is_a_parse_error() {
        let text = FULL.replace("mfi_period = [5, 30]", "mfi_period = [30, 5]");
        assert!(matches!(
            ExperimentConfig::from_toml(&text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn bad_values_are_rejected() {
        let unknown = FULL.replace("\"mfi_reversal\"", "\"macd\"");
        assert!(matches!(
            ExperimentConfig::from_toml(&unknown).unwrap().validate(),
            Err(ConfigError::Strategy(FactoryError::UnknownStrategy(_)))
        ));

        let zero = FULL.replace("n_trials = 20", "n_trials = 0");
        assert!(matches!(
            ExperimentConfig::from_toml(&zero).unwrap().validate(),
            Err(ConfigError::ZeroTrials)
        ));

        let window = FULL.replace("test_days = 5", "test_days = 0");
        assert!(matches!(
            ExperimentConfig::from_toml(&window).unwrap().validate(),
            Err(ConfigError::NonPositiveWindow { name: "test_window" })
        ));

        let huge = FULL.replace("train_days = 10", "train_days = 9000000000000000");
        assert!(matches!(
            ExperimentConfig::from_toml(&huge).unwrap().validate(),
            Err(ConfigError::WindowTooLarge {
                name: "train_window",
                days: 9_000_000_000_000_000
            })
        ));

        let fee = FULL.replace("fee = 0.5", "fee = -1.0");
        assert!(matches!(
            ExperimentConfig::from_toml(&fee).unwrap().validate(),
            Err(ConfigError::InvalidValue {
                field: "evaluation.fee",
                ..
            })
        ));

        let split = FULL.replace("\"sequence\"", "\"kfold\"");
        assert!(matches!(
            ExperimentConfig::from_toml(&split).unwrap().validate(),
            Err(ConfigError::UnknownSplitMethod(m)) if m == "kfold"
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = FULL.replace("seed = 9", "seed = 9\nsampler = \"tpe\"");
        assert!(ExperimentConfig::from_toml(&text).is_err());
    }

    #[test]
    fn from_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exp.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = ExperimentConfig::from_file(&path).unwrap();
        assert_eq!(config.data.bars, dir.path().join("bars.csv"));
        assert_eq!(config.data.expirations, Some(dir.path().join("exp.csv")));

        assert!(matches!(
            ExperimentConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
