//! Error taxonomy for the core crate.
//!
//! Data integrity problems surface before any simulation starts. Indicator and
//! signal failures are scoped to the simulation run that raised them.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Problems with the bar series itself (ordering, duplicates, schema).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrityError {
    #[error("bar series is empty")]
    EmptySeries,

    #[error("duplicate timestamp {timestamp} at row {index}")]
    DuplicateTimestamp {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("timestamp {current} at row {index} precedes previous timestamp {previous}")]
    NonMonotonic {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("bar at {timestamp} has non-positive or inconsistent prices")]
    InsaneBar { timestamp: NaiveDateTime },
}

/// Not enough history to produce a single valid indicator value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("{indicator} needs {required} bars of history, series has {available}")]
    InsufficientHistory {
        indicator: String,
        required: usize,
        available: usize,
    },
}

/// A strategy produced a position value outside {-1, 0, 1}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid position value {value}: must be one of -1, 0, 1")]
pub struct InvalidSignalError {
    pub value: i64,
}

/// Fatal errors for a single simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("cannot simulate an empty bar series")]
    EmptySeries,

    #[error("strategy enrichment failed: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("invalid signal at bar {index}: {source}")]
    InvalidSignal {
        index: usize,
        #[source]
        source: InvalidSignalError,
    },

    #[error("enriched frame has {enriched} rows but series has {bars}")]
    RowCountChanged { bars: usize, enriched: usize },
}

/// Problems resolving strategy parameters from a `ParamSet`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("unknown parameter '{name}' for strategy '{strategy}'")]
    Unknown { strategy: String, name: String },

    #[error("parameter '{name}' must be {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("parameter '{name}' is out of range: {reason}")]
    OutOfRange { name: String, reason: String },
}
