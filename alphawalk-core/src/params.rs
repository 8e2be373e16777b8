//! Parameter model shared by direct strategy construction and trial sampling.
//!
//! Wire format (TOML or JSON): `name = [low, high]` declares a range whose
//! sampling type is fixed by the first element (integer or float);
//! `name = scalar` declares a fixed value passed through unchanged. The
//! type decision happens once, at parse time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::error::ParamError;

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ParamValue {
    /// Numeric view; integers widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let ParamValue::Int(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::Bool(_) => "bool",
            ParamValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// A concrete assignment: parameter name to value, in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Integer parameter, or `default` when absent. Must be a non-negative integer.
    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize, ParamError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(*v as usize),
            Some(ParamValue::Int(v)) => Err(ParamError::OutOfRange {
                name: name.to_string(),
                reason: format!("{v} is negative"),
            }),
            Some(other) => Err(ParamError::WrongType {
                name: name.to_string(),
                expected: "integer",
                found: other.kind().to_string(),
            }),
        }
    }

    /// Numeric parameter, or `default` when absent. Integers are accepted.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, ParamError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| ParamError::WrongType {
                name: name.to_string(),
                expected: "number",
                found: value.kind().to_string(),
            }),
        }
    }

    /// Fail on any parameter name not in `allowed`.
    pub fn reject_unknown(&self, strategy: &str, allowed: &[&str]) -> Result<(), ParamError> {
        match self.0.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(name) => Err(ParamError::Unknown {
                strategy: strategy.to_string(),
                name: name.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(String, ParamValue)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Malformed ParameterSpec entry.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed parameter '{name}': {reason}")]
pub struct SpecError {
    pub name: String,
    pub reason: String,
}

/// How a single parameter is produced for each trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "RawParamEntry")]
pub enum ParamRange {
    /// Uniform over `[low, high]`, both inclusive.
    Int { low: i64, high: i64 },
    /// Uniform over `[low, high]`.
    Float { low: f64, high: f64 },
    /// Passed through unchanged.
    Fixed { value: ParamValue },
}

impl ParamRange {
    pub fn is_numeric_range(&self) -> bool {
        !matches!(self, ParamRange::Fixed { .. })
    }

    fn from_raw(name: &str, raw: RawParamEntry) -> Result<Self, SpecError> {
        let malformed = |reason: String| SpecError {
            name: name.to_string(),
            reason,
        };
        let bounds = match raw {
            RawParamEntry::Scalar(value) => return Ok(ParamRange::Fixed { value }),
            RawParamEntry::Range(bounds) => bounds,
        };
        let [low, high] = <[ParamValue; 2]>::try_from(bounds).map_err(|b| {
            malformed(format!("range needs exactly [low, high], got {} elements", b.len()))
        })?;
        let range = match (&low, &high) {
            (ParamValue::Int(lo), ParamValue::Int(hi)) => ParamRange::Int { low: *lo, high: *hi },
            (ParamValue::Int(_), ParamValue::Float(_)) => {
                return Err(malformed(
                    "integer range must have an integer upper bound".to_string(),
                ))
            }
            (ParamValue::Float(lo), hi) => match hi.as_f64() {
                Some(hi) => ParamRange::Float { low: *lo, high: hi },
                None => return Err(malformed("bounds must be numeric".to_string())),
            },
            _ => return Err(malformed("bounds must be numeric".to_string())),
        };
        let ordered = match &range {
            ParamRange::Int { low, high } => low <= high,
            ParamRange::Float { low, high } => low.is_finite() && high.is_finite() && low <= high,
            ParamRange::Fixed { .. } => true,
        };
        if !ordered {
            return Err(malformed(format!("low {low} exceeds high {high}")));
        }
        if let ParamRange::Float { low, high } = range {
            if !(high - low).is_finite() {
                return Err(malformed(format!("range {low}..{high} is too wide to sample")));
            }
        }
        Ok(range)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawParamEntry {
    Range(Vec<ParamValue>),
    Scalar(ParamValue),
}

impl From<ParamRange> for RawParamEntry {
    fn from(range: ParamRange) -> Self {
        match range {
            ParamRange::Int { low, high } => {
                RawParamEntry::Range(vec![ParamValue::Int(low), ParamValue::Int(high)])
            }
            ParamRange::Float { low, high } => {
                RawParamEntry::Range(vec![ParamValue::Float(low), ParamValue::Float(high)])
            }
            ParamRange::Fixed { value } => RawParamEntry::Scalar(value),
        }
    }
}

/// Parameter name to range, in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, RawParamEntry>")]
pub struct ParameterSpec(BTreeMap<String, ParamRange>);

impl TryFrom<BTreeMap<String, RawParamEntry>> for ParameterSpec {
    type Error = SpecError;

    fn try_from(raw: BTreeMap<String, RawParamEntry>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(name, entry)| ParamRange::from_raw(&name, entry).map(|r| (name, r)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}

impl ParameterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON wire format.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, name: impl Into<String>, range: ParamRange) {
        self.0.insert(name.into(), range);
    }

    pub fn with(mut self, name: impl Into<String>, range: ParamRange) -> Self {
        self.insert(name, range);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamRange> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamRange)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of Int/Float ranges, the parameters that get stability statistics.
    pub fn numeric_names(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, r)| r.is_numeric_range())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// The assignment when every entry is fixed; errors on the first range.
    pub fn fixed_assignment(&self) -> Result<ParamSet, SpecError> {
        self.0
            .iter()
            .map(|(name, range)| match range {
                ParamRange::Fixed { value } => Ok((name.clone(), value.clone())),
                _ => Err(SpecError {
                    name: name.clone(),
                    reason: "is a range; a fixed value is required here".to_string(),
                }),
            })
            .collect()
    }
}
