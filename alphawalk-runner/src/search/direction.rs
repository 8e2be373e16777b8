//! Optimization direction(s) for a study.
//!
//! Configuration names either one `direction` or a `directions` list for
//! multi-objective mode. Exactly one of the two must be present.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Score recorded for a failed trial.
    pub fn worst(self) -> f64 {
        match self {
            Direction::Maximize => f64::NEG_INFINITY,
            Direction::Minimize => f64::INFINITY,
        }
    }

    /// True if `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Maximize => a > b,
            Direction::Minimize => a < b,
        }
    }

    /// True if `a` is at least as good as `b`.
    pub fn is_at_least(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Maximize => a >= b,
            Direction::Minimize => a <= b,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Maximize => "maximize",
            Direction::Minimize => "minimize",
        })
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maximize" => Ok(Direction::Maximize),
            "minimize" => Ok(Direction::Minimize),
            other => Err(ConfigError::UnknownDirection(other.to_string())),
        }
    }
}

/// Direction settings as they appear in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<Vec<Direction>>,
}

impl DirectionSpec {
    pub fn single(direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            directions: None,
        }
    }

    pub fn multi(directions: Vec<Direction>) -> Self {
        Self {
            direction: None,
            directions: Some(directions),
        }
    }

    /// Validate against the number of objective values the study produces.
    pub fn resolve(&self, objectives: usize) -> Result<StudyDirections, ConfigError> {
        let resolved = match (&self.direction, &self.directions) {
            (None, None) => return Err(ConfigError::MissingDirection),
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousDirection),
            (Some(d), None) => StudyDirections::Single(*d),
            (None, Some(list)) if list.is_empty() => return Err(ConfigError::EmptyDirections),
            (None, Some(list)) => StudyDirections::Multi(list.clone()),
        };
        if resolved.len() != objectives {
            return Err(ConfigError::DirectionCountMismatch {
                directions: resolved.len(),
                objectives,
            });
        }
        Ok(resolved)
    }
}

/// Validated directions, one per objective value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudyDirections {
    Single(Direction),
    Multi(Vec<Direction>),
}

impl StudyDirections {
    pub fn as_slice(&self) -> &[Direction] {
        match self {
            StudyDirections::Single(d) => std::slice::from_ref(d),
            StudyDirections::Multi(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, StudyDirections::Multi(_))
    }

    /// The direction that orders `best()`.
    pub fn primary(&self) -> Direction {
        match self {
            StudyDirections::Single(d) => *d,
            StudyDirections::Multi(v) => v.first().copied().unwrap_or(Direction::Maximize),
        }
    }

    /// Per-objective worst scores, recorded for failed trials.
    pub fn worst_values(&self) -> Vec<f64> {
        self.as_slice().iter().map(|d| d.worst()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neither_direction_is_rejected() {
        assert!(matches!(
            DirectionSpec::default().resolve(1),
            Err(ConfigError::MissingDirection)
        ));
    }

    #[test]
    fn both_directions_are_rejected() {
        let spec = DirectionSpec {
            direction: Some(Direction::Maximize),
            directions: Some(vec![Direction::Maximize]),
        };
        assert!(matches!(spec.resolve(1), Err(ConfigError::AmbiguousDirection)));
    }

    #[test]
    fn list_length_must_match_objectives() {
        let spec = DirectionSpec::multi(vec![Direction::Maximize, Direction::Minimize]);
        assert!(spec.resolve(2).unwrap().is_multi());
        assert!(matches!(
            spec.resolve(3),
            Err(ConfigError::DirectionCountMismatch {
                directions: 2,
                objectives: 3
            })
        ));
        assert!(matches!(
            DirectionSpec::multi(vec![]).resolve(0),
            Err(ConfigError::EmptyDirections)
        ));
    }

    #[test]
    fn single_direction_resolves() {
        let d = DirectionSpec::single(Direction::Minimize).resolve(1).unwrap();
        assert_eq!(d.as_slice(), &[Direction::Minimize]);
        assert_eq!(d.worst_values(), vec![f64::INFINITY]);
    }

    #[test]
    fn parses_from_toml() {
        let spec: DirectionSpec = toml::from_str(r#"directions = ["maximize", "minimize"]"#).unwrap();
        assert_eq!(
            spec.directions,
            Some(vec![Direction::Maximize, Direction::Minimize])
        );
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn comparisons_follow_direction() {
        assert!(Direction::Maximize.is_better(2.0, 1.0));
        assert!(Direction::Minimize.is_better(1.0, 2.0));
        assert!(Direction::Maximize.is_better(0.0, Direction::Maximize.worst()));
    }
}
