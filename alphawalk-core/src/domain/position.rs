//! Position — the closed three-valued exposure state — and the per-bar series.

use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::error::InvalidSignalError;

/// Exposure held after a bar closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i64")]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn as_i8(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    /// Signed multiplier for PnL accounting.
    pub fn sign(self) -> f64 {
        f64::from(self.as_i8())
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }
}

impl From<Position> for i8 {
    fn from(p: Position) -> Self {
        p.as_i8()
    }
}

impl TryFrom<i64> for Position {
    type Error = InvalidSignalError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Position::Short),
            0 => Ok(Position::Flat),
            1 => Ok(Position::Long),
            _ => Err(InvalidSignalError { value }),
        }
    }
}

/// One position per bar, index-aligned with the bar series it was produced from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSeries(Vec<Position>);

impl PositionSeries {
    pub fn new(positions: Vec<Position>) -> Self {
        Self(positions)
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<Position> {
        self.0.last().copied()
    }

    /// Number of indices where the position differs from the previous bar.
    pub fn changes(&self) -> usize {
        self.0.windows(2).filter(|w| w[0] != w[1]).count()
    }

    pub fn to_i8_vec(&self) -> Vec<i8> {
        self.0.iter().map(|p| p.as_i8()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.0.iter()
    }
}

impl Index<usize> for PositionSeries {
    type Output = Position;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<Vec<Position>> for PositionSeries {
    fn from(v: Vec<Position>) -> Self {
        Self(v)
    }
}
