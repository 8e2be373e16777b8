//! Target metric — which scalar(s) of `Metrics` a search optimizes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    ProfitAfterFee,
    ProfitPerDay,
    ProfitPerYear,
    #[default]
    #[serde(alias = "sharp_ratio")]
    SharpeRatio,
    MaxDrawdown,
    HitRate,
}

impl TargetMetric {
    pub const ALL: [TargetMetric; 6] = [
        Self::ProfitAfterFee,
        Self::ProfitPerDay,
        Self::ProfitPerYear,
        Self::SharpeRatio,
        Self::MaxDrawdown,
        Self::HitRate,
    ];

    pub fn extract(&self, metrics: &Metrics) -> f64 {
        match self {
            Self::ProfitAfterFee => metrics.profit_after_fee,
            Self::ProfitPerDay => metrics.profit_per_day,
            Self::ProfitPerYear => metrics.profit_per_year,
            Self::SharpeRatio => metrics.sharpe_ratio,
            Self::MaxDrawdown => metrics.max_drawdown.value,
            Self::HitRate => metrics.hit_rate,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ProfitAfterFee => "profit_after_fee",
            Self::ProfitPerDay => "profit_per_day",
            Self::ProfitPerYear => "profit_per_year",
            Self::SharpeRatio => "sharpe_ratio",
            Self::MaxDrawdown => "max_drawdown",
            Self::HitRate => "hit_rate",
        }
    }
}

impl fmt::Display for TargetMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "sharp_ratio" {
            return Ok(Self::SharpeRatio);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown target metric '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Drawdown;

    #[test]
    fn extract_reads_matching_field() {
        let m = Metrics {
            profit_after_fee: 12.5,
            hit_rate: 0.6,
            max_drawdown: Drawdown {
                value: 4.0,
                start: 1,
                end: 3,
            },
            ..Default::default()
        };
        assert_eq!(TargetMetric::ProfitAfterFee.extract(&m), 12.5);
        assert_eq!(TargetMetric::HitRate.extract(&m), 0.6);
        assert_eq!(TargetMetric::MaxDrawdown.extract(&m), 4.0);
    }

    #[test]
    fn names_round_trip() {
        for t in TargetMetric::ALL {
            assert_eq!(t.name().parse::<TargetMetric>(), Ok(t));
        }
        assert_eq!("sharp_ratio".parse::<TargetMetric>(), Ok(TargetMetric::SharpeRatio));
        assert!("alpha".parse::<TargetMetric>().is_err());
    }

    #[test]
    fn serde_accepts_legacy_spelling() {
        let t: TargetMetric = serde_json::from_str("\"sharp_ratio\"").unwrap();
        assert_eq!(t, TargetMetric::SharpeRatio);
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"sharpe_ratio\"");
    }
}
