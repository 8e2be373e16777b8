//! MFI entries confirmed by trend, momentum and volume, with an ATR stop.
//!
//! Entry from Flat:
//! - Long: MFI < `mfi_lower`, short MA above long MA, ROC > 0, strong volume
//! - Short: MFI > `mfi_upper`, short MA below long MA, ROC < 0, strong volume
//!
//! Long exits when MFI > 70 or the uptrend or positive momentum is lost;
//! Short exits when MFI < 30 or the downtrend or negative momentum is lost.
//! The stop compares this bar's low (high for Short) against the previous
//! close minus (plus) `atr_multiplier` times the previous ATR.

use serde::Serialize;

use crate::domain::{Bar, Position};
use crate::error::{IndicatorError, InvalidSignalError, ParamError};
use crate::indicators::sma::SmaSource;
use crate::indicators::{Atr, Indicator, Mfi, Roc, Sma};
use crate::params::ParamSet;
use crate::strategy::{require_history, EnrichedBars, Strategy};

const LONG_EXIT_MFI: f64 = 70.0;
const SHORT_EXIT_MFI: f64 = 30.0;
const STRONG_VOLUME_RATIO: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedMfiParams {
    pub mfi_period: usize,
    pub mfi_upper: f64,
    pub mfi_lower: f64,
    pub roc_period: usize,
    pub ma_short: usize,
    pub ma_long: usize,
    pub atr_period: usize,
    pub atr_multiplier: f64,
}

impl Default for EnhancedMfiParams {
    fn default() -> Self {
        Self {
            mfi_period: 14,
            mfi_upper: 80.0,
            mfi_lower: 20.0,
            roc_period: 10,
            ma_short: 20,
            ma_long: 50,
            atr_period: 14,
            atr_multiplier: 2.0,
        }
    }
}

impl EnhancedMfiParams {
    pub const NAMES: &'static [&'static str] = &[
        "mfi_period",
        "mfi_upper",
        "mfi_lower",
        "roc_period",
        "ma_short",
        "ma_long",
        "atr_period",
        "atr_multiplier",
    ];

    pub fn from_params(params: &ParamSet) -> Result<Self, ParamError> {
        params.reject_unknown(EnhancedMfi::NAME, Self::NAMES)?;
        let d = Self::default();
        let resolved = Self {
            mfi_period: params.usize_or("mfi_period", d.mfi_period)?,
            mfi_upper: params.f64_or("mfi_upper", d.mfi_upper)?,
            mfi_lower: params.f64_or("mfi_lower", d.mfi_lower)?,
            roc_period: params.usize_or("roc_period", d.roc_period)?,
            ma_short: params.usize_or("ma_short", d.ma_short)?,
            ma_long: params.usize_or("ma_long", d.ma_long)?,
            atr_period: params.usize_or("atr_period", d.atr_period)?,
            atr_multiplier: params.f64_or("atr_multiplier", d.atr_multiplier)?,
        };
        for (name, value) in [
            ("mfi_period", resolved.mfi_period),
            ("roc_period", resolved.roc_period),
            ("ma_short", resolved.ma_short),
            ("ma_long", resolved.ma_long),
            ("atr_period", resolved.atr_period),
        ] {
            if value == 0 {
                return Err(ParamError::OutOfRange {
                    name: name.into(),
                    reason: "must be at least 1".into(),
                });
            }
        }
        if resolved.atr_multiplier.is_nan() || resolved.atr_multiplier < 0.0 {
            return Err(ParamError::OutOfRange {
                name: "atr_multiplier".into(),
                reason: format!("{} is negative", resolved.atr_multiplier),
            });
        }
        Ok(resolved)
    }
}

#[derive(Debug, Clone)]
pub struct EnhancedMfi {
    params: EnhancedMfiParams,
}

impl EnhancedMfi {
    pub const NAME: &'static str = "enhanced_mfi";

    pub fn new(params: EnhancedMfiParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EnhancedMfiParams {
        &self.params
    }

    /// Column name paired with the indicator that fills it.
    fn indicators(&self) -> Vec<(&'static str, Box<dyn Indicator>)> {
        let p = &self.params;
        vec![
            ("ma_short", Box::new(Sma::new(p.ma_short)) as Box<dyn Indicator>),
            ("ma_long", Box::new(Sma::new(p.ma_long)) as Box<dyn Indicator>),
            ("mfi", Box::new(Mfi::new(p.mfi_period)) as Box<dyn Indicator>),
            ("roc", Box::new(Roc::new(p.roc_period)) as Box<dyn Indicator>),
            ("atr", Box::new(Atr::new(p.atr_period)) as Box<dyn Indicator>),
            (
                "volume_ma",
                Box::new(Sma::over(p.ma_short, SmaSource::Volume)) as Box<dyn Indicator>,
            ),
        ]
    }
}

impl Strategy for EnhancedMfi {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enrich<'a>(&self, bars: &'a [Bar]) -> Result<EnrichedBars<'a>, IndicatorError> {
        let indicators = self.indicators();
        if let Some((_, slowest)) = indicators.iter().max_by_key(|(_, i)| i.lookback()) {
            require_history(slowest.name(), slowest.lookback(), bars)?;
        }
        let mut frame = EnrichedBars::new(bars);
        for (column, indicator) in &indicators {
            frame.insert(*column, indicator.compute(bars));
        }
        let ratio = match frame.column("volume_ma") {
            Some(ma) => bars.iter().zip(ma).map(|(b, m)| b.volume / m).collect(),
            None => vec![f64::NAN; bars.len()],
        };
        frame.insert("volume_ratio", ratio);
        Ok(frame)
    }

    fn signal(
        &self,
        enriched: &EnrichedBars<'_>,
        index: usize,
        current: Position,
    ) -> Result<Position, InvalidSignalError> {
        let v = |c: &str| enriched.value(c, index);
        let (ma_short, ma_long) = (v("ma_short"), v("ma_long"));
        let uptrend = ma_short > ma_long;
        let downtrend = ma_short < ma_long;
        let strong_volume = v("volume_ratio") > STRONG_VOLUME_RATIO;
        let roc = v("roc");
        let positive_momentum = roc > 0.0;
        let negative_momentum = roc < 0.0;
        let mfi = v("mfi");
        let p = &self.params;

        Ok(match current {
            Position::Flat => {
                if mfi < p.mfi_lower && uptrend && positive_momentum && strong_volume {
                    Position::Long
                } else if mfi > p.mfi_upper && downtrend && negative_momentum && strong_volume {
                    Position::Short
                } else {
                    Position::Flat
                }
            }
            Position::Long => {
                if mfi > LONG_EXIT_MFI || !uptrend || !positive_momentum {
                    Position::Flat
                } else {
                    Position::Long
                }
            }
            Position::Short => {
                if mfi < SHORT_EXIT_MFI || !downtrend || !negative_momentum {
                    Position::Flat
                } else {
                    Position::Short
                }
            }
        })
    }

    fn stop_loss(&self, enriched: &EnrichedBars<'_>, index: usize, current: Position) -> bool {
        let Some(prev) = index.checked_sub(1) else {
            return false;
        };
        let (Some(bar), Some(prev_bar)) = (enriched.bar(index), enriched.bar(prev)) else {
            return false;
        };
        let distance = self.params.atr_multiplier * enriched.value("atr", prev);
        match current {
            Position::Long => bar.low < prev_bar.close - distance,
            Position::Short => bar.high > prev_bar.close + distance,
            Position::Flat => false,
        }
    }
}
