//! MFI reversal on a low-pass-filtered close.
//!
//! From Flat: MFI below `mfi_lower` opens Short, above `mfi_upper` opens Long.
//! Short closes once MFI rises above `mfi_middle_upper`; Long closes once it
//! falls below `mfi_middle_lower`.

use serde::Serialize;

use crate::domain::{Bar, Position};
use crate::error::{IndicatorError, InvalidSignalError, ParamError};
use crate::indicators::lowpass::lowpass_filter;
use crate::indicators::{Indicator, Mfi};
use crate::params::ParamSet;
use crate::strategy::{require_history, EnrichedBars, Strategy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MfiReversalParams {
    pub mfi_period: usize,
    pub mfi_upper: f64,
    pub mfi_lower: f64,
    pub mfi_middle_upper: f64,
    pub mfi_middle_lower: f64,
    pub lowpass_filter_ratio: f64,
}

impl Default for MfiReversalParams {
    fn default() -> Self {
        Self {
            mfi_period: 14,
            mfi_upper: 80.0,
            mfi_lower: 20.0,
            mfi_middle_upper: 60.0,
            mfi_middle_lower: 40.0,
            lowpass_filter_ratio: 0.75,
        }
    }
}

impl MfiReversalParams {
    pub const NAMES: &'static [&'static str] = &[
        "mfi_period",
        "mfi_upper",
        "mfi_lower",
        "mfi_middle_upper",
        "mfi_middle_lower",
        "lowpass_filter_ratio",
    ];

    /// Resolve from a parameter set; absent names take their defaults.
    pub fn from_params(params: &ParamSet) -> Result<Self, ParamError> {
        params.reject_unknown(MfiReversal::NAME, Self::NAMES)?;
        let d = Self::default();
        let resolved = Self {
            mfi_period: params.usize_or("mfi_period", d.mfi_period)?,
            mfi_upper: params.f64_or("mfi_upper", d.mfi_upper)?,
            mfi_lower: params.f64_or("mfi_lower", d.mfi_lower)?,
            mfi_middle_upper: params.f64_or("mfi_middle_upper", d.mfi_middle_upper)?,
            mfi_middle_lower: params.f64_or("mfi_middle_lower", d.mfi_middle_lower)?,
            lowpass_filter_ratio: params.f64_or("lowpass_filter_ratio", d.lowpass_filter_ratio)?,
        };
        if resolved.mfi_period == 0 {
            return Err(ParamError::OutOfRange {
                name: "mfi_period".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !(resolved.lowpass_filter_ratio > 0.0 && resolved.lowpass_filter_ratio < 1.0) {
            return Err(ParamError::OutOfRange {
                name: "lowpass_filter_ratio".into(),
                reason: format!("{} is not in (0, 1)", resolved.lowpass_filter_ratio),
            });
        }
        Ok(resolved)
    }
}

#[derive(Debug, Clone)]
pub struct MfiReversal {
    params: MfiReversalParams,
    mfi: Mfi,
}

impl MfiReversal {
    pub const NAME: &'static str = "mfi_reversal";

    pub fn new(params: MfiReversalParams) -> Self {
        let mfi = Mfi::new(params.mfi_period);
        Self { params, mfi }
    }

    pub fn params(&self) -> &MfiReversalParams {
        &self.params
    }
}

impl Strategy for MfiReversal {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enrich<'a>(&self, bars: &'a [Bar]) -> Result<EnrichedBars<'a>, IndicatorError> {
        require_history(self.mfi.name(), self.params.mfi_period, bars)?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let filtered = lowpass_filter(&closes, self.params.lowpass_filter_ratio);
        let mfi = self.mfi.compute_with_close(bars, &filtered);
        Ok(EnrichedBars::new(bars)
            .with_column("close_filtered", filtered)
            .with_column("mfi", mfi))
    }

    fn signal(
        &self,
        enriched: &EnrichedBars<'_>,
        index: usize,
        current: Position,
    ) -> Result<Position, InvalidSignalError> {
        let mfi = enriched.value("mfi", index);
        let p = &self.params;
        Ok(match current {
            Position::Flat if mfi < p.mfi_lower => Position::Short,
            Position::Flat if mfi > p.mfi_upper => Position::Long,
            Position::Short if mfi > p.mfi_middle_upper => Position::Flat,
            Position::Long if mfi < p.mfi_middle_lower => Position::Flat,
            held => held,
        })
    }
}
