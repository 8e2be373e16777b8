//! Train/test split of a bar series.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use alphawalk_core::domain::{Bar, BarSeries};

use crate::config::ConfigError;
use crate::data_loader::parse_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMethod {
    /// Train on bars before `split_at`, test on bars at or after it.
    Sequence { split_at: NaiveDateTime },
}

impl SplitMethod {
    pub const SEQUENCE: &'static str = "sequence";

    /// Build from a method name and its string arguments.
    pub fn from_args(method: &str, args: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        match method {
            Self::SEQUENCE => {
                let raw = args
                    .get("split_date")
                    .ok_or_else(|| ConfigError::MissingSplitArgument {
                        method: method.to_string(),
                        argument: "split_date".to_string(),
                    })?;
                let split_at =
                    parse_timestamp(raw).ok_or_else(|| ConfigError::InvalidValue {
                        field: "split.args.split_date",
                        reason: format!("unparseable timestamp '{raw}'"),
                    })?;
                Ok(SplitMethod::Sequence { split_at })
            }
            other => Err(ConfigError::UnknownSplitMethod(other.to_string())),
        }
    }

    /// Split `series`; either side may be empty (`None`).
    pub fn split<'s>(&self, series: &'s BarSeries) -> (Option<&'s [Bar]>, Option<&'s [Bar]>) {
        match self {
            SplitMethod::Sequence { split_at } => series.split_at_time(*split_at),
        }
    }
}
