//! Factory: strategy name + `ParamSet` into a runtime trait object.
//!
//! The walk-forward and search loops build a fresh strategy per trial through a
//! `StrategyFactory`, so each evaluation owns its strategy exclusively.

use crate::error::ParamError;
use crate::params::ParamSet;
use crate::strategy::Strategy;

use super::enhanced_mfi::{EnhancedMfi, EnhancedMfiParams};
use super::mfi_reversal::{MfiReversal, MfiReversalParams};

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FactoryError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error(transparent)]
    Params(#[from] ParamError),
}

/// Names accepted by `create_strategy`.
pub const STRATEGY_NAMES: &[&str] = &[MfiReversal::NAME, EnhancedMfi::NAME];

// ─── Construction ────────────────────────────────────────────────────

pub fn create_strategy(name: &str, params: &ParamSet) -> Result<Box<dyn Strategy>, FactoryError> {
    match name {
        MfiReversal::NAME => Ok(Box::new(MfiReversal::new(MfiReversalParams::from_params(
            params,
        )?))),
        EnhancedMfi::NAME => Ok(Box::new(EnhancedMfi::new(EnhancedMfiParams::from_params(
            params,
        )?))),
        other => Err(FactoryError::UnknownStrategy(other.to_string())),
    }
}

/// Builds a strategy instance from one parameter assignment.
pub trait StrategyFactory: Send + Sync {
    fn build(&self, params: &ParamSet) -> Result<Box<dyn Strategy>, FactoryError>;
}

impl<F> StrategyFactory for F
where
    F: Fn(&ParamSet) -> Result<Box<dyn Strategy>, FactoryError> + Send + Sync,
{
    fn build(&self, params: &ParamSet) -> Result<Box<dyn Strategy>, FactoryError> {
        self(params)
    }
}

/// Factory for one of the built-in strategies, checked by name up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStrategy {
    name: String,
}

impl NamedStrategy {
    pub fn new(name: impl Into<String>) -> Result<Self, FactoryError> {
        let name = name.into();
        if STRATEGY_NAMES.contains(&name.as_str()) {
            Ok(Self { name })
        } else {
            Err(FactoryError::UnknownStrategy(name))
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl StrategyFactory for NamedStrategy {
    fn build(&self, params: &ParamSet) -> Result<Box<dyn Strategy>, FactoryError> {
        create_strategy(&self.name, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    #[test]
    fn creates_every_named_strategy_with_defaults() {
        for name in STRATEGY_NAMES {
            let s = create_strategy(name, &ParamSet::new()).unwrap();
            assert_eq!(s.name(), *name);
        }
    }

    #[test]
    fn unknown_strategy_is_error() {
        assert_eq!(
            create_strategy("rsi_magic", &ParamSet::new()).err(),
            Some(FactoryError::UnknownStrategy("rsi_magic".into()))
        );
        assert!(NamedStrategy::new("rsi_magic").is_err());
    }

    #[test]
    fn unknown_parameter_is_error() {
        let params = ParamSet::new().with("atr_multiplier", ParamValue::Float(2.0));
        let err = create_strategy("mfi_reversal", &params).err().unwrap();
        assert!(matches!(err, FactoryError::Params(ParamError::Unknown { .. })));
    }

    #[test]
    fn closures_are_factories() {
        let factory = |p: &ParamSet| create_strategy("enhanced_mfi", p);
        let built = factory.build(&ParamSet::new()).unwrap();
        assert_eq!(built.name(), "enhanced_mfi");
    }

    #[test]
    fn named_factory_builds() {
        let f = NamedStrategy::new("mfi_reversal").unwrap();
        let params = ParamSet::new().with("mfi_period", ParamValue::Int(7));
        assert_eq!(f.build(&params).unwrap().name(), "mfi_reversal");
    }
}
