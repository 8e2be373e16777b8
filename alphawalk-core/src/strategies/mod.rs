//! Concrete strategies and the factory that builds them by name.

pub mod enhanced_mfi;
pub mod factory;
pub mod mfi_reversal;

pub use enhanced_mfi::{EnhancedMfi, EnhancedMfiParams};
pub use factory::{create_strategy, FactoryError, NamedStrategy, StrategyFactory, STRATEGY_NAMES};
pub use mfi_reversal::{MfiReversal, MfiReversalParams};
