//! AlphaWalk Core — bars, positions, strategies and the position simulator.
//!
//! This crate contains everything a single backtest run needs:
//! - Domain types (bars, validated bar series, expiration calendar, positions)
//! - Parameter model shared by direct construction and trial sampling
//! - Indicators and the `Strategy` trait with its concrete implementations
//! - The position simulator with forced session-close and expiration exits
//! - A deterministic RNG hierarchy for seeding searches

pub mod domain;
pub mod error;
pub mod indicators;
pub mod params;
pub mod rng;
pub mod simulator;
pub mod strategies;
pub mod strategy;

pub use domain::{Bar, BarSeries, ExpirationCalendar, Position, PositionSeries};
pub use error::{DataIntegrityError, IndicatorError, InvalidSignalError, ParamError, SimulationError};
pub use params::{ParamRange, ParamSet, ParamValue, ParameterSpec, SpecError};
pub use simulator::{ExitRule, ForcedExit, SessionRules, Simulation, Simulator};
pub use strategy::{EnrichedBars, Strategy};
