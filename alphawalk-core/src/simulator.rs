//! Position simulator — the per-bar state machine.
//!
//! For each bar `i` from 1 to `len - 1`:
//! 1. a firing stop-loss forces Flat and skips the signal,
//! 2. otherwise the strategy's signal is the candidate position,
//! 3. Short at the short-exit cutoff time becomes Flat,
//! 4. any exposure at the expiration cutoff on an expiration date becomes Flat.
//!
//! Index 0 is always Flat. Nothing closes the position after the last bar:
//! a series that ends mid-position reports it as held.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, ExpirationCalendar, Position, PositionSeries};
use crate::error::SimulationError;
use crate::strategy::Strategy;

/// Wall-clock cutoffs for the forced exits, matched exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRules {
    pub short_exit_cutoff: NaiveTime,
    pub expiration_cutoff: NaiveTime,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            short_exit_cutoff: NaiveTime::from_hms_opt(14, 25, 0).unwrap_or_default(),
            expiration_cutoff: NaiveTime::from_hms_opt(14, 45, 0).unwrap_or_default(),
        }
    }
}

/// Which rule overrode the strategy at a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    StopLoss,
    ShortSessionClose,
    Expiration,
}

/// A bar where a rule replaced a non-flat position with Flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedExit {
    pub index: usize,
    pub rule: ExitRule,
    /// Position that would have been held without the rule.
    pub overridden: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub positions: PositionSeries,
    pub forced_exits: Vec<ForcedExit>,
}

/// Shares the calendar read-only; one simulator serves any number of runs.
#[derive(Debug, Clone, Copy)]
pub struct Simulator<'c> {
    rules: SessionRules,
    calendar: &'c ExpirationCalendar,
}

impl<'c> Simulator<'c> {
    pub fn new(rules: SessionRules, calendar: &'c ExpirationCalendar) -> Self {
        Self { rules, calendar }
    }

    pub fn rules(&self) -> &SessionRules {
        &self.rules
    }

    pub fn calendar(&self) -> &'c ExpirationCalendar {
        self.calendar
    }

    /// Run `strategy` over `bars`. Sequential: position `i` depends on `i - 1`.
    pub fn simulate(
        &self,
        strategy: &dyn Strategy,
        bars: &[Bar],
    ) -> Result<Simulation, SimulationError> {
        if bars.is_empty() {
            return Err(SimulationError::EmptySeries);
        }
        let enriched = strategy.enrich(bars)?;
        if enriched.len() != bars.len() {
            return Err(SimulationError::RowCountChanged {
                bars: bars.len(),
                enriched: enriched.len(),
            });
        }
        if let Some((_, len)) = enriched.misaligned_column() {
            return Err(SimulationError::RowCountChanged {
                bars: bars.len(),
                enriched: len,
            });
        }

        let mut positions = Vec::with_capacity(bars.len());
        positions.push(Position::Flat);
        let mut forced_exits = Vec::new();
        let mut current = Position::Flat;

        for (index, bar) in bars.iter().enumerate().skip(1) {
            let mut next = if strategy.stop_loss(&enriched, index, current) {
                if !current.is_flat() {
                    forced_exits.push(ForcedExit {
                        index,
                        rule: ExitRule::StopLoss,
                        overridden: current,
                    });
                }
                Position::Flat
            } else {
                strategy
                    .signal(&enriched, index, current)
                    .map_err(|source| SimulationError::InvalidSignal { index, source })?
            };

            let time = bar.time();
            if time == self.rules.short_exit_cutoff && next == Position::Short {
                forced_exits.push(ForcedExit {
                    index,
                    rule: ExitRule::ShortSessionClose,
                    overridden: next,
                });
                next = Position::Flat;
            }
            if time == self.rules.expiration_cutoff
                && !next.is_flat()
                && self.calendar.contains(bar.date())
            {
                forced_exits.push(ForcedExit {
                    index,
                    rule: ExitRule::Expiration,
                    overridden: next,
                });
                next = Position::Flat;
            }

            positions.push(next);
            current = next;
        }

        let positions = PositionSeries::new(positions);
        tracing::trace!(
            strategy = strategy.name(),
            bars = bars.len(),
            changes = positions.changes(),
            forced_exits = forced_exits.len(),
            "simulation complete"
        );
        Ok(Simulation {
            positions,
            forced_exits,
        })
    }
}
