//! Breakpoint tables separating the five severity levels.
//!
//! Each pollutant carries five ascending breakpoints in µg/m³. Breakpoint 0
//! is the severity floor: a reading must strictly exceed it to register at
//! all, which is what keeps a zero (or missing) reading classified as
//! unknown rather than excellent.

use crate::errors::ConfigError;
use crate::readings::Pollutant;

/// Number of severity levels, and therefore breakpoints, per pollutant.
pub const LEVEL_COUNT: usize = 5;

/// Default PM10 breakpoints in µg/m³.
pub const PM10_BREAKPOINTS: [f32; LEVEL_COUNT] = [0.0, 20.0, 40.0, 75.0, 100.0];

/// Default PM2.5 breakpoints in µg/m³.
pub const PM25_BREAKPOINTS: [f32; LEVEL_COUNT] = [0.0, 15.0, 30.0, 50.0, 70.0];

/// Ascending severity breakpoints for one pollutant.
///
/// Invariant: breakpoint 0 is `0.0` and the sequence never decreases.
/// [`new`](ThresholdTable::new) rejects tables that violate it, so a held
/// table is always safe to classify against.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    breakpoints: [f32; LEVEL_COUNT],
}

impl ThresholdTable {
    /// Validate and build a table for one pollutant.
    pub fn new(pollutant: Pollutant, breakpoints: [f32; LEVEL_COUNT]) -> Result<Self, ConfigError> {
        if breakpoints.iter().any(|b| !b.is_finite()) {
            return Err(ConfigError::InvalidThresholds {
                pollutant: pollutant.key(),
                reason: "breakpoints must be finite numbers",
            });
        }
        if breakpoints[0] != 0.0 {
            return Err(ConfigError::InvalidThresholds {
                pollutant: pollutant.key(),
                reason: "the first breakpoint must be 0",
            });
        }
        if breakpoints.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(ConfigError::InvalidThresholds {
                pollutant: pollutant.key(),
                reason: "breakpoints must not decrease",
            });
        }
        Ok(Self { breakpoints })
    }

    /// The breakpoints, ascending.
    pub fn breakpoints(&self) -> &[f32; LEVEL_COUNT] {
        &self.breakpoints
    }
}

/// Per-pollutant threshold tables for one accessory.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    tables: [ThresholdTable; Pollutant::ALL.len()],
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            tables: [
                ThresholdTable { breakpoints: PM10_BREAKPOINTS },
                ThresholdTable { breakpoints: PM25_BREAKPOINTS },
            ],
        }
    }
}

impl ThresholdSet {
    /// Table for one pollutant.
    pub fn table(&self, pollutant: Pollutant) -> &ThresholdTable {
        &self.tables[pollutant.index()]
    }

    /// Replace one pollutant's table, keeping the others.
    pub fn set_table(&mut self, pollutant: Pollutant, table: ThresholdTable) {
        self.tables[pollutant.index()] = table;
    }
}
