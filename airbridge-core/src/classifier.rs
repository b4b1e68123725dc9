//! Threshold-based air-quality classification.
//!
//! ## Overview
//!
//! The classifier maps raw pollutant concentrations to the host's five-level
//! scale. For each pollutant the severity index is the highest breakpoint the
//! reading strictly exceeds; the worst pollutant determines the overall
//! level. A reading at or below the severity floor contributes nothing, so an
//! accessory with no measurable pollution (or no readings at all) reports
//! [`AirQualityLevel::Unknown`] instead of a fabricated level.

use crate::quality::AirQualityLevel;
use crate::readings::PollutantReadings;
use crate::thresholds::{ThresholdSet, ThresholdTable};

/// Maps pollutant readings to an overall air-quality level.
///
/// Stateless apart from its threshold tables; classification never mutates
/// anything, so one classifier serves an accessory for its whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    thresholds: ThresholdSet,
}

impl Classifier {
    /// Classifier over the given per-pollutant tables.
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self { thresholds }
    }

    /// The tables in use.
    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Severity of one reading against one table: the index of the highest
    /// breakpoint the reading strictly exceeds.
    ///
    /// `None` when the reading exceeds no breakpoint. NaN compares false
    /// against every breakpoint and therefore lands here too.
    fn severity(value: f32, table: &ThresholdTable) -> Option<usize> {
        table
            .breakpoints()
            .iter()
            .enumerate()
            .filter(|(_, limit)| value > **limit)
            .map(|(index, _)| index)
            .last()
    }

    /// Overall level for the current readings.
    ///
    /// Takes the elementwise maximum of the per-pollutant severities;
    /// pollutants with no reading (or a reading below the floor) are
    /// skipped. [`AirQualityLevel::Unknown`] when nothing contributes.
    pub fn classify(&self, readings: &PollutantReadings) -> AirQualityLevel {
        let mut worst: Option<usize> = None;
        for (pollutant, reading) in readings.iter() {
            if let Some(value) = reading {
                if let Some(severity) = Self::severity(value, self.thresholds.table(pollutant)) {
                    worst = Some(worst.map_or(severity, |current| current.max(severity)));
                }
            }
        }
        match worst {
            Some(index) => AirQualityLevel::from_severity(index),
            None => AirQualityLevel::Unknown,
        }
    }
}
