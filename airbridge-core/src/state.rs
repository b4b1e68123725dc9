//! Per-accessory mutable state and its transitions.
//!
//! One accessory owns exactly one of these records and every mutation
//! funnels through the owning task, so the operations here are plain
//! synchronous methods with no interior locking.

use crate::cache::StalenessCache;
use crate::classifier::Classifier;
use crate::document::SensorDocument;
use crate::quality::AirQualityLevel;
use crate::readings::{Characteristic, Pollutant, PollutantReadings};

/// Value of one characteristic as handed to the host store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharacteristicValue {
    /// The overall air-quality level.
    Level(AirQualityLevel),
    /// A pollutant density in µg/m³. Unset readings surface as `0.0`, which
    /// is what the host protocol expects for "nothing measured".
    Density(f32),
}

impl CharacteristicValue {
    /// Numeric form on the host scale.
    pub fn as_f64(self) -> f64 {
        match self {
            CharacteristicValue::Level(level) => level.ordinal() as f64,
            CharacteristicValue::Density(density) => density as f64,
        }
    }
}

/// Raw readings, derived level, and fetch staleness for one accessory.
#[derive(Debug, Clone)]
pub struct AccessoryState {
    readings: PollutantReadings,
    level: AirQualityLevel,
    cache: StalenessCache,
}

impl AccessoryState {
    /// Fresh state: no readings, unknown level, never refreshed.
    pub fn new(cache: StalenessCache) -> Self {
        Self {
            readings: PollutantReadings::new(),
            level: AirQualityLevel::Unknown,
            cache,
        }
    }

    /// Staleness gate for fetch decisions.
    pub fn cache(&self) -> &StalenessCache {
        &self.cache
    }

    /// Mutable staleness gate, for marking refreshes.
    pub fn cache_mut(&mut self) -> &mut StalenessCache {
        &mut self.cache
    }

    /// Latest derived level.
    pub fn level(&self) -> AirQualityLevel {
        self.level
    }

    /// Latest raw readings.
    pub fn readings(&self) -> &PollutantReadings {
        &self.readings
    }

    /// Apply a bulk document: fields the document carried replace the stored
    /// readings, absent fields keep their previous value. The document's own
    /// pre-computed level wins when present; otherwise the classifier runs
    /// over the merged readings.
    pub fn apply_document(&mut self, document: &SensorDocument, classifier: &Classifier) {
        for pollutant in Pollutant::ALL {
            if let Some(value) = document.reading(pollutant) {
                self.readings.set(pollutant, Some(value));
            }
        }
        self.level = match document.level() {
            Some(level) => level,
            None => classifier.classify(&self.readings),
        };
    }

    /// Apply a single-pollutant update from a push notification, then
    /// reclassify over the updated field plus the retained ones. `None`
    /// clears the reading, which is how a malformed push degrades.
    pub fn apply_update(&mut self, pollutant: Pollutant, value: Option<f32>, classifier: &Classifier) {
        self.readings.set(pollutant, value);
        self.level = classifier.classify(&self.readings);
    }

    /// Adopt a pre-classified level delivered by a push notification.
    pub fn set_level(&mut self, level: AirQualityLevel) {
        self.level = level;
    }

    /// Current value of one characteristic.
    pub fn value_of(&self, characteristic: Characteristic) -> CharacteristicValue {
        match characteristic.pollutant() {
            None => CharacteristicValue::Level(self.level),
            Some(pollutant) => {
                CharacteristicValue::Density(self.readings.get(pollutant).unwrap_or(0.0))
            }
        }
    }
}
