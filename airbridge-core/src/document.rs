//! Bulk sensor documents fetched over HTTP.
//!
//! Sensors report a flat JSON object mapping pollutant keys to numbers (or
//! numeric strings), optionally with a pre-computed `air_quality` ordinal.
//! Parsing is lenient per field: one bad value must not discard the rest of
//! the document, so each field is coerced independently and a failure
//! surfaces as a log line plus an absent value.

use serde_json::Value;

use crate::errors::DocumentError;
use crate::quality::AirQualityLevel;
use crate::readings::{Pollutant, PollutantReadings};

/// Document key carrying a pre-computed overall level.
pub const LEVEL_KEY: &str = "air_quality";

/// Parsed bulk report from the sensor endpoint.
///
/// Fields the document did not carry (or carried malformed) are `None`;
/// applying the document to accessory state leaves those fields alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorDocument {
    level: Option<AirQualityLevel>,
    readings: PollutantReadings,
}

impl SensorDocument {
    /// Parse a response body.
    ///
    /// Fails only when the body is not a JSON object at all; field-level
    /// problems are logged and leave the field unset.
    pub fn parse(body: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(body)?;
        let fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(DocumentError::NotAnObject),
        };

        let mut document = SensorDocument::default();
        for pollutant in Pollutant::ALL {
            if let Some(raw) = fields.get(pollutant.key()) {
                match numeric(raw) {
                    Some(value) => document.readings.set(pollutant, Some(value)),
                    None => log::warn!("ignoring non-numeric '{}' field: {}", pollutant.key(), raw),
                }
            }
        }

        if let Some(raw) = fields.get(LEVEL_KEY) {
            document.level = match numeric(raw) {
                Some(value) if value.fract() == 0.0 && (0.0..=5.0).contains(&value) => {
                    AirQualityLevel::from_ordinal(value as u8)
                }
                _ => {
                    log::warn!("ignoring invalid '{LEVEL_KEY}' field: {raw}");
                    None
                }
            };
        }

        Ok(document)
    }

    /// Pre-computed overall level, when the document carried a valid one.
    pub fn level(&self) -> Option<AirQualityLevel> {
        self.level
    }

    /// Reading for one pollutant, when the document carried a usable one.
    pub fn reading(&self, pollutant: Pollutant) -> Option<f32> {
        self.readings.get(pollutant)
    }
}

/// Coerce a JSON field to a number: numbers pass through, strings are
/// trimmed and parsed, anything else is non-numeric. Non-finite values
/// (the literal `nan` a failing sensor reports, or a number past the
/// `f32` range) count as non-numeric too.
fn numeric(value: &Value) -> Option<f32> {
    let number = match value {
        Value::Number(number) => number.as_f64().map(|v| v as f32),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}
