//! Core domain for airbridge
//!
//! ## Overview
//!
//! Everything needed to turn raw particulate readings (PM10, PM2.5) into the
//! host runtime's five-level air-quality scale, and to decide when a cached
//! result may be served instead of bothering the sensor again:
//!
//! - **Classification**: ascending breakpoint tables per pollutant, worst
//!   pollutant wins, strict comparisons at every breakpoint
//! - **Staleness**: TTL gate between host queries and sensor fetches, with
//!   always-refresh and cache-forever edge policies
//! - **Ingestion**: lenient bulk-document parsing and single-field push
//!   updates over one shared state record
//! - **Configuration**: the historical config-document shape, validated into
//!   typed settings
//!
//! This crate is synchronous and free of I/O. Transports live in
//! `airbridge-connectors`; the task that owns the state lives in
//! `airbridge-accessory`.
//!
//! ## Example
//!
//! ```
//! use airbridge_core::{AirQualityLevel, Classifier, Pollutant, PollutantReadings};
//!
//! let classifier = Classifier::default();
//! let mut readings = PollutantReadings::new();
//! readings.set(Pollutant::Pm10, Some(41.0));
//! readings.set(Pollutant::Pm25, Some(10.0));
//!
//! // The worse pollutant wins: PM10 at 41 µg/m³ is two breakpoints deep.
//! assert_eq!(classifier.classify(&readings), AirQualityLevel::Fair);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod classifier;
pub mod config;
pub mod document;
pub mod errors;
pub mod quality;
pub mod readings;
pub mod state;
pub mod thresholds;
pub mod time;

pub use cache::{CacheTtl, StalenessCache};
pub use classifier::Classifier;
pub use config::AccessoryConfig;
pub use document::SensorDocument;
pub use errors::{ConfigError, DocumentError};
pub use quality::AirQualityLevel;
pub use readings::{Characteristic, Pollutant, PollutantReadings};
pub use state::{AccessoryState, CharacteristicValue};

/// Crate version, surfaced to the host as the accessory's firmware revision.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
