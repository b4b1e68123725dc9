//! Tracked pollutants, host characteristics, and the per-accessory reading
//! record.

/// Particulate species tracked by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pollutant {
    /// Coarse particulate matter, up to 10 µm.
    Pm10,
    /// Fine particulate matter, up to 2.5 µm.
    Pm25,
}

impl Pollutant {
    /// All tracked pollutants, in sensor-document order.
    pub const ALL: [Pollutant; 2] = [Pollutant::Pm10, Pollutant::Pm25];

    /// Key naming this pollutant in sensor documents and configuration.
    pub const fn key(self) -> &'static str {
        match self {
            Pollutant::Pm10 => "pm10",
            Pollutant::Pm25 => "pm25",
        }
    }

    /// Unit the sensor reports concentrations in.
    pub const fn unit(self) -> &'static str {
        "µg/m³"
    }

    /// Host characteristic carrying this pollutant's density.
    pub const fn characteristic(self) -> Characteristic {
        match self {
            Pollutant::Pm10 => Characteristic::Pm10Density,
            Pollutant::Pm25 => Characteristic::Pm25Density,
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Independently addressable properties this accessory exposes to the host
/// runtime.
///
/// The wire names returned by [`name`](Characteristic::name) are the host
/// protocol's identifiers; push notifications and MQTT subscriptions address
/// characteristics by these strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Overall air-quality level.
    AirQuality,
    /// PM10 concentration in µg/m³.
    Pm10Density,
    /// PM2.5 concentration in µg/m³.
    Pm25Density,
}

impl Characteristic {
    /// All exposed characteristics.
    pub const ALL: [Characteristic; 3] = [
        Characteristic::AirQuality,
        Characteristic::Pm10Density,
        Characteristic::Pm25Density,
    ];

    /// Host protocol name.
    pub const fn name(self) -> &'static str {
        match self {
            Characteristic::AirQuality => "AirQuality",
            Characteristic::Pm10Density => "PM10Density",
            Characteristic::Pm25Density => "PM2_5Density",
        }
    }

    /// Resolve a host protocol name; unknown names belong to services this
    /// accessory does not implement.
    pub fn from_name(name: &str) -> Option<Self> {
        Characteristic::ALL.into_iter().find(|c| c.name() == name)
    }

    /// The pollutant behind this characteristic, if it carries one.
    pub const fn pollutant(self) -> Option<Pollutant> {
        match self {
            Characteristic::AirQuality => None,
            Characteristic::Pm10Density => Some(Pollutant::Pm10),
            Characteristic::Pm25Density => Some(Pollutant::Pm25),
        }
    }
}

/// Latest raw readings for one accessory.
///
/// `None` means "no usable reading": either nothing has arrived for the
/// pollutant yet, or the last update for it was malformed. It is distinct
/// from a measured `0.0` and contributes nothing to classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollutantReadings {
    values: [Option<f32>; Pollutant::ALL.len()],
}

impl PollutantReadings {
    /// Record with no readings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current reading for one pollutant.
    pub fn get(&self, pollutant: Pollutant) -> Option<f32> {
        self.values[pollutant.index()]
    }

    /// Store or clear one pollutant's reading.
    pub fn set(&mut self, pollutant: Pollutant, value: Option<f32>) {
        self.values[pollutant.index()] = value;
    }

    /// Iterate `(pollutant, reading)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, Option<f32>)> + '_ {
        Pollutant::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}
