//! Air-quality levels on the host accessory scale.

/// Overall air quality as exposed through the host's `AirQuality`
/// characteristic.
///
/// The numeric values are fixed by the accessory protocol: 0 means the level
/// is not known, 1 through 5 order from clean to polluted air. The ordering
/// of the variants follows the numeric scale, so `Poor > Fair` holds and the
/// worst of several levels can be taken with [`Ord::max`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum AirQualityLevel {
    /// No reading has exceeded the severity floor yet.
    Unknown = 0,
    /// Severity 0.
    Excellent = 1,
    /// Severity 1.
    Good = 2,
    /// Severity 2.
    Fair = 3,
    /// Severity 3.
    Inferior = 4,
    /// Severity 4, the ceiling.
    Poor = 5,
}

impl AirQualityLevel {
    /// Level for a severity index produced by the classifier.
    ///
    /// Indices at or above the last defined severity saturate to [`Poor`].
    ///
    /// [`Poor`]: AirQualityLevel::Poor
    pub const fn from_severity(index: usize) -> Self {
        match index {
            0 => AirQualityLevel::Excellent,
            1 => AirQualityLevel::Good,
            2 => AirQualityLevel::Fair,
            3 => AirQualityLevel::Inferior,
            _ => AirQualityLevel::Poor,
        }
    }

    /// Level for a raw ordinal as carried in sensor documents and
    /// notifications. Values outside `0..=5` have no meaning on the host
    /// scale.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(AirQualityLevel::Unknown),
            1 => Some(AirQualityLevel::Excellent),
            2 => Some(AirQualityLevel::Good),
            3 => Some(AirQualityLevel::Fair),
            4 => Some(AirQualityLevel::Inferior),
            5 => Some(AirQualityLevel::Poor),
            _ => None,
        }
    }

    /// Numeric value on the host scale.
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Human-readable name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            AirQualityLevel::Unknown => "Unknown",
            AirQualityLevel::Excellent => "Excellent",
            AirQualityLevel::Good => "Good",
            AirQualityLevel::Fair => "Fair",
            AirQualityLevel::Inferior => "Inferior",
            AirQualityLevel::Poor => "Poor",
        }
    }
}
