//! Host-runtime-facing surface: the characteristic store and static
//! accessory information.

use airbridge_core::{Characteristic, CharacteristicValue};

/// Write access to the host runtime's characteristic store.
///
/// The runtime implements this; the accessory pushes values into it after
/// polls and push updates. Host-initiated reads travel the other way,
/// through [`AccessoryHandle::get`](crate::AccessoryHandle::get).
pub trait CharacteristicStore: Send + Sync {
    /// Push a new value for one characteristic.
    fn update(&self, characteristic: Characteristic, value: CharacteristicValue);
}

/// Static registration details for the host's information service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    /// Manufacturer string.
    pub manufacturer: String,
    /// Model string.
    pub model: String,
    /// Serial number string.
    pub serial_number: String,
    /// Firmware revision reported to the host.
    pub firmware_revision: String,
}

impl Default for AccessoryInformation {
    fn default() -> Self {
        Self {
            manufacturer: "airbridge".to_string(),
            model: "HTTP Air Quality Sensor".to_string(),
            serial_number: "AQ-1".to_string(),
            firmware_revision: airbridge_core::VERSION.to_string(),
        }
    }
}
