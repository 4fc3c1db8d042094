//! Decoded sensor reading types.

use crate::mac_address::MacAddress;

/// Sensor values decoded from one RuuviTag payload.
///
/// All values are in SI-leaning units:
/// - Temperature in Celsius
/// - Humidity in percent (0-100)
/// - Pressure in Pascals
/// - Acceleration in g (standard gravity)
/// - Battery voltage in Volts
/// - TX power in dBm
///
/// Fields a data format does not carry, or that the tag marks as
/// unavailable, are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorData {
    /// Protocol data format the values were decoded from (2, 3, 4 or 5).
    pub data_format: u8,
    /// Temperature in Celsius
    pub temperature: Option<f64>,
    /// Relative humidity in percent (0-100)
    pub humidity: Option<f64>,
    /// Atmospheric pressure in Pascals
    pub pressure: Option<f64>,
    /// Acceleration vector (x, y, z) in g
    pub acceleration: Option<(f64, f64, f64)>,
    /// Battery voltage in Volts
    pub battery: Option<f64>,
    /// TX power in dBm
    pub tx_power: Option<i8>,
    /// Movement counter
    pub movement_counter: Option<u32>,
    /// Measurement sequence number
    pub measurement_sequence: Option<u32>,
}

impl SensorData {
    /// An empty value set for the given data format; decoders fill in the
    /// fields their layout carries.
    pub(crate) fn new(data_format: u8) -> Self {
        SensorData {
            data_format,
            temperature: None,
            humidity: None,
            pressure: None,
            acceleration: None,
            battery: None,
            tx_power: None,
            movement_counter: None,
            measurement_sequence: None,
        }
    }
}

/// A reading recovered from one advertisement or beacon observation.
///
/// Only constructed after a format decoder succeeds; a failed or
/// inapplicable dispatch produces no reading at all, never a zeroed one.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Hardware address of the originating tag.
    pub mac: MacAddress,
    /// URL the payload was carried in, for the Eddystone URL formats.
    pub url: Option<String>,
    /// Received signal strength in dBm.
    pub rssi: i16,
    /// Decoded sensor values.
    pub data: SensorData,
}
