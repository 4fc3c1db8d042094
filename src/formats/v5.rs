//! Decoder for data format 5 (RAWv2 manufacturer-specific data).

use super::{DecodeError, PayloadDecoder};
use crate::reading::SensorData;

/// Bytes the format occupies starting at the version byte.
const PAYLOAD_LEN: usize = 24;

// "Not available" markers from the format description.
const INVALID_I16: i16 = i16::MIN;
const INVALID_U16: u16 = u16::MAX;
const INVALID_BATTERY: u16 = 2047;
const INVALID_TX_POWER: u16 = 31;

/// Format 5 layout. Each field has a dedicated "not available" marker that
/// maps to `None`; the trailing six bytes repeat the tag's own MAC address
/// and are not part of the reading.
pub struct DecodeFormat5;

impl PayloadDecoder for DecodeFormat5 {
    fn decode(&self, data: &[u8], offset: usize) -> Result<SensorData, DecodeError> {
        let payload = data
            .get(offset..offset + PAYLOAD_LEN)
            .ok_or(DecodeError::Truncated {
                format: 5,
                needed: PAYLOAD_LEN,
                offset,
                len: data.len(),
            })?;

        let mut values = SensorData::new(5);

        let temperature = i16::from_be_bytes([payload[1], payload[2]]);
        if temperature != INVALID_I16 {
            values.temperature = Some(f64::from(temperature) * 0.005);
        }

        let humidity = u16::from_be_bytes([payload[3], payload[4]]);
        if humidity != INVALID_U16 {
            values.humidity = Some(f64::from(humidity) * 0.0025);
        }

        let pressure = u16::from_be_bytes([payload[5], payload[6]]);
        if pressure != INVALID_U16 {
            values.pressure = Some(f64::from(pressure) + 50_000.0);
        }

        let x = i16::from_be_bytes([payload[7], payload[8]]);
        let y = i16::from_be_bytes([payload[9], payload[10]]);
        let z = i16::from_be_bytes([payload[11], payload[12]]);
        if x != INVALID_I16 && y != INVALID_I16 && z != INVALID_I16 {
            values.acceleration = Some((
                f64::from(x) / 1000.0,
                f64::from(y) / 1000.0,
                f64::from(z) / 1000.0,
            ));
        }

        // Battery voltage and TX power share a 16-bit word: 11 bits of
        // millivolts above 1.6 V, 5 bits of dBm in 2 dBm steps from -40.
        let power = u16::from_be_bytes([payload[13], payload[14]]);
        let battery = power >> 5;
        if battery != INVALID_BATTERY {
            values.battery = Some(f64::from(battery + 1600) / 1000.0);
        }
        let tx_power = power & 0x1F;
        if tx_power != INVALID_TX_POWER {
            values.tx_power = Some((tx_power as i8) * 2 - 40);
        }

        if payload[15] != u8::MAX {
            values.movement_counter = Some(u32::from(payload[15]));
        }

        let sequence = u16::from_be_bytes([payload[16], payload[17]]);
        if sequence != INVALID_U16 {
            values.measurement_sequence = Some(u32::from(sequence));
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vector from the published format description.
    const PAYLOAD: [u8; 24] = [
        0x05, // Format 5
        0x12, 0xFC, // Temperature: 24.30 C
        0x53, 0x94, // Humidity: 53.49 %
        0xC3, 0x7C, // Pressure: 100044 Pa
        0x00, 0x04, // Acceleration X: 4 mg
        0xFF, 0xFC, // Acceleration Y: -4 mg
        0x04, 0x0C, // Acceleration Z: 1036 mg
        0xAC, 0x36, // Battery: 2977 mV, TX power: 4 dBm
        0x42, // Movement counter: 66
        0x00, 0xCD, // Sequence: 205
        0xCB, 0xB8, 0x33, 0x4C, 0x88, 0x4F, // Tag's own MAC, ignored
    ];

    #[test]
    fn test_decode_reference_vector() {
        let values = DecodeFormat5.decode(&PAYLOAD, 0).unwrap();
        assert_eq!(values.data_format, 5);
        assert!((values.temperature.unwrap() - 24.3).abs() < 1e-9);
        assert!((values.humidity.unwrap() - 53.49).abs() < 1e-9);
        assert_eq!(values.pressure, Some(100_044.0));
        let (x, y, z) = values.acceleration.unwrap();
        assert!((x - 0.004).abs() < 1e-9);
        assert!((y + 0.004).abs() < 1e-9);
        assert!((z - 1.036).abs() < 1e-9);
        assert!((values.battery.unwrap() - 2.977).abs() < 1e-9);
        assert_eq!(values.tx_power, Some(4));
        assert_eq!(values.movement_counter, Some(66));
        assert_eq!(values.measurement_sequence, Some(205));
    }

    #[test]
    fn test_decode_at_raw_buffer_offset() {
        let mut raw = vec![0u8; 7];
        raw.extend_from_slice(&PAYLOAD);
        let values = DecodeFormat5.decode(&raw, 7).unwrap();
        assert_eq!(values.movement_counter, Some(66));
    }

    #[test]
    fn test_decode_not_available_markers() {
        let payload: [u8; 24] = [
            0x05, 0x80, 0x00, // temperature n/a
            0xFF, 0xFF, // humidity n/a
            0xFF, 0xFF, // pressure n/a
            0x80, 0x00, 0x80, 0x00, 0x80, 0x00, // acceleration n/a
            0xFF, 0xFF, // battery + tx power n/a
            0xFF, // movement counter n/a
            0xFF, 0xFF, // sequence n/a
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        ];
        let values = DecodeFormat5.decode(&payload, 0).unwrap();
        assert_eq!(values.temperature, None);
        assert_eq!(values.humidity, None);
        assert_eq!(values.pressure, None);
        assert_eq!(values.acceleration, None);
        assert_eq!(values.battery, None);
        assert_eq!(values.tx_power, None);
        assert_eq!(values.movement_counter, None);
        assert_eq!(values.measurement_sequence, None);
    }

    #[test]
    fn test_decode_one_invalid_axis_drops_acceleration() {
        let mut payload = PAYLOAD;
        payload[9] = 0x80;
        payload[10] = 0x00;
        let values = DecodeFormat5.decode(&payload, 0).unwrap();
        assert_eq!(values.acceleration, None);
        assert!(values.temperature.is_some());
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            DecodeFormat5.decode(&PAYLOAD[..20], 0),
            Err(DecodeError::Truncated { format: 5, .. })
        ));
        assert!(DecodeFormat5.decode(&[], 0).is_err());
    }
}
