//! Decoder for data format 3 (RAWv1 manufacturer-specific data).

use super::{DecodeError, PayloadDecoder, signed_fraction};
use crate::reading::SensorData;

/// Bytes the format occupies starting at the version byte.
const PAYLOAD_LEN: usize = 14;

/// Format 3 layout: humidity, signed temperature with 1/100 fraction,
/// pressure with a 50 kPa bias, three acceleration axes in milli-g and the
/// battery voltage in millivolts. Every field is always present.
pub struct DecodeFormat3;

impl PayloadDecoder for DecodeFormat3 {
    fn decode(&self, data: &[u8], offset: usize) -> Result<SensorData, DecodeError> {
        let payload = data
            .get(offset..offset + PAYLOAD_LEN)
            .ok_or(DecodeError::Truncated {
                format: 3,
                needed: PAYLOAD_LEN,
                offset,
                len: data.len(),
            })?;

        let mut values = SensorData::new(3);
        values.humidity = Some(f64::from(payload[1]) * 0.5);
        values.temperature = Some(signed_fraction(payload[2], payload[3]));
        values.pressure = Some(f64::from(u16::from_be_bytes([payload[4], payload[5]])) + 50_000.0);
        values.acceleration = Some((
            milli_g(payload[6], payload[7]),
            milli_g(payload[8], payload[9]),
            milli_g(payload[10], payload[11]),
        ));
        values.battery = Some(f64::from(u16::from_be_bytes([payload[12], payload[13]])) / 1000.0);
        Ok(values)
    }
}

/// Signed 16-bit big-endian milli-g value, scaled to g.
fn milli_g(hi: u8, lo: u8) -> f64 {
    f64::from(i16::from_be_bytes([hi, lo])) / 1000.0
}
