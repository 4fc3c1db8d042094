//! Decoder for data formats 2 and 4 (payload carried in an Eddystone URL).

use super::{DecodeError, PayloadDecoder, signed_fraction};
use crate::reading::SensorData;

/// Humidity, temperature and pressure fit in six bytes; format 4 appends a
/// tag identifier byte that carries no sensor value.
const PAYLOAD_LEN: usize = 6;

/// Decoder for the URL-carried formats.
///
/// The payload is the base64-decoded URL fragment and always starts with the
/// format byte, so `offset` is ignored: the raw advertisement path passes
/// the same offset it uses for manufacturer data, but nothing precedes the
/// payload here.
pub struct DecodeFormat2And4;

impl PayloadDecoder for DecodeFormat2And4 {
    fn decode(&self, data: &[u8], _offset: usize) -> Result<SensorData, DecodeError> {
        if data.len() < PAYLOAD_LEN {
            return Err(DecodeError::Truncated {
                format: data.first().copied().unwrap_or_default(),
                needed: PAYLOAD_LEN,
                offset: 0,
                len: data.len(),
            });
        }

        let mut values = SensorData::new(data[0]);
        values.humidity = Some(f64::from(data[1]) * 0.5);
        values.temperature = Some(signed_fraction(data[2], data[3]));
        values.pressure = Some(f64::from(u16::from_be_bytes([data[4], data[5]])) + 50_000.0);
        Ok(values)
    }
}
