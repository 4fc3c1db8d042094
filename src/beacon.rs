//! Adapter for observations delivered as parsed beacons.
//!
//! Some scan sources hand over a beacon abstraction (type code, service
//! UUID, identifier blob, numeric data fields) instead of the raw
//! advertisement bytes. This module maps that shape back onto the same
//! payload decoders the advertisement path uses.

use crate::base64;
use crate::dispatch::{DispatchError, URL_PREFIX_LONG};
use crate::eddystone::{self, EDDYSTONE_SERVICE_UUID, FRAME_TYPE_URL};
use crate::formats::{self, PayloadDecoder, url::DecodeFormat2And4};
use crate::mac_address::MacAddress;
use crate::reading::SensorReading;

/// Fixed scratch buffer size for reassembled beacon data fields.
const BEACON_BUFFER_LEN: usize = 128;

/// A beacon-shaped observation, as produced by scan libraries that parse
/// advertisements themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconObservation {
    /// Hardware address of the transmitting device.
    pub address: MacAddress,
    /// Beacon layout type code.
    pub type_code: u32,
    /// 16-bit service UUID, when the layout carried one.
    pub service_uuid: Option<u16>,
    /// First identifier blob; holds the compressed URL for Eddystone URL
    /// beacons.
    pub id1: Option<Vec<u8>>,
    /// Numeric data fields; only the low byte of each is meaningful here.
    pub data_fields: Vec<u64>,
    /// Received signal strength in dBm.
    pub rssi: i16,
}

impl BeaconObservation {
    /// Format discriminant: the low byte of the first data field when any
    /// fields are present, the beacon type code otherwise.
    fn format(&self) -> u32 {
        match self.data_fields.first() {
            Some(&field) => u32::from(field as u8),
            None => self.type_code,
        }
    }

    /// Pack the data fields' low bytes into a decoder-ready buffer.
    fn fill_buffer(&self, buffer: &mut [u8; BEACON_BUFFER_LEN]) {
        for (slot, &field) in buffer.iter_mut().zip(&self.data_fields) {
            *slot = field as u8;
        }
    }
}

/// Parse one beacon observation into at most one sensor reading.
///
/// The fail-soft contract matches [`crate::dispatch::parse_advertisement`]:
/// recovered failures go to the log and the caller only sees `None`.
pub fn parse_beacon(observation: &BeaconObservation) -> Option<SensorReading> {
    let (reading, diagnostics) = parse_beacon_with_diagnostics(observation);
    for diagnostic in &diagnostics {
        log::debug!("{}: {diagnostic}", observation.address);
    }
    reading
}

/// As [`parse_beacon`], but hands back the failures recovered along the way
/// instead of logging them.
pub fn parse_beacon_with_diagnostics(
    observation: &BeaconObservation,
) -> (Option<SensorReading>, Vec<DispatchError>) {
    let mut diagnostics = Vec::new();

    if observation.data_fields.len() > BEACON_BUFFER_LEN {
        diagnostics.push(DispatchError::OversizedBeacon(observation.data_fields.len()));
        return (None, diagnostics);
    }

    let format = observation.format();
    let result = if format == u32::from(FRAME_TYPE_URL) {
        url_reading(observation, &mut diagnostics)
    } else {
        raw_reading(observation, format, &mut diagnostics)
    };
    (result, diagnostics)
}

/// Eddystone URL beacon: the first identifier blob is the compressed URL.
fn url_reading(
    observation: &BeaconObservation,
    diagnostics: &mut Vec<DispatchError>,
) -> Option<SensorReading> {
    if observation.service_uuid != Some(EDDYSTONE_SERVICE_UUID) {
        return None;
    }
    let id1 = observation.id1.as_deref()?;
    let url = match eddystone::uncompress(id1) {
        Ok(url) => url,
        Err(error) => {
            diagnostics.push(error.into());
            return None;
        }
    };
    if !url.contains(URL_PREFIX_LONG) {
        return None;
    }
    let (_, fragment) = url.split_once('#')?;
    let payload = base64::decode(fragment);
    decode_into_reading(observation, &DecodeFormat2And4, &payload, Some(url), diagnostics)
}

/// Raw-format beacon: the data fields are the manufacturer payload bytes,
/// starting with the protocol-version byte.
fn raw_reading(
    observation: &BeaconObservation,
    format: u32,
    diagnostics: &mut Vec<DispatchError>,
) -> Option<SensorReading> {
    let decoder = u8::try_from(format).ok().and_then(formats::decoder_for)?;
    let mut buffer = [0u8; BEACON_BUFFER_LEN];
    observation.fill_buffer(&mut buffer);
    decode_into_reading(observation, decoder, &buffer, None, diagnostics)
}

fn decode_into_reading(
    observation: &BeaconObservation,
    decoder: &dyn PayloadDecoder,
    payload: &[u8],
    url: Option<String>,
    diagnostics: &mut Vec<DispatchError>,
) -> Option<SensorReading> {
    match decoder.decode(payload, 0) {
        Ok(data) => Some(SensorReading {
            mac: observation.address,
            url,
            rssi: observation.rssi,
            data,
        }),
        Err(error) => {
            diagnostics.push(error.into());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::DecodeError;
    use crate::test_utils::{TEST_MAC, V3_PAYLOAD, V5_PAYLOAD, compressed_url, ruu_vi_url};

    fn raw_beacon(payload: &[u8]) -> BeaconObservation {
        BeaconObservation {
            address: TEST_MAC,
            type_code: 0xBEAC,
            service_uuid: None,
            id1: None,
            data_fields: payload.iter().map(|&b| u64::from(b)).collect(),
            rssi: -70,
        }
    }

    fn url_beacon(url: &str) -> BeaconObservation {
        BeaconObservation {
            address: TEST_MAC,
            type_code: 0x10,
            service_uuid: Some(EDDYSTONE_SERVICE_UUID),
            id1: Some(compressed_url(url)),
            data_fields: Vec::new(),
            rssi: -70,
        }
    }

    #[test]
    fn test_raw_beacon_decodes_format_3() {
        let reading = parse_beacon(&raw_beacon(&V3_PAYLOAD)).unwrap();
        assert_eq!(reading.data.data_format, 3);
        assert_eq!(reading.data.humidity, Some(20.5));
        assert_eq!(reading.mac, TEST_MAC);
        assert_eq!(reading.rssi, -70);
        assert_eq!(reading.url, None);
    }

    #[test]
    fn test_raw_beacon_decodes_format_5() {
        let reading = parse_beacon(&raw_beacon(&V5_PAYLOAD)).unwrap();
        assert_eq!(reading.data.data_format, 5);
        assert_eq!(reading.data.movement_counter, Some(66));
    }

    #[test]
    fn test_type_code_is_discriminant_without_data_fields() {
        // No data fields: the type code selects the decoder, which then
        // runs over the zeroed scratch buffer.
        let observation = BeaconObservation {
            address: TEST_MAC,
            type_code: 3,
            service_uuid: None,
            id1: None,
            data_fields: Vec::new(),
            rssi: -70,
        };
        let reading = parse_beacon(&observation).unwrap();
        assert_eq!(reading.data.data_format, 3);
        assert_eq!(reading.data.humidity, Some(0.0));
    }

    #[test]
    fn test_discriminant_prefers_first_data_field() {
        // Type code says Eddystone URL, but the data fields start with a
        // format 3 version byte, and that wins.
        let mut observation = raw_beacon(&V3_PAYLOAD);
        observation.type_code = 0x10;
        let reading = parse_beacon(&observation).unwrap();
        assert_eq!(reading.data.data_format, 3);
    }

    #[test]
    fn test_high_bytes_of_data_fields_are_ignored() {
        let mut observation = raw_beacon(&V3_PAYLOAD);
        for field in observation.data_fields.iter_mut() {
            *field |= 0xABCD_0000_0000_0100;
        }
        let reading = parse_beacon(&observation).unwrap();
        assert_eq!(reading.data.humidity, Some(20.5));
    }

    #[test]
    fn test_url_beacon_decodes_format_4() {
        let url = ruu_vi_url();
        let reading = parse_beacon(&url_beacon(&url)).unwrap();
        assert_eq!(reading.data.data_format, 4);
        assert_eq!(reading.url, Some(url));
        assert_eq!(reading.data.humidity, Some(20.5));
    }

    #[test]
    fn test_url_beacon_requires_eddystone_service_uuid() {
        let mut observation = url_beacon(&ruu_vi_url());
        observation.service_uuid = Some(0x180F);
        assert_eq!(parse_beacon(&observation), None);
        observation.service_uuid = None;
        assert_eq!(parse_beacon(&observation), None);
    }

    #[test]
    fn test_url_beacon_requires_identifier() {
        let mut observation = url_beacon(&ruu_vi_url());
        observation.id1 = None;
        let (reading, diagnostics) = parse_beacon_with_diagnostics(&observation);
        assert_eq!(reading, None);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_url_beacon_rejects_foreign_url() {
        let observation = url_beacon("https://example.com/#QQ==");
        assert_eq!(parse_beacon(&observation), None);
    }

    #[test]
    fn test_url_beacon_reports_bad_compression() {
        let mut observation = url_beacon(&ruu_vi_url());
        observation.id1 = Some(vec![0x2A, b'x']); // unknown scheme byte
        let (reading, diagnostics) = parse_beacon_with_diagnostics(&observation);
        assert_eq!(reading, None);
        assert!(matches!(diagnostics[..], [DispatchError::Url(_)]));
    }

    #[test]
    fn test_unknown_format_yields_nothing() {
        let observation = raw_beacon(&[0x07, 0x01, 0x02]);
        let (reading, diagnostics) = parse_beacon_with_diagnostics(&observation);
        assert_eq!(reading, None);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_empty_beacon_yields_nothing() {
        let observation = BeaconObservation {
            address: TEST_MAC,
            type_code: 0xBEAC,
            service_uuid: None,
            id1: None,
            data_fields: Vec::new(),
            rssi: 0,
        };
        assert_eq!(parse_beacon(&observation), None);
    }

    #[test]
    fn test_oversized_beacon_is_reported() {
        let mut observation = raw_beacon(&V3_PAYLOAD);
        observation.data_fields = vec![0x03; 129];
        let (reading, diagnostics) = parse_beacon_with_diagnostics(&observation);
        assert_eq!(reading, None);
        assert_eq!(diagnostics, vec![DispatchError::OversizedBeacon(129)]);
    }

    #[test]
    fn test_buffer_capacity_fits_max_fields() {
        // Exactly 128 fields still decode; the version byte leads.
        let mut fields = vec![0u64; 128];
        for (slot, &b) in fields.iter_mut().zip(V3_PAYLOAD.iter()) {
            *slot = u64::from(b);
        }
        let mut observation = raw_beacon(&V3_PAYLOAD);
        observation.data_fields = fields;
        let reading = parse_beacon(&observation).unwrap();
        assert_eq!(reading.data.data_format, 3);
    }
}
