//! Raw advertisement observations and AD structure parsing.
//!
//! A BLE advertisement payload is a sequence of length-type-value elements
//! ("AD structures"). Only two of them matter for RuuviTags: 16-bit service
//! data carrying an Eddystone URL frame, and manufacturer-specific data.
//! Everything else is dropped during parsing.

use crate::eddystone::{self, EDDYSTONE_SERVICE_UUID, FRAME_TYPE_URL};
use crate::mac_address::MacAddress;
use thiserror::Error;

/// AD type for service data with a 16-bit UUID.
const AD_TYPE_SERVICE_DATA_16: u8 = 0x16;

/// AD type for manufacturer-specific data.
const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// One captured BLE advertisement, as delivered by a scan callback.
///
/// Immutable once captured; the dispatch pipeline borrows it for a single
/// call and keeps nothing afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisementObservation {
    /// Hardware address of the transmitting device.
    pub address: MacAddress,
    /// Raw advertisement payload bytes.
    pub data: Vec<u8>,
    /// Received signal strength in dBm.
    pub rssi: i16,
}

impl AdvertisementObservation {
    pub fn new(address: MacAddress, data: Vec<u8>, rssi: i16) -> Self {
        AdvertisementObservation {
            address,
            data,
            rssi,
        }
    }

    /// Rebuild the canonical advertisement frame around manufacturer data
    /// that a backend has already split out of the packet.
    ///
    /// The raw-format decoders read the protocol-version byte at offset 7 of
    /// the advertisement buffer, which is where the payload lands when a
    /// flags structure precedes the manufacturer data. Backends that only
    /// see pre-parsed manufacturer data use this to re-enter the common
    /// dispatch path.
    pub fn from_manufacturer_data(
        address: MacAddress,
        company_id: u16,
        payload: &[u8],
        rssi: i16,
    ) -> Self {
        let mut data = Vec::with_capacity(7 + payload.len());
        data.extend_from_slice(&[0x02, 0x01, 0x06]); // flags: LE general discoverable
        data.push((3 + payload.len()) as u8);
        data.push(AD_TYPE_MANUFACTURER_DATA);
        data.extend_from_slice(&company_id.to_le_bytes());
        data.extend_from_slice(payload);
        AdvertisementObservation {
            address,
            data,
            rssi,
        }
    }
}

/// One typed sub-element of an advertisement payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvertisementStructure {
    /// Eddystone URL service data, already expanded to its textual URL.
    ServiceDataUrl(String),
    /// Manufacturer-specific data with its registered company identifier.
    ManufacturerSpecific { company_id: u16, data: Vec<u8> },
}

/// Errors from splitting an advertisement into AD structures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureParseError {
    #[error("AD structure at byte {offset} overruns the {len}-byte advertisement")]
    Truncated { offset: usize, len: usize },
}

/// Split an advertisement payload into its relevant AD structures.
///
/// A zero length byte terminates the scan (trailing padding). A length byte
/// pointing past the end of the buffer is an error. Structures of foreign
/// AD types, foreign service UUIDs, or non-URL Eddystone frames are simply
/// not reported, so a foreign advertisement usually parses to an empty
/// sequence rather than an error.
pub fn parse_structures(
    data: &[u8],
) -> Result<Vec<AdvertisementStructure>, StructureParseError> {
    let mut structures = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let len = data[offset] as usize;
        if len == 0 {
            break;
        }
        let end = offset + 1 + len;
        if end > data.len() {
            return Err(StructureParseError::Truncated {
                offset,
                len: data.len(),
            });
        }

        let ad_type = data[offset + 1];
        let content = &data[offset + 2..end];
        match ad_type {
            AD_TYPE_MANUFACTURER_DATA if content.len() >= 2 => {
                structures.push(AdvertisementStructure::ManufacturerSpecific {
                    company_id: u16::from_le_bytes([content[0], content[1]]),
                    data: content[2..].to_vec(),
                });
            }
            AD_TYPE_SERVICE_DATA_16 if content.len() >= 2 => {
                let uuid = u16::from_le_bytes([content[0], content[1]]);
                if uuid == EDDYSTONE_SERVICE_UUID
                    && let Some(url) = url_from_frame(&content[2..])
                {
                    structures.push(AdvertisementStructure::ServiceDataUrl(url));
                }
            }
            _ => {}
        }
        offset = end;
    }
    Ok(structures)
}

/// Expand an Eddystone service-data frame into a URL, if it is a URL frame.
/// Frame layout: frame type, TX power, then the compressed URL.
fn url_from_frame(frame: &[u8]) -> Option<String> {
    if frame.len() < 3 || frame[0] != FRAME_TYPE_URL {
        return None;
    }
    eddystone::uncompress(&frame[2..]).ok()
}
