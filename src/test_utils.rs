//! Shared fixtures for unit tests.

use crate::base64;
use crate::eddystone::{EDDYSTONE_SERVICE_UUID, FRAME_TYPE_URL};
use crate::mac_address::MacAddress;

/// A stable MAC address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xCB, 0xB8, 0x33, 0x4C, 0x88, 0x4F]);

/// Reference format 3 payload (RAWv1).
pub const V3_PAYLOAD: [u8; 14] = [
    0x03, 0x29, 0x1A, 0x1E, 0xCE, 0x1E, 0xFC, 0x18, 0xF9, 0x42, 0x02, 0xCA, 0x0B, 0x53,
];

/// Reference format 5 payload (RAWv2).
pub const V5_PAYLOAD: [u8; 24] = [
    0x05, 0x12, 0xFC, 0x53, 0x94, 0xC3, 0x7C, 0x00, 0x04, 0xFF, 0xFC, 0x04, 0x0C, 0xAC, 0x36,
    0x42, 0x00, 0xCD, 0xCB, 0xB8, 0x33, 0x4C, 0x88, 0x4F,
];

/// Reference format 4 payload carried in URLs (six sensor bytes plus the
/// random identifier byte).
pub const V4_PAYLOAD: [u8; 7] = [0x04, 0x29, 0x1A, 0x1E, 0xCE, 0x1E, 0x3C];

/// A `ruu.vi` URL whose fragment encodes [`V4_PAYLOAD`].
pub fn ruu_vi_url() -> String {
    format!("https://ruu.vi/#{}", base64::encode(&V4_PAYLOAD))
}

/// A manufacturer-specific AD structure (length byte included).
pub fn manufacturer_structure(company_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut structure = vec![(3 + payload.len()) as u8, 0xFF];
    structure.extend_from_slice(&company_id.to_le_bytes());
    structure.extend_from_slice(payload);
    structure
}

/// An Eddystone URL service-data AD structure for the given URL.
///
/// Compresses only the scheme prefix; the rest of the URL rides as plain
/// characters, which every URL used in tests fits into.
pub fn eddystone_url_structure(url: &str) -> Vec<u8> {
    const SCHEMES: [&str; 4] = ["http://www.", "https://www.", "http://", "https://"];
    let (code, rest) = SCHEMES
        .iter()
        .enumerate()
        .find_map(|(code, scheme)| url.strip_prefix(scheme).map(|rest| (code as u8, rest)))
        .expect("test URL must use a known scheme");

    let mut structure = vec![(6 + rest.len()) as u8, 0x16];
    structure.extend_from_slice(&EDDYSTONE_SERVICE_UUID.to_le_bytes());
    structure.push(FRAME_TYPE_URL);
    structure.push(0xF6); // TX power at 0 m
    structure.push(code);
    structure.extend_from_slice(rest.as_bytes());
    structure
}

/// Compressed Eddystone URL bytes (scheme byte plus plain characters), as a
/// beacon identifier blob would carry them.
pub fn compressed_url(url: &str) -> Vec<u8> {
    let structure = eddystone_url_structure(url);
    structure[6..].to_vec()
}
