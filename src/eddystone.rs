//! Eddystone URL frame decompression.
//!
//! URL beacons compress web addresses into advertisement payloads: one byte
//! selects the scheme prefix and dedicated byte codes stand in for common
//! domain endings. This module expands such frames back into text for the
//! URL-carried RuuviTag formats.

use thiserror::Error;

/// 16-bit service UUID assigned to Eddystone.
pub const EDDYSTONE_SERVICE_UUID: u16 = 0xFEAA;

/// Frame type byte of an Eddystone URL frame.
pub const FRAME_TYPE_URL: u8 = 0x10;

const SCHEMES: [&str; 4] = ["http://www.", "https://www.", "http://", "https://"];

const EXPANSIONS: [&str; 14] = [
    ".com/", ".org/", ".edu/", ".net/", ".info/", ".biz/", ".gov/", ".com", ".org", ".edu",
    ".net", ".info", ".biz", ".gov",
];

/// Errors produced while expanding a compressed URL.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UrlError {
    #[error("empty URL frame")]
    Empty,
    #[error("unknown URL scheme code {0:#04x}")]
    UnknownScheme(u8),
}

/// Expand a compressed Eddystone URL into its textual form.
///
/// The first byte selects the scheme prefix; every following byte is either
/// an expansion code for a common domain ending or a printable ASCII
/// character copied through verbatim. Bytes outside both ranges are skipped.
pub fn uncompress(data: &[u8]) -> Result<String, UrlError> {
    let (&scheme, rest) = data.split_first().ok_or(UrlError::Empty)?;
    let prefix = SCHEMES
        .get(scheme as usize)
        .ok_or(UrlError::UnknownScheme(scheme))?;

    let mut url = String::with_capacity(prefix.len() + rest.len());
    url.push_str(prefix);
    for &byte in rest {
        if let Some(expansion) = EXPANSIONS.get(byte as usize) {
            url.push_str(expansion);
        } else if (0x20..0x7F).contains(&byte) {
            url.push(byte as char);
        }
    }
    Ok(url)
}
