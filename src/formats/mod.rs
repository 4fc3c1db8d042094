//! RuuviTag payload format decoders.
//!
//! Each historical wire format implements [`PayloadDecoder`]. The raw
//! manufacturer-data formats are looked up through a registry keyed by the
//! protocol-version byte; adding a format means adding a table entry, not
//! touching the dispatch logic.

pub mod url;
pub mod v3;
pub mod v5;

use crate::reading::SensorData;
use thiserror::Error;

/// Errors returned by payload decoders.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The buffer ends before the format's full field layout.
    #[error(
        "format {format} payload too short: needs {needed} bytes past offset {offset}, buffer has {len}"
    )]
    Truncated {
        format: u8,
        needed: usize,
        offset: usize,
        len: usize,
    },
}

/// Contract every format decoder satisfies.
///
/// `data[offset]` is where the payload begins (the protocol-version byte for
/// the raw formats). Decoders are stateless and safe to call concurrently;
/// they either produce a full value set or an error, never a partial
/// reading.
pub trait PayloadDecoder: Sync {
    fn decode(&self, data: &[u8], offset: usize) -> Result<SensorData, DecodeError>;
}

/// Raw-format decoders by protocol-version byte.
static DECODERS: &[(u8, &dyn PayloadDecoder)] =
    &[(3, &v3::DecodeFormat3), (5, &v5::DecodeFormat5)];

/// Look up the decoder registered for a protocol-version byte.
pub fn decoder_for(version: u8) -> Option<&'static dyn PayloadDecoder> {
    DECODERS
        .iter()
        .find(|(registered, _)| *registered == version)
        .map(|(_, decoder)| *decoder)
}

/// Temperature encoding shared by formats 2, 3 and 4: an integer byte whose
/// high bit is the sign, plus a fraction byte in 1/100ths.
pub(crate) fn signed_fraction(integer: u8, fraction: u8) -> f64 {
    let magnitude = f64::from(integer & 0x7F) + f64::from(fraction) / 100.0;
    if integer & 0x80 != 0 { -magnitude } else { magnitude }
}
