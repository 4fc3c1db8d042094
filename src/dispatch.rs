//! Advertisement dispatch: route AD structures to payload-format decoders.
//!
//! This is the seam between scanning and decoding. For one observation it
//! parses the AD structures, resolves which decoder (if any) applies to
//! each, and keeps the reading from the last structure that decodes
//! successfully. Every failure stays inside this boundary: callers get
//! `None` plus diagnostics, never an error, and the surrounding scan loop
//! is never aborted by a malformed or foreign packet.

use crate::advertisement::{
    AdvertisementObservation, AdvertisementStructure, StructureParseError, parse_structures,
};
use crate::base64;
use crate::eddystone::UrlError;
use crate::formats::{self, DecodeError, PayloadDecoder, url::DecodeFormat2And4};
use crate::reading::SensorReading;
use thiserror::Error;

/// Ruuvi Innovations company identifier.
pub const RUUVI_COMPANY_ID: u16 = 0x0499;

/// URL prefixes that mark a RuuviTag URL advertisement.
pub(crate) const URL_PREFIX_LONG: &str = "https://ruu.vi/#";
pub(crate) const URL_PREFIX_SHORT: &str = "https://r/";

/// Offset of the protocol-version byte in a raw advertisement buffer.
const VERSION_OFFSET: usize = 7;

/// Failures recovered at the dispatch boundary.
///
/// These never propagate out of [`parse_advertisement`]; they exist so that
/// tests and verbose scanners can observe why an observation produced no
/// reading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("malformed advertisement: {0}")]
    Structure(#[from] StructureParseError),
    #[error("payload decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("beacon URL frame invalid: {0}")]
    Url(#[from] UrlError),
    #[error("beacon carries {0} data fields, exceeding the 128-byte scratch buffer")]
    OversizedBeacon(usize),
}

/// A decoder selection for one AD structure.
pub(crate) struct ResolvedPayload {
    pub(crate) decoder: &'static dyn PayloadDecoder,
    pub(crate) payload: Vec<u8>,
    pub(crate) offset: usize,
    pub(crate) url: Option<String>,
}

/// Decide which decoder, if any, applies to one AD structure.
///
/// URL path: only the recognized Ruuvi prefixes qualify; the fragment after
/// the first `#` is base64-decoded for the format 2-and-4 decoder, and a URL
/// without a fragment (possible for the short prefix) yields nothing.
///
/// Manufacturer path: only the Ruuvi company identifier qualifies, and the
/// payload is the *whole* raw advertisement buffer, not the structure's own
/// bytes; the version byte at offset 7 selects the decoder. An unknown
/// version, or a buffer too short to have an offset 7, resolves to nothing.
pub(crate) fn resolve(
    structure: &AdvertisementStructure,
    raw: &[u8],
) -> Option<ResolvedPayload> {
    match structure {
        AdvertisementStructure::ServiceDataUrl(url) => {
            if !url.starts_with(URL_PREFIX_LONG) && !url.starts_with(URL_PREFIX_SHORT) {
                return None;
            }
            let (_, fragment) = url.split_once('#')?;
            Some(ResolvedPayload {
                decoder: &DecodeFormat2And4,
                payload: base64::decode(fragment),
                offset: VERSION_OFFSET,
                url: Some(url.clone()),
            })
        }
        AdvertisementStructure::ManufacturerSpecific { company_id, .. } => {
            if *company_id != RUUVI_COMPANY_ID {
                return None;
            }
            let version = *raw.get(VERSION_OFFSET)?;
            Some(ResolvedPayload {
                decoder: formats::decoder_for(version)?,
                payload: raw.to_vec(),
                offset: VERSION_OFFSET,
                url: None,
            })
        }
    }
}

/// Parse one advertisement into at most one sensor reading.
///
/// Recovered failures go to the log; a malformed or foreign advertisement
/// is an expected, frequent event, not an exceptional one.
pub fn parse_advertisement(observation: &AdvertisementObservation) -> Option<SensorReading> {
    let (reading, diagnostics) = parse_advertisement_with_diagnostics(observation);
    for diagnostic in &diagnostics {
        log::debug!("{}: {diagnostic}", observation.address);
    }
    reading
}

/// As [`parse_advertisement`], but hands back the failures recovered along
/// the way instead of logging them.
///
/// When several structures in one advertisement decode successfully, the
/// reading from the structure processed last wins and earlier readings are
/// discarded. A structure that resolves but fails to decode contributes a
/// diagnostic and leaves any earlier reading in place.
pub fn parse_advertisement_with_diagnostics(
    observation: &AdvertisementObservation,
) -> (Option<SensorReading>, Vec<DispatchError>) {
    let mut diagnostics = Vec::new();

    let structures = match parse_structures(&observation.data) {
        Ok(structures) => structures,
        Err(error) => {
            diagnostics.push(error.into());
            return (None, diagnostics);
        }
    };

    // Explicit fold over a "most recent successful decode" slot.
    let reading = structures.iter().fold(None, |current, structure| {
        let Some(resolved) = resolve(structure, &observation.data) else {
            return current;
        };
        match resolved.decoder.decode(&resolved.payload, resolved.offset) {
            Ok(data) => Some(SensorReading {
                mac: observation.address,
                url: resolved.url,
                rssi: observation.rssi,
                data,
            }),
            Err(error) => {
                diagnostics.push(error.into());
                current
            }
        }
    });

    (reading, diagnostics)
}
