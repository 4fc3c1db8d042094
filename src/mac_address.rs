//! Compact Bluetooth hardware address type.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A Bluetooth hardware address stored as six raw bytes.
///
/// Keeps readings independent of any particular Bluetooth backend and is
/// cheap to copy, compare and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Error returned when parsing a MAC address string.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid MAC address '{0}': expected six colon-separated hex octets")]
pub struct ParseMacError(String);

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseMacError(s.to_string());

        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for slot in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddress(bytes))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for MacAddress {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

#[cfg(feature = "bluer")]
impl From<MacAddress> for bluer::Address {
    fn from(addr: MacAddress) -> Self {
        bluer::Address(addr.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let addr = MacAddress([0xCB, 0xB8, 0x33, 0x4C, 0x88, 0x4F]);
        assert_eq!(addr.to_string(), "CB:B8:33:4C:88:4F");
    }

    #[test]
    fn test_from_str() {
        let addr: MacAddress = "cb:b8:33:4c:88:4f".parse().unwrap();
        assert_eq!(addr, MacAddress([0xCB, 0xB8, 0x33, 0x4C, 0x88, 0x4F]));
    }

    #[test]
    fn test_from_str_rejects_malformed() {
        assert!("".parse::<MacAddress>().is_err());
        assert!("AA:BB:CC".parse::<MacAddress>().is_err());
        assert!("AA:BB:CC:DD:EE:FF:00".parse::<MacAddress>().is_err());
        assert!("AA:BB:CC:DD:EE:GG".parse::<MacAddress>().is_err());
        assert!("AAB:B:CC:DD:EE:FF".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_round_trips_through_display() {
        let addr = MacAddress([0x00, 0x01, 0xFE, 0x03, 0x04, 0xFF]);
        assert_eq!(addr.to_string().parse::<MacAddress>().unwrap(), addr);
    }
}
