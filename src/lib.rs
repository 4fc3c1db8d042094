//! `ruuvitag-receiver` library.
//!
//! Receives RuuviTag BLE advertisements and decodes their sensor payloads.
//! The pipeline has three layers:
//!
//! - capture: scanner backends ([`crate::scanner`]) and observation types
//!   ([`crate::advertisement`], [`crate::beacon`]);
//! - dispatch: routing observations to payload decoders
//!   ([`crate::dispatch`], [`crate::formats`]);
//! - output: formatting readings for downstream consumers
//!   ([`crate::output`]).
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing and process exit
//! codes. The core business logic lives in [`crate::app`] where it can be
//! tested deterministically with injected scanner + injected output streams.

pub mod advertisement;
pub mod app;
pub mod base64;
pub mod beacon;
pub mod dispatch;
pub mod eddystone;
pub mod formats;
pub mod mac_address;
pub mod output;
pub mod reading;
pub mod scanner;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types at the crate root
pub use advertisement::{AdvertisementObservation, AdvertisementStructure, parse_structures};
pub use beacon::{BeaconObservation, parse_beacon, parse_beacon_with_diagnostics};
pub use dispatch::{
    DispatchError, RUUVI_COMPANY_ID, parse_advertisement, parse_advertisement_with_diagnostics,
};
pub use mac_address::MacAddress;
pub use output::OutputFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use reading::{SensorData, SensorReading};
pub use scanner::{Backend, ReadingResult, ScanError};
