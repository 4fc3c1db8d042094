//! Output formatters for sensor readings.
//!
//! This module provides a trait for formatting readings and implementations
//! for various output formats. Currently supports InfluxDB line protocol,
//! with extensibility for future formats like JSON and CSV.

pub mod influxdb;

use crate::reading::SensorReading;

/// Trait for formatting sensor readings into output strings.
pub trait OutputFormatter: Send + Sync {
    /// Format a reading into one output line.
    fn format(&self, reading: &SensorReading) -> String;
}
