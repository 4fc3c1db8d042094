//! InfluxDB line protocol output formatter.

use crate::output::OutputFormatter;
use crate::reading::SensorReading;
use std::collections::BTreeMap;
use std::fmt;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    #[allow(dead_code)] // Used in tests
    String(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        for (key, value) in self.tag_set.iter() {
            write!(fmt, ",{}={}", key, value)?;
        }
        write!(fmt, " ")?;
        let mut first = true;
        for (key, value) in self.field_set.iter() {
            if first {
                first = false;
            } else {
                write!(fmt, ",")?;
            }
            write!(fmt, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol formatter.
///
/// Formats readings according to the InfluxDB line protocol specification
/// with a configurable measurement name. Timestamps are left to the ingest
/// side.
pub struct InfluxDbFormatter {
    /// The measurement name in InfluxDB
    measurement_name: String,
}

impl InfluxDbFormatter {
    /// Convert humidity from percent (0-100) to fraction (0-1).
    #[inline]
    fn humidity_fraction(percent: f64) -> f64 {
        percent / 100.0
    }

    /// Convert pressure from Pascals to kilopascals.
    #[inline]
    fn pressure_kpa(pascals: f64) -> f64 {
        pascals / 1000.0
    }

    /// Create a new InfluxDB formatter with the given measurement name.
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    /// Tags: the device MAC and the payload format the reading came from.
    fn tag_set(&self, reading: &SensorReading) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert("mac".to_string(), reading.mac.to_string());
        tags.insert("format".to_string(), reading.data.data_format.to_string());
        tags
    }

    /// Build the field set for InfluxDB line protocol.
    ///
    /// Only includes fields that have values (None fields are omitted).
    /// Performs unit conversions as needed (humidity to fraction, pressure
    /// to kPa).
    fn field_set(&self, reading: &SensorReading) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        let values = &reading.data;

        macro_rules! add {
            ($name:literal, $val:expr) => {
                if let Some(v) = $val {
                    fields.insert($name.into(), FieldValue::Float(v));
                }
            };
        }

        add!("temperature", values.temperature);
        add!("humidity", values.humidity.map(Self::humidity_fraction));
        add!("pressure", values.pressure.map(Self::pressure_kpa));
        add!("battery_potential", values.battery);
        add!("tx_power", values.tx_power.map(f64::from));
        add!("movement_counter", values.movement_counter.map(f64::from));
        add!(
            "measurement_sequence_number",
            values.measurement_sequence.map(f64::from)
        );

        if let Some((x, y, z)) = values.acceleration {
            fields.insert("acceleration_x".into(), FieldValue::Float(x));
            fields.insert("acceleration_y".into(), FieldValue::Float(y));
            fields.insert("acceleration_z".into(), FieldValue::Float(z));
        }

        fields.insert("rssi".into(), FieldValue::Float(f64::from(reading.rssi)));

        fields
    }

    fn to_data_point(&self, reading: &SensorReading) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: self.tag_set(reading),
            field_set: self.field_set(reading),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, reading: &SensorReading) -> String {
        format!("{}", self.to_data_point(reading))
    }
}
