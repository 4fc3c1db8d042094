//! Core application runner (business logic) for `ruuvitag-receiver`.
//!
//! This module is intentionally decoupled from CLI parsing and process exit
//! codes so it can be tested deterministically.

use crate::output::OutputFormatter;
use crate::output::influxdb::InfluxDbFormatter;
use crate::reading::SensorReading;
use crate::scanner::{Backend, ReadingResult, ScanError};
use clap::Parser;
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "ruuvi_measurement")]
    pub influxdb_measurement: String,

    /// Verbose output, print dispatch diagnostics for unrecognized data
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Scanner abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(
        &self,
        backend: Backend,
        verbose: bool,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<ReadingResult>, ScanError>> + Send + '_>>;
}

/// Real scanner implementation that delegates to the compiled-in backends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(
        &self,
        backend: Backend,
        verbose: bool,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<ReadingResult>, ScanError>> + Send + '_>>
    {
        Box::pin(async move { crate::scanner::start_scan(backend, verbose).await })
    }
}

fn write_reading(
    formatter: &dyn OutputFormatter,
    reading: &SensorReading,
    out: &mut dyn Write,
) -> io::Result<()> {
    let line = formatter.format(reading);
    writeln!(out, "{line}")
}

/// Run the core processing loop, writing formatted output to `out` and
/// verbose diagnostics to `err`.
///
/// - Decoded readings are formatted and written as one line each to `out`.
/// - Dispatch diagnostics are written to `err` only when `options.verbose`
///   is true.
pub async fn run_with_io(
    options: Options,
    scanner: &dyn Scanner,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let formatter = InfluxDbFormatter::new(options.influxdb_measurement);

    let mut readings = scanner.start_scan(options.backend, options.verbose).await?;

    while let Some(result) = readings.recv().await {
        match result {
            Ok(reading) => {
                write_reading(&formatter, &reading, out)?;
            }
            Err(diagnostic) => {
                if options.verbose {
                    writeln!(err, "{diagnostic}")?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchError;
    use crate::formats::DecodeError;
    use crate::reading::SensorData;
    use crate::test_utils::TEST_MAC;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FakeScanner {
        results: Mutex<Vec<ReadingResult>>,
    }

    impl FakeScanner {
        fn new(results: Vec<ReadingResult>) -> Self {
            Self {
                results: Mutex::new(results),
            }
        }
    }

    impl Scanner for FakeScanner {
        fn start_scan(
            &self,
            _backend: Backend,
            _verbose: bool,
        ) -> Pin<
            Box<
                dyn Future<Output = Result<mpsc::Receiver<ReadingResult>, ScanError>> + Send + '_,
            >,
        > {
            let results = self.results.lock().unwrap().clone();
            Box::pin(async move {
                let (tx, rx) = mpsc::channel::<ReadingResult>(results.len().max(1));
                tokio::spawn(async move {
                    for r in results {
                        let _ = tx.send(r).await;
                    }
                    // drop tx to close channel
                });
                Ok(rx)
            })
        }
    }

    fn reading() -> SensorReading {
        let mut data = SensorData::new(5);
        data.temperature = Some(25.5);
        data.humidity = Some(60.0);
        data.pressure = Some(101_325.0);
        data.battery = Some(3.0);
        SensorReading {
            mac: TEST_MAC,
            url: None,
            rssi: -60,
            data,
        }
    }

    fn options() -> Options {
        Options {
            influxdb_measurement: "ruuvi_measurement".to_string(),
            verbose: false,
            backend: Backend::default(),
        }
    }

    #[tokio::test]
    async fn run_writes_readings_to_out() {
        let scanner = FakeScanner::new(vec![Ok(reading())]);

        let mut out = Vec::<u8>::new();
        let mut err = Vec::<u8>::new();
        run_with_io(options(), &scanner, &mut out, &mut err)
            .await
            .unwrap();

        assert!(err.is_empty());

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("ruuvi_measurement,"));
        assert!(out.contains("mac=CB:B8:33:4C:88:4F"));
        assert!(out.contains("temperature=25.5"));
        assert!(out.ends_with('\n'));
    }

    #[tokio::test]
    async fn run_writes_each_reading_on_its_own_line() {
        let scanner = FakeScanner::new(vec![Ok(reading()), Ok(reading())]);

        let mut out = Vec::<u8>::new();
        let mut err = Vec::<u8>::new();
        run_with_io(options(), &scanner, &mut out, &mut err)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.lines().count(), 2);
    }

    #[tokio::test]
    async fn run_prints_diagnostics_only_when_verbose() {
        let diagnostic = DispatchError::Decode(DecodeError::Truncated {
            format: 5,
            needed: 24,
            offset: 7,
            len: 9,
        });
        let scanner = FakeScanner::new(vec![Err(diagnostic)]);

        // non-verbose: nothing written
        let mut out = Vec::<u8>::new();
        let mut err = Vec::<u8>::new();
        run_with_io(options(), &scanner, &mut out, &mut err)
            .await
            .unwrap();
        assert!(out.is_empty());
        assert!(err.is_empty());

        // verbose: diagnostic is written to err
        let mut out = Vec::<u8>::new();
        let mut err = Vec::<u8>::new();
        let mut verbose = options();
        verbose.verbose = true;
        run_with_io(verbose, &scanner, &mut out, &mut err)
            .await
            .unwrap();

        assert!(out.is_empty());
        let err = String::from_utf8(err).unwrap();
        assert!(err.contains("payload decode failed"));
    }
}
