//! BlueZ D-Bus backend for RuuviTag scanning.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{
    MANUFACTURER_DATA_TYPE, READING_CHANNEL_BUFFER_SIZE, RUUVI_MANUFACTURER_ID_BYTES,
    ReadingResult, ScanError,
};
use crate::advertisement::AdvertisementObservation;
use crate::dispatch::{RUUVI_COMPANY_ID, parse_advertisement_with_diagnostics};
use crate::mac_address::MacAddress;
use bluer::monitor::{Monitor, MonitorEvent, Pattern};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use tokio::sync::mpsc;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Start scanning for RuuviTag devices using the BlueZ D-Bus backend.
///
/// Initializes the Bluetooth adapter and registers a passive advertisement
/// monitor filtered on the Ruuvi manufacturer ID. Runs indefinitely until
/// the receiver is dropped or the process exits.
///
/// # Arguments
/// * `verbose` - If true, dispatch diagnostics are sent as Err values;
///   otherwise they're logged and dropped.
pub async fn start_scan(verbose: bool) -> Result<mpsc::Receiver<ReadingResult>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;

    let (tx, rx) = mpsc::channel(READING_CHANNEL_BUFFER_SIZE);

    // Create a pattern to filter for Ruuvi manufacturer data
    let pattern = Pattern {
        data_type: MANUFACTURER_DATA_TYPE,
        start_position: 0,
        content: RUUVI_MANUFACTURER_ID_BYTES.to_vec(),
    };

    let monitor_manager = adapter.monitor().await?;
    let mut monitor_handle = monitor_manager
        .register(Monitor {
            patterns: Some(vec![pattern]),
            ..Default::default()
        })
        .await?;

    // Spawn a task that owns all Bluetooth state and runs the event loop
    tokio::spawn(async move {
        // Keep all Bluetooth state alive by moving it into this task
        let _session = session;
        let _monitor_manager = monitor_manager;

        while let Some(event) = monitor_handle.next().await {
            if let MonitorEvent::DeviceFound(device_id) = event
                && let Err(e) = process_device(&adapter, device_id.device, &tx, verbose).await
            {
                log::warn!("device processing failed: {e}");
            }
        }
    });

    Ok(rx)
}

/// Process a discovered device: read its manufacturer data, rebuild the
/// advertisement frame around it and run it through dispatch.
async fn process_device(
    adapter: &Adapter,
    address: Address,
    tx: &mpsc::Sender<ReadingResult>,
    verbose: bool,
) -> Result<(), ScanError> {
    let device = adapter.device(address)?;
    let mac: MacAddress = address.into();

    // Try to get manufacturer-specific data from the device
    let manufacturer_data = match device.manufacturer_data().await? {
        Some(data) => data,
        None => return Ok(()), // No manufacturer data available
    };

    // Extract RuuviTag data if present
    let payload = match manufacturer_data.get(&RUUVI_COMPANY_ID) {
        Some(data) => data,
        None => return Ok(()), // Not a RuuviTag device
    };

    let rssi = device.rssi().await?.unwrap_or(0);
    let observation =
        AdvertisementObservation::from_manufacturer_data(mac, RUUVI_COMPANY_ID, payload, rssi);

    let (reading, diagnostics) = parse_advertisement_with_diagnostics(&observation);
    if let Some(reading) = reading {
        let _ = tx.send(Ok(reading)).await;
    }
    for diagnostic in diagnostics {
        if verbose {
            let _ = tx.send(Err(diagnostic)).await;
        } else {
            log::debug!("{mac}: {diagnostic}");
        }
    }

    Ok(())
}
