//! Raw HCI socket backend for RuuviTag scanning.
//!
//! This backend uses raw Linux HCI sockets to scan for BLE advertisements
//! without requiring the BlueZ daemon. It requires CAP_NET_RAW and
//! CAP_NET_ADMIN capabilities or root privileges.

use super::{READING_CHANNEL_BUFFER_SIZE, ReadingResult, ScanError};
use crate::advertisement::AdvertisementObservation;
use crate::dispatch::parse_advertisement_with_diagnostics;
use crate::mac_address::MacAddress;
use libc::{AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_RAW, c_int, c_void, sockaddr, socklen_t};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

// HCI protocol constants
const BTPROTO_HCI: c_int = 1;
const HCI_FILTER: c_int = 2;

// HCI packet types
const HCI_EVENT_PKT: u8 = 0x04;

// HCI events
const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta event sub-events
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// HCI commands
const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// Scan types
const LE_SCAN_PASSIVE: u8 = 0x00;

// Own address type
const LE_PUBLIC_ADDRESS: u8 = 0x00;

// Filter policy
const FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

/// HCI socket address structure
#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

/// HCI filter structure for raw sockets
#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn new() -> Self {
        Self {
            type_mask: 0,
            event_mask: [0, 0],
            opcode: 0,
        }
    }

    fn set_ptype(&mut self, ptype: u8) {
        self.type_mask |= 1 << (ptype as u32);
    }

    fn set_event(&mut self, event: u8) {
        let bit = event as usize;
        self.event_mask[bit / 32] |= 1 << (bit % 32);
    }
}

/// A raw HCI socket bound to a local Bluetooth device.
struct HciSocket {
    fd: OwnedFd,
}

impl HciSocket {
    /// Open a raw non-blocking HCI socket and bind it to a device.
    ///
    /// Uses libc directly since nix doesn't support BTPROTO_HCI;
    /// SOCK_NONBLOCK is required for AsyncFd to work properly.
    fn open(dev_id: u16) -> Result<Self, ScanError> {
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                SOCK_RAW | SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
                BTPROTO_HCI,
            )
        };
        if fd < 0 {
            return Err(ScanError::Bluetooth(format!(
                "Failed to create HCI socket: {}",
                io::Error::last_os_error()
            )));
        }
        let socket = HciSocket {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        };
        socket.bind(dev_id)?;
        Ok(socket)
    }

    fn bind(&self, dev_id: u16) -> Result<(), ScanError> {
        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as u16,
            hci_dev: dev_id,
            hci_channel: 0, // HCI_CHANNEL_RAW
        };

        let ret = unsafe {
            libc::bind(
                self.fd.as_raw_fd(),
                &addr as *const SockaddrHci as *const sockaddr,
                mem::size_of::<SockaddrHci>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(ScanError::Bluetooth(format!(
                "Failed to bind HCI socket: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    /// Restrict received packets to LE meta events.
    fn set_event_filter(&self) -> Result<(), ScanError> {
        let mut filter = HciFilter::new();
        filter.set_ptype(HCI_EVENT_PKT);
        filter.set_event(EVT_LE_META_EVENT);

        let ret = unsafe {
            libc::setsockopt(
                self.fd.as_raw_fd(),
                0, // SOL_HCI
                HCI_FILTER,
                &filter as *const HciFilter as *const c_void,
                mem::size_of::<HciFilter>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(ScanError::Bluetooth(format!(
                "Failed to set HCI filter: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    /// Send one HCI command with the given parameter bytes.
    fn command(&self, ogf: u16, ocf: u16, params: &[u8]) -> Result<(), ScanError> {
        let packet = hci_command_packet(ogf, ocf, params);
        let ret = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                packet.as_ptr() as *const c_void,
                packet.len(),
            )
        };
        if ret < 0 {
            return Err(ScanError::Bluetooth(format!(
                "Failed to send HCI command: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    /// Configure and enable passive LE scanning.
    fn enable_le_scan(&self) -> Result<(), ScanError> {
        // Passive scan, 10ms interval and window (0x0010 in 0.625ms units)
        let interval: u16 = 0x0010;
        let window: u16 = 0x0010;
        let mut params = vec![LE_SCAN_PASSIVE];
        params.extend_from_slice(&interval.to_le_bytes());
        params.extend_from_slice(&window.to_le_bytes());
        params.push(LE_PUBLIC_ADDRESS);
        params.push(FILTER_POLICY_ACCEPT_ALL);
        self.command(OGF_LE_CTL, OCF_LE_SET_SCAN_PARAMETERS, &params)?;

        // Enable scanning, don't filter duplicates
        self.command(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &[0x01, 0x00])
    }
}

/// Create an HCI command packet
fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(0x01); // HCI command packet type
    packet.push((opcode & 0xFF) as u8);
    packet.push((opcode >> 8) as u8);
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

/// Extract an advertisement observation from an LE advertising report event.
///
/// Only the first report of the event is used. Returns `None` when the
/// packet is too short for the fixed layout; the dispatch pipeline handles
/// everything past the report header.
fn observation_from_report(packet: &[u8]) -> Option<AdvertisementObservation> {
    // Skip HCI header: packet type, event code, param len, subevent
    let report = packet.get(4..)?;

    let num_reports = *report.first()? as usize;
    if num_reports == 0 {
        return None;
    }

    // First report layout: event_type(1) + addr_type(1) + addr(6) +
    // data_len(1) + data + rssi(1), starting after num_reports.
    let mut addr = [0u8; 6];
    addr.copy_from_slice(report.get(3..9)?);
    addr.reverse(); // HCI uses little-endian address order

    let data_len = *report.get(9)? as usize;
    let data = report.get(10..10 + data_len)?.to_vec();
    let rssi = report
        .get(10 + data_len)
        .map(|&b| i16::from(b as i8))
        .unwrap_or(0);

    Some(AdvertisementObservation::new(MacAddress(addr), data, rssi))
}

/// Start scanning for RuuviTag devices using raw HCI sockets.
///
/// Opens a raw HCI socket on hci0, enables passive LE scanning and feeds
/// every advertising report through the dispatch pipeline. Runs indefinitely
/// until interrupted.
///
/// # Arguments
/// * `verbose` - If true, dispatch diagnostics are sent as Err values;
///   otherwise they're logged and dropped.
///
/// # Requirements
/// - CAP_NET_RAW and CAP_NET_ADMIN capabilities or root privileges
/// - An available HCI device (typically hci0)
pub async fn start_scan(verbose: bool) -> Result<mpsc::Receiver<ReadingResult>, ScanError> {
    // Socket for receiving advertising events
    let event_socket = HciSocket::open(0)?;
    event_socket.set_event_filter()?;

    // A separate socket issues the scan commands
    let cmd_socket = HciSocket::open(0)?;
    cmd_socket.enable_le_scan()?;

    let (tx, rx) = mpsc::channel(READING_CHANNEL_BUFFER_SIZE);

    let async_fd = AsyncFd::new(event_socket.fd)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {}", e)))?;

    // Spawn a task to read and process HCI events
    tokio::spawn(async move {
        let _cmd_socket = cmd_socket; // Keep command socket alive
        let mut buf = [0u8; 258]; // Max HCI event size

        loop {
            // Wait for the socket to be readable
            let mut guard = match async_fd.readable().await {
                Ok(guard) => guard,
                Err(_) => break,
            };

            // Drain all available packets before waiting again
            loop {
                let n = match guard.try_io(|inner| {
                    let ret = unsafe {
                        libc::read(
                            inner.as_raw_fd(),
                            buf.as_mut_ptr() as *mut c_void,
                            buf.len(),
                        )
                    };
                    if ret < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(ret as usize)
                    }
                }) {
                    Ok(Ok(n)) if n > 0 => n,
                    Ok(Ok(_)) => break,  // EOF or empty read
                    Ok(Err(_)) => break, // Read error
                    Err(_) => break,     // WouldBlock - no more data
                };

                if n >= 4
                    && buf[0] == HCI_EVENT_PKT
                    && buf[1] == EVT_LE_META_EVENT
                    && buf[3] == EVT_LE_ADVERTISING_REPORT
                    && let Some(observation) = observation_from_report(&buf[..n])
                {
                    let (reading, diagnostics) =
                        parse_advertisement_with_diagnostics(&observation);
                    if let Some(reading) = reading {
                        let _ = tx.send(Ok(reading)).await;
                    }
                    for diagnostic in diagnostics {
                        if verbose {
                            let _ = tx.send(Err(diagnostic)).await;
                        } else {
                            log::debug!("{}: {diagnostic}", observation.address);
                        }
                    }
                }
            }
        }
    });

    Ok(rx)
}
