//! Packet transfers on opened devices
//!
//! Receives use the interrupt IN endpoint. Sends use the interrupt OUT
//! endpoint when the interface has one, otherwise a SET_REPORT control
//! request on the claimed interface.

use crate::error::{RawHidError, Result};
use crate::usb::device::HidDevice;
use crate::usb::host::HostHandle;
use crate::usb::registry::DeviceTable;
use rusb::{Direction, Recipient, RequestType};
use std::time::Duration;
use tracing::{debug, warn};

/// HID class SET_REPORT request
pub const REQUEST_SET_REPORT: u8 = 0x09;

/// SET_REPORT value: Output report type, report ID 0
pub const OUTPUT_REPORT_VALUE: u16 = 0x0200;

/// Receive one packet from device `index`
///
/// Returns `Ok(0)` when the timeout expires with no data.
pub fn recv<H: HostHandle>(
    table: &DeviceTable<H>,
    index: usize,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<usize> {
    let (device, handle) = lookup(table, index)?;

    match handle.read_interrupt(device.input_endpoint(), buf, timeout) {
        Ok(len) => {
            debug!("Device {}: received {} bytes", index, len);
            Ok(len)
        }
        Err(rusb::Error::Timeout) => Ok(0),
        Err(e) => {
            warn!("Device {}: interrupt IN failed: {}", index, e);
            Err(RawHidError::Transport(e))
        }
    }
}

/// Send one packet to device `index`, returning the number of bytes accepted
pub fn send<H: HostHandle>(
    table: &DeviceTable<H>,
    index: usize,
    buf: &[u8],
    timeout: Duration,
) -> Result<usize> {
    let (device, handle) = lookup(table, index)?;

    let result = match device.output_endpoint() {
        Some(endpoint) => handle.write_interrupt(endpoint, buf, timeout),
        None => handle.write_control(
            rusb::request_type(Direction::Out, RequestType::Class, Recipient::Interface),
            REQUEST_SET_REPORT,
            OUTPUT_REPORT_VALUE,
            u16::from(device.interface()),
            buf,
            timeout,
        ),
    };

    match result {
        Ok(len) => {
            debug!("Device {}: sent {} bytes", index, len);
            Ok(len)
        }
        Err(e) => {
            warn!("Device {}: send failed: {}", index, e);
            Err(RawHidError::Transport(e))
        }
    }
}

fn lookup<H: HostHandle>(table: &DeviceTable<H>, index: usize) -> Result<(&HidDevice<H>, &H)> {
    table
        .get(index)
        .and_then(|device| Some((device, device.handle()?)))
        .ok_or(RawHidError::NotFound { index })
}
