//! Command implementations
//!
//! Each command writes its user-facing output to `out`; diagnostics go
//! through `tracing`.

use crate::config::CliConfig;
use anyhow::{Context, Result, bail};
use common::{format_hex, hex_dump};
use rawhid::usb::UsbHost;
use rawhid::{RawHid, RawHidError};
use std::io::Write;
use tracing::{info, warn};

/// Print how many matching devices are present
pub fn scan<H: UsbHost>(hid: &RawHid<H>, config: &CliConfig, out: &mut impl Write) -> Result<usize> {
    let count = hid
        .scan(&config.filter()?)
        .context("Failed to list USB devices")?;
    writeln!(out, "{} matching device(s) present", count)?;
    Ok(count)
}

/// Open matching devices and describe each
pub fn list<H: UsbHost>(
    hid: &mut RawHid<H>,
    config: &CliConfig,
    out: &mut impl Write,
) -> Result<usize> {
    let opened = open_devices(hid, config)?;

    if opened == 0 {
        writeln!(out, "No matching HID devices found.")?;
        return Ok(0);
    }

    writeln!(out, "Opened {} HID device(s):\n", opened)?;
    for (index, device) in hid.devices() {
        let identity = device.identity();
        writeln!(
            out,
            "  [{}] {:04x}:{:04x} interface {}",
            index, identity.vendor_id, identity.product_id, device.interface()
        )?;
        match device.output_endpoint() {
            Some(endpoint) => writeln!(
                out,
                "      IN {:#04x}  OUT {:#04x}",
                device.input_endpoint(),
                endpoint
            )?,
            None => writeln!(
                out,
                "      IN {:#04x}  OUT via SET_REPORT",
                device.input_endpoint()
            )?,
        }
    }

    Ok(opened)
}

/// Print every packet received until `count` packets arrive or no device is
/// left open. Returns the number of packets printed.
pub fn listen<H: UsbHost>(
    hid: &mut RawHid<H>,
    config: &CliConfig,
    count: Option<usize>,
    out: &mut impl Write,
) -> Result<usize> {
    if open_devices(hid, config)? == 0 {
        bail!("No matching HID devices found");
    }

    let timeout = config.transfer.recv_timeout();
    let mut buf = vec![0u8; config.transfer.packet_size];
    let mut received = 0;

    loop {
        let indices: Vec<usize> = hid.devices().map(|(index, _)| index).collect();
        if indices.is_empty() {
            info!("No devices left open");
            break;
        }

        for index in indices {
            match hid.recv(index, &mut buf, timeout) {
                Ok(0) => {}
                Ok(len) => {
                    writeln!(out, "device {}: {} bytes", index, len)?;
                    writeln!(out, "{}", hex_dump(&buf[..len]))?;
                    received += 1;
                    if count.is_some_and(|limit| received >= limit) {
                        return Ok(received);
                    }
                }
                Err(e) => {
                    warn!("Closing device {}: {}", index, e);
                    hid.close(index);
                }
            }
        }
    }

    Ok(received)
}

/// Send one packet, zero-padded to `packet_size`
pub fn send<H: UsbHost>(
    hid: &mut RawHid<H>,
    config: &CliConfig,
    index: usize,
    payload: &[u8],
    out: &mut impl Write,
) -> Result<usize> {
    let packet_size = config.transfer.packet_size;
    if payload.len() > packet_size {
        bail!(
            "Payload is {} bytes, larger than packet_size {}",
            payload.len(),
            packet_size
        );
    }

    let opened = open_devices(hid, config)?;
    if index >= opened {
        bail!("Device index {} not available, {} device(s) opened", index, opened);
    }

    let mut packet = vec![0u8; packet_size];
    packet[..payload.len()].copy_from_slice(payload);

    let sent = match hid.send(index, &packet, config.transfer.send_timeout()) {
        Ok(sent) => sent,
        Err(RawHidError::Transport(e)) => bail!("Send to device {} failed: {}", index, e),
        Err(e) => return Err(e.into()),
    };

    writeln!(out, "sent {} bytes to device {}: {}", sent, index, format_hex(&packet[..sent]))?;
    Ok(sent)
}

fn open_devices<H: UsbHost>(hid: &mut RawHid<H>, config: &CliConfig) -> Result<usize> {
    let opened = hid
        .open(config.device.max_devices, &config.filter()?)
        .context("Failed to list USB devices")?;
    info!("Opened {} device(s)", opened);
    Ok(opened)
}
