//! USB enumeration
//!
//! Walks the host's device list, applies the vendor/product filter, and runs
//! the interface matcher over the first configuration of each device.

use crate::error::{RawHidError, Result};
use crate::filter::DeviceFilter;
use crate::usb::host::{HandleOf, HostDevice, UsbHost};
use crate::usb::matcher::match_interface;
use crate::usb::registry::DeviceTable;
use tracing::{debug, info};

/// Count present devices matching the vendor/product part of `filter`
///
/// Only devices exposing at least one configuration are counted. Nothing is
/// opened.
pub fn scan<H: UsbHost>(host: &H, filter: &DeviceFilter) -> Result<usize> {
    let devices = host.devices().map_err(RawHidError::Enumeration)?;

    let count = devices
        .iter()
        .filter_map(|device| device.identity().ok())
        .filter(|identity| filter.matches_device(identity) && identity.num_configurations > 0)
        .inspect(|identity| {
            debug!(
                "Found device {:04x}:{:04x}",
                identity.vendor_id, identity.product_id
            )
        })
        .count();

    Ok(count)
}

/// Open up to `max` matching HID interfaces into `table`
///
/// Any devices left in `table` from a previous call are closed first. Each
/// interface that fails to qualify is skipped; the return value is the
/// number of devices opened, from 0 to `max`.
pub fn open<H: UsbHost>(
    host: &H,
    table: &mut DeviceTable<HandleOf<H>>,
    max: usize,
    filter: &DeviceFilter,
) -> Result<usize> {
    if max == 0 {
        return Ok(0);
    }

    table.close_all();

    let devices = host.devices().map_err(RawHidError::Enumeration)?;
    let mut opened = 0;

    'devices: for device in &devices {
        if opened >= max {
            break;
        }

        let identity = match device.identity() {
            Ok(identity) => identity,
            Err(e) => {
                debug!("Skipping device, no device descriptor: {}", e);
                continue;
            }
        };

        if !filter.matches_device(&identity) {
            continue;
        }

        let config = match device.config_layout(0) {
            Ok(config) => config,
            Err(e) => {
                debug!(
                    "Skipping {:04x}:{:04x}, no configuration descriptor: {}",
                    identity.vendor_id, identity.product_id, e
                );
                continue;
            }
        };

        debug!(
            "Device {:04x}:{:04x} with {} interfaces",
            identity.vendor_id,
            identity.product_id,
            config.interfaces.len()
        );

        for interface in &config.interfaces {
            if opened >= max {
                break 'devices;
            }

            for setting in &interface.alt_settings {
                match match_interface(device, identity, interface.number, setting, filter) {
                    Ok(hid) => {
                        let index = table.insert(hid);
                        info!(
                            "Opened {:04x}:{:04x} interface {} as device {}",
                            identity.vendor_id, identity.product_id, interface.number, index
                        );
                        opened += 1;
                        break;
                    }
                    Err(rejection) => {
                        debug!(
                            "Skipping {:04x}:{:04x} interface {} alt {}: {}",
                            identity.vendor_id,
                            identity.product_id,
                            interface.number,
                            setting.setting_number,
                            rejection
                        );
                    }
                }
            }
        }
    }

    Ok(opened)
}
