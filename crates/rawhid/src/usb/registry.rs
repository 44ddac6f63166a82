//! Device handle registry
//!
//! Holds the devices opened by the current scan in discovery order. Index `i`
//! is the `i`-th device inserted since the last [`DeviceTable::close_all`].
//! Closing one entry keeps its slot so later indices stay stable.

use crate::usb::device::HidDevice;
use crate::usb::host::HostHandle;
use tracing::debug;

pub struct DeviceTable<H: HostHandle> {
    devices: Vec<HidDevice<H>>,
}

impl<H: HostHandle> Default for DeviceTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: HostHandle> DeviceTable<H> {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Append a device and return its index
    pub fn insert(&mut self, device: HidDevice<H>) -> usize {
        self.devices.push(device);
        self.devices.len() - 1
    }

    /// Open device at `index`; closed and out-of-range entries are both `None`
    pub fn get(&self, index: usize) -> Option<&HidDevice<H>> {
        self.devices.get(index).filter(|d| d.is_open())
    }

    /// Close the device at `index`, keeping its slot
    pub fn close(&mut self, index: usize) {
        if let Some(device) = self.devices.get_mut(index) {
            device.close();
        }
    }

    /// Close every device and forget them all
    pub fn close_all(&mut self) {
        if self.devices.is_empty() {
            return;
        }
        debug!("Discarding {} devices from previous scan", self.devices.len());
        for device in &mut self.devices {
            device.close();
        }
        self.devices.clear();
    }

    /// Number of slots, including closed ones
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Number of entries still open
    pub fn open_count(&self) -> usize {
        self.devices.iter().filter(|d| d.is_open()).count()
    }

    /// Open entries with their indices
    pub fn iter_open(&self) -> impl Iterator<Item = (usize, &HidDevice<H>)> {
        self.devices.iter().enumerate().filter(|(_, d)| d.is_open())
    }
}
