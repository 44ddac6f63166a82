//! Raw HID session

use crate::error::{RawHidError, Result};
use crate::filter::DeviceFilter;
use crate::usb::{DeviceTable, HandleOf, HidDevice, RusbHost, UsbHost, enumerator, transfers};
use std::time::Duration;

/// One USB host plus the devices opened on it
///
/// Device indices returned by [`RawHid::open`] stay valid until the next
/// `open`, which closes and forgets every device from the previous call.
/// Instances are independent of each other.
pub struct RawHid<H: UsbHost = RusbHost> {
    host: H,
    table: DeviceTable<HandleOf<H>>,
}

impl RawHid<RusbHost> {
    /// Session on the system's libusb context
    pub fn system() -> Result<Self> {
        Ok(Self::new(RusbHost::new().map_err(RawHidError::Init)?))
    }
}

impl<H: UsbHost> RawHid<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            table: DeviceTable::new(),
        }
    }

    /// Count present devices matching the vendor/product filter
    pub fn scan(&self, filter: &DeviceFilter) -> Result<usize> {
        enumerator::scan(&self.host, filter)
    }

    /// Open up to `max` matching devices, replacing any previously opened
    pub fn open(&mut self, max: usize, filter: &DeviceFilter) -> Result<usize> {
        enumerator::open(&self.host, &mut self.table, max, filter)
    }

    /// Receive one packet; `Ok(0)` on timeout
    pub fn recv(&self, index: usize, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        transfers::recv(&self.table, index, buf, timeout)
    }

    /// Send one packet; returns bytes accepted
    pub fn send(&self, index: usize, buf: &[u8], timeout: Duration) -> Result<usize> {
        transfers::send(&self.table, index, buf, timeout)
    }

    /// Close one device. Unknown or already closed indices are ignored.
    pub fn close(&mut self, index: usize) {
        self.table.close(index);
    }

    /// Close every device
    pub fn close_all(&mut self) {
        self.table.close_all();
    }

    /// Open devices with their indices
    pub fn devices(&self) -> impl Iterator<Item = (usize, &HidDevice<HandleOf<H>>)> {
        self.table.iter_open()
    }

    pub fn table(&self) -> &DeviceTable<HandleOf<H>> {
        &self.table
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}
