//! Device selection filters

use crate::error::{RawHidError, Result};
use crate::usb::host::DeviceIdentity;

/// Which devices and interfaces to accept. `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub usage_page: Option<u32>,
    pub usage: Option<u32>,
}

impl DeviceFilter {
    /// Match every device
    pub fn any() -> Self {
        Self::default()
    }

    /// Build a filter from integer arguments where any value `<= 0` means "any"
    ///
    /// Vendor and product ids above `0xFFFF` can never match a device and are
    /// rejected.
    pub fn from_raw(vendor_id: i32, product_id: i32, usage_page: i32, usage: i32) -> Result<Self> {
        Ok(Self {
            vendor_id: raw_id(vendor_id, "vendor id")?,
            product_id: raw_id(product_id, "product id")?,
            usage_page: raw_usage(usage_page),
            usage: raw_usage(usage),
        })
    }

    pub fn vendor(mut self, vendor_id: u16) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn product(mut self, product_id: u16) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn usage_page(mut self, usage_page: u32) -> Self {
        self.usage_page = Some(usage_page);
        self
    }

    pub fn usage(mut self, usage: u32) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Check vendor and product id
    pub fn matches_device(&self, identity: &DeviceIdentity) -> bool {
        self.vendor_id.is_none_or(|vid| vid == identity.vendor_id)
            && self.product_id.is_none_or(|pid| pid == identity.product_id)
    }

    /// Check a parsed top-level usage
    pub fn matches_usage(&self, usage_page: u32, usage: u32) -> bool {
        self.usage_page.is_none_or(|page| page == usage_page)
            && self.usage.is_none_or(|u| u == usage)
    }
}

fn raw_id(value: i32, name: &str) -> Result<Option<u16>> {
    if value <= 0 {
        return Ok(None);
    }
    u16::try_from(value)
        .map(Some)
        .map_err(|_| RawHidError::InvalidFilter(format!("{} {:#x} exceeds 16 bits", name, value)))
}

fn raw_usage(value: i32) -> Option<u32> {
    u32::try_from(value).ok().filter(|v| *v > 0)
}
