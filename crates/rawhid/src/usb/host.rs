//! USB host abstraction
//!
//! The matcher and enumerator only talk to the USB stack through these
//! traits. [`crate::usb::RusbHost`] backs them with libusb via `rusb`; tests
//! use the in-memory host in `test_utils` (feature `test-utils`).

use std::time::Duration;

/// USB interface class code for HID
pub const CLASS_HID: u8 = 0x03;

/// Identity fields of a device descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub num_configurations: u8,
}

/// One alternate setting of an interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltSetting {
    pub setting_number: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    /// Endpoint addresses in descriptor order (bit 7 set = IN)
    pub endpoints: Vec<u8>,
}

impl AltSetting {
    /// Generic HID: HID class with no boot subclass or protocol
    pub fn is_generic_hid(&self) -> bool {
        self.class == CLASS_HID && self.subclass == 0 && self.protocol == 0
    }

    /// First IN endpoint address and first OUT endpoint address, if any
    pub fn first_endpoints(&self) -> (Option<u8>, Option<u8>) {
        let input = self.endpoints.iter().copied().find(|ep| is_in_endpoint(*ep));
        let output = self.endpoints.iter().copied().find(|ep| !is_in_endpoint(*ep));
        (input, output)
    }
}

/// One interface with its alternate settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceLayout {
    pub number: u8,
    pub alt_settings: Vec<AltSetting>,
}

/// Interfaces of one configuration descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayout {
    pub interfaces: Vec<InterfaceLayout>,
}

/// Endpoint direction from its address (bit 7 = IN)
pub fn is_in_endpoint(address: u8) -> bool {
    address & 0x80 != 0
}

/// The USB host stack
pub trait UsbHost {
    type Device: HostDevice;

    /// List present devices in host order
    fn devices(&self) -> Result<Vec<Self::Device>, rusb::Error>;
}

/// A device as listed by the host, not yet opened
pub trait HostDevice {
    type Handle: HostHandle;

    fn identity(&self) -> Result<DeviceIdentity, rusb::Error>;

    fn config_layout(&self, config_index: u8) -> Result<ConfigLayout, rusb::Error>;

    /// Open the device. Dropping the returned handle closes it.
    fn open(&self) -> Result<Self::Handle, rusb::Error>;
}

/// An opened device
pub trait HostHandle {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error>;

    fn detach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error>;

    fn attach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error>;

    fn claim_interface(&self, interface: u8) -> Result<(), rusb::Error>;

    fn release_interface(&self, interface: u8) -> Result<(), rusb::Error>;

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;

    fn write_interrupt(
        &self,
        endpoint: u8,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;
}

/// Handle type produced by a host's devices
pub type HandleOf<H> = <<H as UsbHost>::Device as HostDevice>::Handle;
