//! libusb-backed host via `rusb`

use crate::usb::host::{
    AltSetting, ConfigLayout, DeviceIdentity, HostDevice, HostHandle, InterfaceLayout, UsbHost,
};
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::time::Duration;

/// USB host backed by a libusb context
pub struct RusbHost {
    context: Context,
}

impl RusbHost {
    /// Create a new libusb context
    pub fn new() -> Result<Self, rusb::Error> {
        Ok(Self {
            context: Context::new()?,
        })
    }

    /// Get USB context
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl UsbHost for RusbHost {
    type Device = Device<Context>;

    fn devices(&self) -> Result<Vec<Self::Device>, rusb::Error> {
        Ok(self.context.devices()?.iter().collect())
    }
}

impl<T: UsbContext> HostDevice for Device<T> {
    type Handle = DeviceHandle<T>;

    fn identity(&self) -> Result<DeviceIdentity, rusb::Error> {
        let descriptor = self.device_descriptor()?;
        Ok(DeviceIdentity {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            num_configurations: descriptor.num_configurations(),
        })
    }

    fn config_layout(&self, config_index: u8) -> Result<ConfigLayout, rusb::Error> {
        let config = self.config_descriptor(config_index)?;

        let interfaces = config
            .interfaces()
            .map(|interface| InterfaceLayout {
                number: interface.number(),
                alt_settings: interface
                    .descriptors()
                    .map(|desc| AltSetting {
                        setting_number: desc.setting_number(),
                        class: desc.class_code(),
                        subclass: desc.sub_class_code(),
                        protocol: desc.protocol_code(),
                        endpoints: desc.endpoint_descriptors().map(|ep| ep.address()).collect(),
                    })
                    .collect(),
            })
            .collect();

        Ok(ConfigLayout { interfaces })
    }

    fn open(&self) -> Result<Self::Handle, rusb::Error> {
        Device::open(self)
    }
}

impl<T: UsbContext> HostHandle for DeviceHandle<T> {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error> {
        DeviceHandle::kernel_driver_active(self, interface)
    }

    fn detach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error> {
        DeviceHandle::detach_kernel_driver(self, interface)
    }

    fn attach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error> {
        DeviceHandle::attach_kernel_driver(self, interface)
    }

    fn claim_interface(&self, interface: u8) -> Result<(), rusb::Error> {
        DeviceHandle::claim_interface(self, interface)
    }

    fn release_interface(&self, interface: u8) -> Result<(), rusb::Error> {
        DeviceHandle::release_interface(self, interface)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        DeviceHandle::read_interrupt(self, endpoint, buf, timeout)
    }

    fn write_interrupt(
        &self,
        endpoint: u8,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        DeviceHandle::write_interrupt(self, endpoint, buf, timeout)
    }

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        DeviceHandle::read_control(self, request_type, request, value, index, buf, timeout)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        DeviceHandle::write_control(self, request_type, request, value, index, buf, timeout)
    }
}
