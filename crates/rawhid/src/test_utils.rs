//! Test utilities for rawhid
//!
//! An in-memory USB host for exercising matching, the registry and transfers
//! without hardware. It keeps count of open handles and claimed interfaces so
//! tests can check nothing leaks.
//!
//! Available in unit tests and, for other crates, behind the `test-utils`
//! feature.
//!
//! # Example
//!
//! ```
//! use rawhid::test_utils::{MockDeviceSpec, MockHost};
//! use rawhid::{DeviceFilter, RawHid};
//!
//! let host = MockHost::new(vec![MockDeviceSpec::raw_hid(0x16c0, 0x0480)]);
//! let device = host.device(0).clone();
//! let mut hid = RawHid::new(host);
//!
//! assert_eq!(hid.open(1, &DeviceFilter::any()).unwrap(), 1);
//! assert_eq!(device.open_handles(), 1);
//! ```

use crate::usb::host::{
    AltSetting, CLASS_HID, ConfigLayout, DeviceIdentity, HostDevice, HostHandle, InterfaceLayout,
    UsbHost,
};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

/// Report descriptor of a typical raw HID firmware: usage page 0xFFAB,
/// usage 0x0200, 64-byte input and output reports
pub const RAW_HID_REPORT_DESCRIPTOR: &[u8] = &[
    0x06, 0xAB, 0xFF, // Usage Page (0xFFAB)
    0x0A, 0x00, 0x02, // Usage (0x0200)
    0xA1, 0x01, // Collection (Application)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x40, //   Report Count (64)
    0x09, 0x01, //   Usage (0x01)
    0x81, 0x02, //   Input (Data,Var,Abs)
    0x95, 0x40, //   Report Count (64)
    0x09, 0x02, //   Usage (0x02)
    0x91, 0x02, //   Output (Data,Var,Abs)
    0xC0, // End Collection
];

/// Report descriptor of a boot-compatible keyboard (Generic Desktop / Keyboard)
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Keyboard)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0xC0, // End Collection
];

/// Generic HID alternate setting 0 with the given endpoints
pub fn generic_hid_setting(endpoints: Vec<u8>) -> AltSetting {
    AltSetting {
        setting_number: 0,
        class: CLASS_HID,
        subclass: 0,
        protocol: 0,
        endpoints,
    }
}

/// Static description of a mock device
#[derive(Debug, Clone)]
pub struct MockDeviceSpec {
    pub vendor_id: u16,
    pub product_id: u16,
    pub num_configurations: u8,
    /// First configuration; `None` makes the configuration read fail
    pub config: Option<ConfigLayout>,
    /// Report descriptor per interface number; missing entries stall
    pub report_descriptors: HashMap<u8, Vec<u8>>,
    /// Interfaces bound to a kernel driver at start
    pub driver_bound: Vec<u8>,
    pub open_fails: bool,
    pub detach_fails: bool,
    pub claim_fails: bool,
}

impl MockDeviceSpec {
    /// One generic HID interface (number 0) with IN 0x81 and OUT 0x02
    pub fn raw_hid(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            num_configurations: 1,
            config: Some(ConfigLayout {
                interfaces: vec![InterfaceLayout {
                    number: 0,
                    alt_settings: vec![generic_hid_setting(vec![0x81, 0x02])],
                }],
            }),
            report_descriptors: HashMap::from([(0, RAW_HID_REPORT_DESCRIPTOR.to_vec())]),
            driver_bound: Vec::new(),
            open_fails: false,
            detach_fails: false,
            claim_fails: false,
        }
    }

    /// A device with no configurations
    pub fn unconfigured(vendor_id: u16, product_id: u16) -> Self {
        Self {
            num_configurations: 0,
            config: None,
            report_descriptors: HashMap::new(),
            ..Self::raw_hid(vendor_id, product_id)
        }
    }

    /// Append an interface with one alternate setting and its descriptor
    pub fn with_interface(mut self, number: u8, setting: AltSetting, descriptor: &[u8]) -> Self {
        self.config
            .get_or_insert_with(ConfigLayout::default)
            .interfaces
            .push(InterfaceLayout {
                number,
                alt_settings: vec![setting],
            });
        self.report_descriptors.insert(number, descriptor.to_vec());
        self
    }

    /// Replace the first alternate setting of the `position`-th interface
    pub fn set_setting(&mut self, position: usize, setting: AltSetting) {
        if let Some(interface) = self
            .config
            .as_mut()
            .and_then(|config| config.interfaces.get_mut(position))
        {
            interface.alt_settings = vec![setting];
        }
    }
}

/// A write observed by a mock handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockTransfer {
    Interrupt {
        endpoint: u8,
        data: Vec<u8>,
    },
    Control {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: Vec<u8>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    open_handles: usize,
    times_opened: usize,
    claimed: BTreeSet<u8>,
    driver_bound: BTreeSet<u8>,
    inputs: VecDeque<Result<Vec<u8>, rusb::Error>>,
    writes: Vec<MockTransfer>,
    write_error: Option<rusb::Error>,
    descriptor_reads: Vec<(u8, u8, u16, u16)>,
}

/// A mock device; clones share state
#[derive(Debug, Clone)]
pub struct MockDevice {
    spec: Rc<MockDeviceSpec>,
    state: Rc<RefCell<MockState>>,
}

impl MockDevice {
    fn new(spec: MockDeviceSpec) -> Self {
        let state = MockState {
            driver_bound: spec.driver_bound.iter().copied().collect(),
            ..MockState::default()
        };
        Self {
            spec: Rc::new(spec),
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn spec(&self) -> &MockDeviceSpec {
        &self.spec
    }

    /// Handles currently open on this device
    pub fn open_handles(&self) -> usize {
        self.state.borrow().open_handles
    }

    /// Handles ever opened on this device
    pub fn times_opened(&self) -> usize {
        self.state.borrow().times_opened
    }

    /// Currently claimed interfaces
    pub fn claimed(&self) -> Vec<u8> {
        self.state.borrow().claimed.iter().copied().collect()
    }

    pub fn driver_bound(&self, interface: u8) -> bool {
        self.state.borrow().driver_bound.contains(&interface)
    }

    /// Queue a packet for the next interrupt IN read
    pub fn push_input(&self, data: &[u8]) {
        self.state.borrow_mut().inputs.push_back(Ok(data.to_vec()));
    }

    /// Make the next interrupt IN read fail
    pub fn push_input_error(&self, error: rusb::Error) {
        self.state.borrow_mut().inputs.push_back(Err(error));
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, error: rusb::Error) {
        self.state.borrow_mut().write_error = Some(error);
    }

    pub fn writes(&self) -> Vec<MockTransfer> {
        self.state.borrow().writes.clone()
    }

    /// `(request_type, request, value, index)` of each descriptor read
    pub fn descriptor_reads(&self) -> Vec<(u8, u8, u16, u16)> {
        self.state.borrow().descriptor_reads.clone()
    }
}

impl HostDevice for MockDevice {
    type Handle = MockHandle;

    fn identity(&self) -> Result<DeviceIdentity, rusb::Error> {
        Ok(DeviceIdentity {
            vendor_id: self.spec.vendor_id,
            product_id: self.spec.product_id,
            num_configurations: self.spec.num_configurations,
        })
    }

    fn config_layout(&self, config_index: u8) -> Result<ConfigLayout, rusb::Error> {
        if config_index >= self.spec.num_configurations {
            return Err(rusb::Error::NotFound);
        }
        self.spec.config.clone().ok_or(rusb::Error::Io)
    }

    fn open(&self) -> Result<MockHandle, rusb::Error> {
        if self.spec.open_fails {
            return Err(rusb::Error::Access);
        }
        let mut state = self.state.borrow_mut();
        state.open_handles += 1;
        state.times_opened += 1;
        Ok(MockHandle {
            device: self.clone(),
        })
    }
}

/// An open handle on a [`MockDevice`]; dropping it closes it
#[derive(Debug)]
pub struct MockHandle {
    device: MockDevice,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.device.state.borrow_mut();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

impl MockHandle {
    fn record_write(&self, transfer: MockTransfer, len: usize) -> Result<usize, rusb::Error> {
        let mut state = self.device.state.borrow_mut();
        if let Some(error) = state.write_error {
            return Err(error);
        }
        state.writes.push(transfer);
        Ok(len)
    }
}

impl HostHandle for MockHandle {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error> {
        Ok(self.device.driver_bound(interface))
    }

    fn detach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error> {
        if self.device.spec.detach_fails {
            return Err(rusb::Error::Access);
        }
        self.device.state.borrow_mut().driver_bound.remove(&interface);
        Ok(())
    }

    fn attach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error> {
        self.device.state.borrow_mut().driver_bound.insert(interface);
        Ok(())
    }

    fn claim_interface(&self, interface: u8) -> Result<(), rusb::Error> {
        if self.device.spec.claim_fails {
            return Err(rusb::Error::Busy);
        }
        self.device.state.borrow_mut().claimed.insert(interface);
        Ok(())
    }

    fn release_interface(&self, interface: u8) -> Result<(), rusb::Error> {
        if self.device.state.borrow_mut().claimed.remove(&interface) {
            Ok(())
        } else {
            Err(rusb::Error::NotFound)
        }
    }

    fn read_interrupt(
        &self,
        _endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        match self.device.state.borrow_mut().inputs.pop_front() {
            Some(Ok(data)) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            Some(Err(error)) => Err(error),
            None => Err(rusb::Error::Timeout),
        }
    }

    fn write_interrupt(
        &self,
        endpoint: u8,
        buf: &[u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.record_write(
            MockTransfer::Interrupt {
                endpoint,
                data: buf.to_vec(),
            },
            buf.len(),
        )
    }

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.device
            .state
            .borrow_mut()
            .descriptor_reads
            .push((request_type, request, value, index));

        let interface = u8::try_from(index).map_err(|_| rusb::Error::InvalidParam)?;
        let descriptor = self
            .device
            .spec
            .report_descriptors
            .get(&interface)
            .ok_or(rusb::Error::Pipe)?;
        let len = descriptor.len().min(buf.len());
        buf[..len].copy_from_slice(&descriptor[..len]);
        Ok(len)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.record_write(
            MockTransfer::Control {
                request_type,
                request,
                value,
                index,
                data: buf.to_vec(),
            },
            buf.len(),
        )
    }
}

/// In-memory USB host listing a fixed set of devices
#[derive(Debug, Default)]
pub struct MockHost {
    devices: Vec<MockDevice>,
    listing_error: Option<rusb::Error>,
}

impl MockHost {
    pub fn new(specs: Vec<MockDeviceSpec>) -> Self {
        Self {
            devices: specs.into_iter().map(MockDevice::new).collect(),
            listing_error: None,
        }
    }

    /// A host whose device listing always fails
    pub fn failing(error: rusb::Error) -> Self {
        Self {
            devices: Vec::new(),
            listing_error: Some(error),
        }
    }

    /// Device at `position` in host order
    ///
    /// # Panics
    /// Panics if `position` is out of range.
    pub fn device(&self, position: usize) -> &MockDevice {
        &self.devices[position]
    }

    /// Open handles across all devices
    pub fn total_open_handles(&self) -> usize {
        self.devices.iter().map(MockDevice::open_handles).sum()
    }
}

impl UsbHost for MockHost {
    type Device = MockDevice;

    fn devices(&self) -> Result<Vec<MockDevice>, rusb::Error> {
        match self.listing_error {
            Some(error) => Err(error),
            None => Ok(self.devices.clone()),
        }
    }
}
